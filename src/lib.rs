//! Treasury Allocation Ledger
//!
//! A deterministic engine tracking a pooled fund's allocations from
//! proposal through multi-party approval, milestone-gated disbursement,
//! and completion, over a prefix-iterable key-value store with secondary
//! indexes that never drift from the primary records.
//!
//! # Key Principles
//!
//! 1. **Exact money**: amounts are denomination-tagged integers; all
//!    arithmetic fails on overflow/underflow instead of wrapping
//! 2. **Single status path**: every status change walks through one
//!    ledger entry point that retires and rewrites index markers in step
//! 3. **Explicit policy**: limits arrive as a [`PolicyConfig`] value,
//!    never from ambient state
//! 4. **Host-owned effects**: balances, transfers, proofs and time reach
//!    the core only through the traits in [`interface`]
//!
//! # Usage
//!
//! ```ignore
//! use lib_treasury::{AllocationProposal, Decision, PolicyConfig, TreasuryEngine};
//! use lib_treasury::storage::SledLedgerStore;
//!
//! let mut engine = TreasuryEngine::new(SledLedgerStore::open("treasury.db")?);
//! let id = engine.propose(&policy, &governance, &bank, &clock, &proposers, proposal)?;
//! engine.decide(&governance, &mut bank, &clock, id, approver, Decision::Approve, None)?;
//! ```

pub mod allocation;
pub mod engine;
pub mod errors;
pub mod governance;
pub mod interface;
pub mod ledger;
pub mod policy;
pub mod schedule;
pub mod storage;
pub mod types;

pub use allocation::{
    AllocationProposal, AllocationStatus, Disbursement, DisbursementStatus, FundAllocation,
    MetricObservation, MetricOutlook, PerformanceMetric, ScheduledPayment,
};
pub use engine::{Decision, TreasuryEngine};
pub use errors::{TreasuryError, TreasuryResult};
pub use governance::{ActionKind, FundGovernance, FundManager};
pub use interface::{
    BalanceProvider, Clock, FixedClock, GovernanceProvider, MilestoneVerifier, ProofVerifier,
    StaticGovernance, SystemClock, TransferExecutor,
};
pub use ledger::{AllocationLedger, FundSummary, IndexSelector, PendingDisbursement};
pub use policy::PolicyConfig;
pub use storage::{LedgerStore, MemoryLedgerStore, SledLedgerStore, StorageError};
pub use types::{Address, AllocationId, Amount, Bps, Coin, Denom, Timestamp, BPS_DENOM};
