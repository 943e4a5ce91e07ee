//! Treasury Ledger Errors
//!
//! Every operation fails synchronously with one of these; nothing is
//! retried internally and no partial state is persisted on a failure path.

use thiserror::Error;

use crate::allocation::AllocationStatus;
use crate::storage::StorageError;
use crate::types::{Address, AllocationId, Coin, Denom, Timestamp};

/// Error during treasury ledger operations
#[derive(Error, Debug, Clone)]
pub enum TreasuryError {
    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Insufficient signatures: got {got}, required {required}")]
    InsufficientSignatures { got: usize, required: u32 },

    #[error("Unauthorized: {0}")]
    Unauthorized(Address),

    #[error("Duplicate approval of allocation {id} by {approver}")]
    DuplicateApproval {
        id: AllocationId,
        approver: Address,
    },

    #[error("Allocation {0} not found")]
    NotFound(AllocationId),

    #[error("Disbursement {index} of allocation {id} not found")]
    DisbursementNotFound { id: AllocationId, index: usize },

    #[error("Fund governance is not configured")]
    GovernanceNotSet,

    #[error("Cannot {operation} while allocation is {status}")]
    InvalidStatus {
        operation: &'static str,
        status: AllocationStatus,
    },

    #[error("Disbursement {index} of allocation {id} already executed")]
    AlreadyExecuted { id: AllocationId, index: usize },

    #[error("Disbursement not yet due: scheduled at {scheduled}, now {now}")]
    NotYetDue { scheduled: Timestamp, now: Timestamp },

    #[error("Invalid milestone proof: {0}")]
    InvalidProof(String),

    #[error("Insufficient funds for transfer of {requested}")]
    InsufficientFunds { requested: Coin },

    #[error("Amount underflow")]
    Underflow,

    #[error("Amount overflow")]
    Overflow,

    #[error("Denomination mismatch: expected {expected}, found {found}")]
    DenomMismatch { expected: Denom, found: Denom },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for treasury operations
pub type TreasuryResult<T> = Result<T, TreasuryError>;
