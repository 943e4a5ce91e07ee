//! Host Interfaces
//!
//! The seams between the allocation core and the runtime hosting it. The
//! core never touches real balances, wall clocks, or signature machinery;
//! it requests everything through these traits and the host guarantees
//! that external effects commit all-or-nothing together with the core's
//! own store writes.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::TreasuryResult;
use crate::governance::FundGovernance;
use crate::types::{Address, Coin, Denom, Timestamp};

/// Read-only view of the fund's balances
pub trait BalanceProvider {
    /// General spendable treasury balance in `denom`
    fn treasury_balance(&self, denom: &Denom) -> TreasuryResult<Coin>;

    /// Funds already earmarked for approved allocations
    fn reserved_balance(&self, denom: &Denom) -> TreasuryResult<Coin>;
}

/// Balance mutation authority.
///
/// Implementations fail with `InsufficientFunds` when the source balance
/// cannot cover the transfer; they never partially apply.
pub trait TransferExecutor {
    /// Move `amount` from the general balance into the reserved
    /// sub-balance
    fn reserve(&mut self, amount: &Coin) -> TreasuryResult<()>;

    /// Pay `amount` out of the reserved sub-balance to `recipient`
    fn disburse(&mut self, amount: &Coin, recipient: &Address) -> TreasuryResult<()>;

    /// Return `amount` from the reserved sub-balance to the general
    /// balance (rejection of an already-approved allocation)
    fn release(&mut self, amount: &Coin) -> TreasuryResult<()>;
}

/// Source of the current multi-signature configuration
pub trait GovernanceProvider {
    /// Fails with `GovernanceNotSet` when no configuration exists
    fn governance(&self) -> TreasuryResult<FundGovernance>;
}

/// Milestone proof validation
pub trait ProofVerifier {
    fn verify(&self, proof: &str) -> bool;
}

/// Deterministic time source; stable within a single operation
pub trait Clock {
    fn now(&self) -> Timestamp;
}

// ============================================================================
// PROVIDED IMPLEMENTATIONS
// ============================================================================

/// Wall-clock time in unix seconds
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs(),
            Err(_) => 0,
        }
    }
}

/// Pinned time source for tests and replay
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedClock {
    now: Timestamp,
}

impl FixedClock {
    pub fn at(now: Timestamp) -> Self {
        Self { now }
    }

    pub fn set(&mut self, now: Timestamp) {
        self.now = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

/// Baseline proof check: a milestone proof must be non-empty and carry at
/// least `min_len` bytes of evidence reference.
#[derive(Clone, Copy, Debug)]
pub struct MilestoneVerifier {
    pub min_len: usize,
}

impl Default for MilestoneVerifier {
    fn default() -> Self {
        Self { min_len: 32 }
    }
}

impl ProofVerifier for MilestoneVerifier {
    fn verify(&self, proof: &str) -> bool {
        !proof.trim().is_empty() && proof.len() >= self.min_len
    }
}

/// Governance handed in as a plain value
#[derive(Clone, Debug)]
pub struct StaticGovernance(pub FundGovernance);

impl GovernanceProvider for StaticGovernance {
    fn governance(&self) -> TreasuryResult<FundGovernance> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let mut clock = FixedClock::at(100);
        assert_eq!(clock.now(), 100);
        clock.set(250);
        assert_eq!(clock.now(), 250);
    }

    #[test]
    fn test_milestone_verifier_minimum_length() {
        let verifier = MilestoneVerifier::default();
        assert!(!verifier.verify(""));
        assert!(!verifier.verify("   "));
        assert!(!verifier.verify("short"));
        assert!(verifier.verify("ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"));
        assert!(verifier.verify(&"x".repeat(32)));
    }

    #[test]
    fn test_static_governance() {
        let governance = FundGovernance::new(Vec::new(), 1, 5_000);
        let provider = StaticGovernance(governance.clone());
        assert_eq!(provider.governance().unwrap(), governance);
    }
}
