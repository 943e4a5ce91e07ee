//! Multi-Signature Approval Engine
//!
//! Pure signature-counting rules for the two governed actions: raising a
//! proposal and reaching approval quorum. Both are dispatched through one
//! [`validate`] entry point keyed by [`ActionKind`] so the rule set stays
//! centralized and exhaustively matched.
//!
//! All threshold math is integer basis points; quorum rounding is CEILING
//! (see [`required_approvals`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{Address, Bps, BPS_DENOM};

/// One registered fund manager
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundManager {
    pub address: Address,
    pub name: String,
}

impl FundManager {
    pub fn new(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }
}

/// Multi-signature configuration for the fund.
///
/// Read-only from the core's perspective; mutation is an authorized
/// governance action owned by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundGovernance {
    pub managers: Vec<FundManager>,
    /// Distinct manager signatures needed to raise a proposal
    pub required_signatures: u32,
    /// Fraction of managers whose approval activates an allocation
    pub approval_threshold_bps: Bps,
}

impl FundGovernance {
    pub fn new(
        managers: Vec<FundManager>,
        required_signatures: u32,
        approval_threshold_bps: Bps,
    ) -> Self {
        Self {
            managers,
            required_signatures,
            approval_threshold_bps,
        }
    }

    pub fn is_manager(&self, address: &Address) -> bool {
        self.managers
            .iter()
            .any(|manager| manager.address == *address)
    }

    pub fn manager_count(&self) -> usize {
        self.managers.len()
    }
}

/// The two governed actions with distinct signature rules
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionKind {
    /// Raising a new allocation proposal
    Proposal,
    /// Activating an allocation once enough managers approved
    ApprovalQuorum,
}

/// Count the distinct signers that are registered fund managers.
///
/// Duplicates are collapsed before counting; unrecognized addresses are
/// ignored and never invalidate the set.
pub fn count_manager_signers(signers: &[Address], governance: &FundGovernance) -> usize {
    let distinct: BTreeSet<&Address> = signers.iter().collect();
    distinct
        .into_iter()
        .filter(|signer| governance.is_manager(signer))
        .count()
}

/// Approvals needed to reach quorum: `ceil(managers × threshold)`.
///
/// Rounding UP is part of the contract: a 3-manager fund at a 6000 bps
/// threshold needs 2 approvals, not 1.
pub fn required_approvals(governance: &FundGovernance) -> usize {
    let product = governance.manager_count() as u64 * governance.approval_threshold_bps as u64;
    product.div_ceil(BPS_DENOM) as usize
}

/// Single entry point for multi-signature validation.
///
/// - `Proposal`: the distinct manager signers must reach
///   `required_signatures`.
/// - `ApprovalQuorum`: the signer set (an allocation's `approved_by`,
///   already deduplicated by construction) must reach
///   [`required_approvals`].
pub fn validate(kind: ActionKind, signers: &[Address], governance: &FundGovernance) -> bool {
    match kind {
        ActionKind::Proposal => {
            count_manager_signers(signers, governance) >= governance.required_signatures as usize
        }
        ActionKind::ApprovalQuorum => signers.len() >= required_approvals(governance),
    }
}

// ============================================================================
// TESTS
// ============================================================================
