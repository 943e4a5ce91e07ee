//! Disbursement Scheduling
//!
//! Time and proof gating for individual disbursements, kept free of any
//! store access so the rules are testable in isolation. The state machine
//! remains the sole writer; [`apply`] only produces the post-execution
//! record.

use crate::allocation::{Disbursement, DisbursementStatus};
use crate::errors::{TreasuryError, TreasuryResult};
use crate::interface::ProofVerifier;
use crate::types::Timestamp;

/// A disbursement becomes due the moment its scheduled date is reached
pub fn is_due(disbursement: &Disbursement, now: Timestamp) -> bool {
    disbursement.scheduled_date <= now
}

/// Enforce the milestone proof gate.
///
/// Disbursements without a milestone label pass unconditionally; gated
/// ones need a proof the verifier accepts.
pub fn validate_proof(
    verifier: &dyn ProofVerifier,
    disbursement: &Disbursement,
    proof: Option<&str>,
) -> TreasuryResult<()> {
    if !disbursement.requires_proof() {
        return Ok(());
    }
    match proof {
        None => Err(TreasuryError::InvalidProof(format!(
            "milestone '{}' requires a proof",
            disbursement.milestone
        ))),
        Some(token) if verifier.verify(token) => Ok(()),
        Some(_) => Err(TreasuryError::InvalidProof(format!(
            "proof for milestone '{}' failed verification",
            disbursement.milestone
        ))),
    }
}

/// The record as it looks after execution: marked disbursed, stamped,
/// and carrying the proof and transfer reference for audit.
pub fn apply(
    disbursement: &Disbursement,
    now: Timestamp,
    proof: Option<String>,
    tx_reference: Option<String>,
) -> Disbursement {
    Disbursement {
        status: DisbursementStatus::Disbursed,
        milestone_proof: proof,
        disbursed_at: Some(now),
        tx_reference,
        ..disbursement.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================
