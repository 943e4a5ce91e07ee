//! Allocation State Machine
//!
//! The orchestrator for the allocation lifecycle:
//!
//! ```text
//! proposed ──approve(quorum)──► approved ──execute──► active ──last──► completed
//!     │                            │
//!     └────────reject──────────────┴──reject(releases reservation)──► rejected
//! ```
//!
//! Every operation validates fully before its first store write, and all
//! external transfers run before any mutation, so a failure leaves no
//! partial state behind. Status changes flow through the ledger's single
//! `update_status` entry point.

use tracing::{info, warn};

use crate::allocation::{
    AllocationProposal, AllocationStatus, FundAllocation, MetricObservation, PerformanceMetric,
};
use crate::errors::{TreasuryError, TreasuryResult};
use crate::governance as multisig;
use crate::governance::ActionKind;
use crate::interface::{BalanceProvider, Clock, GovernanceProvider, ProofVerifier, TransferExecutor};
use crate::ledger::AllocationLedger;
use crate::policy::PolicyConfig;
use crate::schedule;
use crate::storage::LedgerStore;
use crate::types::{Address, AllocationId, Bps};

/// Outcome requested by a fund manager reviewing a proposal
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

/// The treasury allocation engine over any ledger store backend.
pub struct TreasuryEngine<S: LedgerStore> {
    ledger: AllocationLedger<S>,
}

impl<S: LedgerStore> TreasuryEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            ledger: AllocationLedger::new(store),
        }
    }

    /// Read access to the underlying ledger (queries, listings)
    pub fn ledger(&self) -> &AllocationLedger<S> {
        &self.ledger
    }

    // ------------------------------------------------------------------
    // Propose
    // ------------------------------------------------------------------

    /// Raise a new allocation proposal.
    ///
    /// Policy gates first, then the multi-signature rule for proposals,
    /// then record-intrinsic validation; the id counter and the record
    /// are only written once everything passed.
    pub fn propose(
        &mut self,
        policy: &PolicyConfig,
        governance: &dyn GovernanceProvider,
        balances: &dyn BalanceProvider,
        clock: &dyn Clock,
        proposers: &[Address],
        proposal: AllocationProposal,
    ) -> TreasuryResult<AllocationId> {
        if !policy.allocations_enabled {
            return Err(TreasuryError::InvalidProposal(
                "allocations are disabled by policy".to_string(),
            ));
        }
        if proposal.amount.denom != policy.denom {
            return Err(TreasuryError::InvalidProposal(format!(
                "allocation must be denominated in {}, got {}",
                policy.denom, proposal.amount.denom
            )));
        }
        if !policy.is_recognized_category(&proposal.category) {
            return Err(TreasuryError::InvalidProposal(format!(
                "unrecognized category '{}'",
                proposal.category
            )));
        }

        let governance = governance.governance()?;
        if !multisig::validate(ActionKind::Proposal, proposers, &governance) {
            return Err(TreasuryError::InsufficientSignatures {
                got: multisig::count_manager_signers(proposers, &governance),
                required: governance.required_signatures,
            });
        }

        // intrinsic record validation happens against the id the counter
        // will hand out below
        let id = self
            .ledger
            .allocation_count()?
            .checked_add(1)
            .ok_or(TreasuryError::Overflow)?;
        let allocation = FundAllocation::from_proposal(id, proposal, clock.now())?;

        let balance = balances.treasury_balance(&policy.denom)?;
        let cap = policy.max_single_allocation(&balance)?;
        if allocation.amount.compare(&cap)? == std::cmp::Ordering::Greater {
            return Err(TreasuryError::InvalidProposal(format!(
                "amount {} exceeds the {} bps cap of {} against treasury balance {}",
                allocation.amount, policy.max_allocation_bps, cap, balance
            )));
        }
        let remaining = balance.checked_sub(&allocation.amount).map_err(|_| {
            TreasuryError::InvalidProposal(format!(
                "amount {} exceeds treasury balance {}",
                allocation.amount, balance
            ))
        })?;
        if remaining.compare(&policy.min_fund_balance)? == std::cmp::Ordering::Less {
            return Err(TreasuryError::InvalidProposal(format!(
                "allocation would leave {}, below the fund floor of {}",
                remaining, policy.min_fund_balance
            )));
        }

        let assigned = self.ledger.next_allocation_id()?;
        debug_assert_eq!(assigned, id);
        self.ledger.put_allocation(&allocation)?;

        info!(
            id,
            amount = %allocation.amount,
            category = %allocation.category,
            recipient = %allocation.recipient,
            "allocation proposed"
        );
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Approve / Reject
    // ------------------------------------------------------------------

    /// Record one fund manager's decision on a proposal.
    ///
    /// Approvals accumulate until quorum, at which point the allocation
    /// amount is reserved (exactly once) and the status becomes
    /// `approved`. A rejection is terminal and, when it lands on an
    /// already-approved allocation, returns the reservation to the
    /// general balance.
    #[allow(clippy::too_many_arguments)]
    pub fn decide(
        &mut self,
        governance: &dyn GovernanceProvider,
        transfers: &mut dyn TransferExecutor,
        clock: &dyn Clock,
        id: AllocationId,
        approver: Address,
        decision: Decision,
        comments: Option<String>,
    ) -> TreasuryResult<AllocationStatus> {
        let governance = governance.governance()?;
        if !governance.is_manager(&approver) {
            return Err(TreasuryError::Unauthorized(approver));
        }

        let mut allocation = self.ledger.require_allocation(id)?;
        if !matches!(
            allocation.status,
            AllocationStatus::Proposed | AllocationStatus::Approved
        ) {
            return Err(TreasuryError::InvalidStatus {
                operation: "decide on allocation",
                status: allocation.status,
            });
        }
        if allocation.has_approved(&approver) {
            return Err(TreasuryError::DuplicateApproval { id, approver });
        }

        match decision {
            Decision::Approve => {
                allocation.approved_by.push(approver);
                if let Some(comments) = comments {
                    allocation.decision_comments = Some(comments);
                }

                let reached_quorum = allocation.status == AllocationStatus::Proposed
                    && multisig::validate(
                        ActionKind::ApprovalQuorum,
                        &allocation.approved_by,
                        &governance,
                    );

                if reached_quorum {
                    // reservation happens exactly once, the moment quorum
                    // is first reached; the transfer runs before any
                    // store write so a funding failure leaves no trace
                    transfers.reserve(&allocation.amount)?;
                    allocation.approved_at = Some(clock.now());
                }

                let current = allocation.status;
                self.ledger.put_allocation(&allocation)?;
                if reached_quorum {
                    self.advance(id, current, AllocationStatus::Approved)?;
                    info!(
                        id,
                        approver = %approver,
                        approvals = allocation.approved_by.len(),
                        amount = %allocation.amount,
                        "allocation approved and amount reserved"
                    );
                    Ok(AllocationStatus::Approved)
                } else {
                    info!(
                        id,
                        approver = %approver,
                        approvals = allocation.approved_by.len(),
                        required = multisig::required_approvals(&governance),
                        "approval recorded"
                    );
                    Ok(current)
                }
            }
            Decision::Reject => {
                // return the reservation when rejecting an allocation
                // that had already reached quorum
                if allocation.status == AllocationStatus::Approved {
                    transfers.release(&allocation.amount)?;
                }
                if let Some(comments) = comments {
                    allocation.decision_comments = Some(comments);
                }

                let current = allocation.status;
                self.ledger.put_allocation(&allocation)?;
                self.advance(id, current, AllocationStatus::Rejected)?;

                warn!(id, approver = %approver, "allocation rejected");
                Ok(AllocationStatus::Rejected)
            }
        }
    }

    // ------------------------------------------------------------------
    // Execute disbursement
    // ------------------------------------------------------------------

    /// Execute one scheduled disbursement once its time and proof gates
    /// pass. Disbursements may run in any index order; repeating a
    /// finished one fails with `AlreadyExecuted`.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_disbursement(
        &mut self,
        transfers: &mut dyn TransferExecutor,
        proofs: &dyn ProofVerifier,
        clock: &dyn Clock,
        id: AllocationId,
        index: usize,
        proof: Option<String>,
        tx_reference: Option<String>,
    ) -> TreasuryResult<AllocationStatus> {
        let mut allocation = self.ledger.require_allocation(id)?;
        if !matches!(
            allocation.status,
            AllocationStatus::Approved | AllocationStatus::Active
        ) {
            return Err(TreasuryError::InvalidStatus {
                operation: "execute disbursement",
                status: allocation.status,
            });
        }

        let disbursement = allocation
            .disbursements
            .get(index)
            .ok_or(TreasuryError::DisbursementNotFound { id, index })?;
        if disbursement.is_disbursed() {
            return Err(TreasuryError::AlreadyExecuted { id, index });
        }

        let now = clock.now();
        if !schedule::is_due(disbursement, now) {
            return Err(TreasuryError::NotYetDue {
                scheduled: disbursement.scheduled_date,
                now,
            });
        }
        schedule::validate_proof(proofs, disbursement, proof.as_deref())?;

        // all gates passed: pay out of the reserved sub-balance, then
        // persist the executed record
        transfers.disburse(&disbursement.amount, &allocation.recipient)?;

        let executed = schedule::apply(disbursement, now, proof, tx_reference);
        let amount = executed.amount.clone();
        allocation.disbursements[index] = executed;

        let target = if allocation.all_disbursed() {
            AllocationStatus::Completed
        } else {
            AllocationStatus::Active
        };
        let current = allocation.status;
        self.ledger.put_allocation(&allocation)?;
        self.advance(id, current, target)?;

        info!(
            id,
            index,
            amount = %amount,
            status = %target,
            "disbursement executed"
        );
        Ok(target)
    }

    // ------------------------------------------------------------------
    // Performance metrics
    // ------------------------------------------------------------------

    /// Append performance observations for a funded allocation and
    /// recompute its ROI. Only the recipient or a policy-authorized
    /// auditor may report, and only once money has moved.
    pub fn record_metrics(
        &mut self,
        policy: &PolicyConfig,
        clock: &dyn Clock,
        id: AllocationId,
        reporter: Address,
        observations: Vec<MetricObservation>,
    ) -> TreasuryResult<Bps> {
        let mut allocation = self.ledger.require_allocation(id)?;
        if reporter != allocation.recipient && !policy.is_authorized_auditor(&reporter) {
            return Err(TreasuryError::Unauthorized(reporter));
        }
        if !matches!(
            allocation.status,
            AllocationStatus::Active | AllocationStatus::Completed
        ) {
            return Err(TreasuryError::InvalidStatus {
                operation: "record performance metrics",
                status: allocation.status,
            });
        }

        let now = clock.now();
        for observation in observations {
            allocation.record_metric(PerformanceMetric {
                label: observation.label,
                outlook: observation.outlook,
                observed_at: now,
            });
        }
        self.ledger.put_allocation(&allocation)?;

        info!(
            id,
            reporter = %reporter,
            roi_bps = allocation.roi_bps,
            observations = allocation.metrics.len(),
            "performance metrics recorded"
        );
        Ok(allocation.roi_bps)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Move `id` from `current` to `target` through the ledger's single
    /// status entry point, enforcing the lifecycle transition matrix.
    fn advance(
        &mut self,
        id: AllocationId,
        current: AllocationStatus,
        target: AllocationStatus,
    ) -> TreasuryResult<()> {
        if current == target {
            return Ok(());
        }
        if !current.can_transition_to(target) {
            return Err(TreasuryError::InvalidStatus {
                operation: "advance allocation",
                status: current,
            });
        }
        self.ledger.update_status(id, target)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
