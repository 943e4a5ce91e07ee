//! Allocation Records
//!
//! The canonical `FundAllocation` record and its nested pieces: the
//! disbursement schedule, lifecycle status, and performance metrics.
//!
//! # Invariants
//!
//! - `id` is non-zero and immutable once assigned.
//! - `sum(disbursements[i].amount) == amount`, enforced at creation and
//!   never mutated afterward.
//! - `status` moves only along the lifecycle:
//!   `proposed → approved → active → completed`, with `rejected` reachable
//!   from `proposed` and `approved`.
//! - `approved_by` never contains the same address twice.
//! - `metrics` is append-only; `roi_bps` is derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{TreasuryError, TreasuryResult};
use crate::types::{Address, AllocationId, Bps, Coin, Timestamp, BPS_DENOM};

// ============================================================================
// LIFECYCLE STATUS
// ============================================================================

/// Lifecycle state of a fund allocation
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AllocationStatus {
    Proposed,
    Approved,
    Rejected,
    Active,
    Completed,
}

impl AllocationStatus {
    /// Every status, in index-code order
    pub const ALL: [AllocationStatus; 5] = [
        AllocationStatus::Proposed,
        AllocationStatus::Approved,
        AllocationStatus::Rejected,
        AllocationStatus::Active,
        AllocationStatus::Completed,
    ];

    /// Stable single-byte code used in index keys
    pub const fn code(self) -> u8 {
        match self {
            AllocationStatus::Proposed => 1,
            AllocationStatus::Approved => 2,
            AllocationStatus::Rejected => 3,
            AllocationStatus::Active => 4,
            AllocationStatus::Completed => 5,
        }
    }

    /// Inverse of [`code`](Self::code)
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(AllocationStatus::Proposed),
            2 => Some(AllocationStatus::Approved),
            3 => Some(AllocationStatus::Rejected),
            4 => Some(AllocationStatus::Active),
            5 => Some(AllocationStatus::Completed),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AllocationStatus::Proposed => "proposed",
            AllocationStatus::Approved => "approved",
            AllocationStatus::Rejected => "rejected",
            AllocationStatus::Active => "active",
            AllocationStatus::Completed => "completed",
        }
    }

    /// `rejected` and `completed` accept no further transitions
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            AllocationStatus::Rejected | AllocationStatus::Completed
        )
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// `approved → completed` covers a single-payment allocation whose
    /// only disbursement executes immediately; it still passes through
    /// the active stage within that one operation.
    pub const fn can_transition_to(self, next: AllocationStatus) -> bool {
        use AllocationStatus::*;
        matches!(
            (self, next),
            (Proposed, Approved)
                | (Proposed, Rejected)
                | (Approved, Active)
                | (Approved, Completed)
                | (Approved, Rejected)
                | (Active, Completed)
        )
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single disbursement within an allocation
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DisbursementStatus {
    Pending,
    Disbursed,
}

impl DisbursementStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            DisbursementStatus::Pending => "pending",
            DisbursementStatus::Disbursed => "disbursed",
        }
    }
}

impl fmt::Display for DisbursementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PERFORMANCE METRICS
// ============================================================================

/// How a funded project is tracking against its stated impact
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MetricOutlook {
    OnTrack,
    AtRisk,
    Behind,
}

impl MetricOutlook {
    /// Score contribution in basis points
    pub const fn score_bps(self) -> u64 {
        match self {
            MetricOutlook::OnTrack => 10_000,
            MetricOutlook::AtRisk => 5_000,
            MetricOutlook::Behind => 0,
        }
    }
}

/// One recorded performance observation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub label: String,
    pub outlook: MetricOutlook,
    pub observed_at: Timestamp,
}

/// Input form of an observation; the engine stamps the observation time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    pub label: String,
    pub outlook: MetricOutlook,
}

// ============================================================================
// DISBURSEMENTS
// ============================================================================

/// One scheduled payment within a proposed allocation (input form)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub amount: Coin,
    pub scheduled_date: Timestamp,
    /// Milestone label; non-empty means a proof is required at execution
    pub milestone: String,
}

/// One milestone payment within an allocation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Disbursement {
    pub amount: Coin,
    pub scheduled_date: Timestamp,
    pub status: DisbursementStatus,
    pub milestone: String,
    pub milestone_proof: Option<String>,
    pub disbursed_at: Option<Timestamp>,
    pub tx_reference: Option<String>,
}

impl Disbursement {
    /// A fresh pending disbursement from its scheduled form
    pub fn planned(payment: ScheduledPayment) -> Self {
        Self {
            amount: payment.amount,
            scheduled_date: payment.scheduled_date,
            status: DisbursementStatus::Pending,
            milestone: payment.milestone,
            milestone_proof: None,
            disbursed_at: None,
            tx_reference: None,
        }
    }

    pub fn is_disbursed(&self) -> bool {
        self.status == DisbursementStatus::Disbursed
    }

    /// A declared milestone gates execution on a verified proof
    pub fn requires_proof(&self) -> bool {
        !self.milestone.is_empty()
    }
}

// ============================================================================
// FUND ALLOCATION
// ============================================================================

/// Input to a new allocation proposal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationProposal {
    pub purpose: String,
    pub category: String,
    pub recipient: Address,
    pub amount: Coin,
    pub schedule: Vec<ScheduledPayment>,
    pub justification: String,
    pub expected_impact: String,
}

/// A single funding decision and its full audit trail.
///
/// Never deleted: terminal records stay in the ledger for audit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundAllocation {
    pub id: AllocationId,
    pub purpose: String,
    pub category: String,
    pub recipient: Address,
    pub amount: Coin,
    pub status: AllocationStatus,
    pub approved_by: Vec<Address>,
    pub disbursements: Vec<Disbursement>,
    pub metrics: Vec<PerformanceMetric>,
    /// Derived from `metrics`; see [`recompute_roi`](Self::recompute_roi)
    pub roi_bps: Bps,
    pub justification: String,
    pub expected_impact: String,
    pub proposed_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub decision_comments: Option<String>,
}

impl FundAllocation {
    /// Build the initial `proposed` record from a validated proposal.
    ///
    /// Checks everything intrinsic to the record: non-zero id, non-empty
    /// purpose and category, a category label short enough for the index
    /// layout, a positive amount, a non-empty schedule of positive
    /// payments in the same denomination, and the schedule summing
    /// exactly to the allocation amount.
    pub fn from_proposal(
        id: AllocationId,
        proposal: AllocationProposal,
        now: Timestamp,
    ) -> TreasuryResult<Self> {
        if id == 0 {
            return Err(TreasuryError::InvalidProposal(
                "allocation id must be non-zero".to_string(),
            ));
        }
        if proposal.purpose.trim().is_empty() {
            return Err(TreasuryError::InvalidProposal(
                "purpose cannot be empty".to_string(),
            ));
        }
        if proposal.category.trim().is_empty() {
            return Err(TreasuryError::InvalidProposal(
                "category cannot be empty".to_string(),
            ));
        }
        if proposal.category.len() > u8::MAX as usize {
            return Err(TreasuryError::InvalidProposal(format!(
                "category label exceeds {} bytes",
                u8::MAX
            )));
        }
        if proposal.amount.is_zero() {
            return Err(TreasuryError::InvalidProposal(
                "amount must be positive".to_string(),
            ));
        }
        if proposal.schedule.is_empty() {
            return Err(TreasuryError::InvalidProposal(
                "disbursement schedule cannot be empty".to_string(),
            ));
        }

        let mut scheduled_total = Coin::zero(proposal.amount.denom.clone());
        for payment in &proposal.schedule {
            if payment.amount.is_zero() {
                return Err(TreasuryError::InvalidProposal(
                    "disbursement amounts must be positive".to_string(),
                ));
            }
            scheduled_total = scheduled_total.checked_add(&payment.amount)?;
        }
        if scheduled_total != proposal.amount {
            return Err(TreasuryError::InvalidProposal(format!(
                "disbursement schedule totals {}, allocation amount is {}",
                scheduled_total, proposal.amount
            )));
        }

        Ok(Self {
            id,
            purpose: proposal.purpose,
            category: proposal.category,
            recipient: proposal.recipient,
            amount: proposal.amount,
            status: AllocationStatus::Proposed,
            approved_by: Vec::new(),
            disbursements: proposal
                .schedule
                .into_iter()
                .map(Disbursement::planned)
                .collect(),
            metrics: Vec::new(),
            roi_bps: 0,
            justification: proposal.justification,
            expected_impact: proposal.expected_impact,
            proposed_at: now,
            approved_at: None,
            decision_comments: None,
        })
    }

    pub fn has_approved(&self, approver: &Address) -> bool {
        self.approved_by.contains(approver)
    }

    pub fn all_disbursed(&self) -> bool {
        self.disbursements.iter().all(Disbursement::is_disbursed)
    }

    /// Total already paid out to the recipient
    pub fn disbursed_total(&self) -> TreasuryResult<Coin> {
        let mut total = Coin::zero(self.amount.denom.clone());
        for disbursement in &self.disbursements {
            if disbursement.is_disbursed() {
                total = total.checked_add(&disbursement.amount)?;
            }
        }
        Ok(total)
    }

    /// Append one observation and refresh the derived ROI.
    ///
    /// ROI is the average outlook score scaled to a 20% ceiling: an
    /// allocation tracking fully on-target reports 2000 bps.
    pub fn record_metric(&mut self, metric: PerformanceMetric) {
        self.metrics.push(metric);
        self.recompute_roi();
    }

    fn recompute_roi(&mut self) {
        if self.metrics.is_empty() {
            self.roi_bps = 0;
            return;
        }
        let total: u64 = self
            .metrics
            .iter()
            .map(|metric| metric.outlook.score_bps())
            .sum();
        let average = total / self.metrics.len() as u64;
        self.roi_bps = (average * 2_000 / BPS_DENOM) as Bps;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Denom;

    fn units(amount: u128) -> Coin {
        Coin::new(Denom::from("unit"), amount)
    }

    fn payment(amount: u128, date: Timestamp) -> ScheduledPayment {
        ScheduledPayment {
            amount: units(amount),
            scheduled_date: date,
            milestone: String::new(),
        }
    }

    fn test_proposal(amount: u128, schedule: Vec<ScheduledPayment>) -> AllocationProposal {
        AllocationProposal {
            purpose: "Rural network rollout".to_string(),
            category: "infrastructure".to_string(),
            recipient: Address::new([7u8; 32]),
            amount: units(amount),
            schedule,
            justification: "Expands coverage to 40 villages".to_string(),
            expected_impact: "12k new participants".to_string(),
        }
    }

    #[test]
    fn test_from_proposal_initial_state() {
        let proposal = test_proposal(1_000, vec![payment(400, 10), payment(600, 20)]);
        let allocation = FundAllocation::from_proposal(1, proposal, 5).unwrap();

        assert_eq!(allocation.id, 1);
        assert_eq!(allocation.status, AllocationStatus::Proposed);
        assert_eq!(allocation.proposed_at, 5);
        assert!(allocation.approved_by.is_empty());
        assert_eq!(allocation.disbursements.len(), 2);
        assert!(allocation
            .disbursements
            .iter()
            .all(|d| d.status == DisbursementStatus::Pending));
        assert_eq!(allocation.roi_bps, 0);
    }

    #[test]
    fn test_from_proposal_rejects_zero_id() {
        let proposal = test_proposal(100, vec![payment(100, 10)]);
        assert!(matches!(
            FundAllocation::from_proposal(0, proposal, 5),
            Err(TreasuryError::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_from_proposal_rejects_schedule_mismatch() {
        let proposal = test_proposal(1_000, vec![payment(400, 10), payment(500, 20)]);
        let err = FundAllocation::from_proposal(1, proposal, 5).unwrap_err();
        assert!(matches!(err, TreasuryError::InvalidProposal(_)));
    }

    #[test]
    fn test_from_proposal_rejects_empty_fields() {
        let mut proposal = test_proposal(100, vec![payment(100, 10)]);
        proposal.purpose = "  ".to_string();
        assert!(FundAllocation::from_proposal(1, proposal, 5).is_err());

        let mut proposal = test_proposal(100, vec![payment(100, 10)]);
        proposal.category = String::new();
        assert!(FundAllocation::from_proposal(1, proposal, 5).is_err());

        let mut proposal = test_proposal(100, vec![payment(100, 10)]);
        proposal.schedule.clear();
        assert!(FundAllocation::from_proposal(1, proposal, 5).is_err());
    }

    #[test]
    fn test_from_proposal_rejects_oversized_category() {
        let mut proposal = test_proposal(100, vec![payment(100, 10)]);
        proposal.category = "x".repeat(256);
        assert!(FundAllocation::from_proposal(1, proposal, 5).is_err());
    }

    #[test]
    fn test_from_proposal_rejects_zero_amounts() {
        let proposal = test_proposal(0, vec![]);
        assert!(FundAllocation::from_proposal(1, proposal, 5).is_err());

        let mut proposal = test_proposal(100, vec![payment(100, 10)]);
        proposal.schedule[0].amount = units(0);
        proposal.schedule.push(payment(100, 20));
        proposal.amount = units(100);
        assert!(FundAllocation::from_proposal(1, proposal, 5).is_err());
    }

    #[test]
    fn test_transition_matrix() {
        use AllocationStatus::*;

        assert!(Proposed.can_transition_to(Approved));
        assert!(Proposed.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Active));
        assert!(Approved.can_transition_to(Completed));
        assert!(Approved.can_transition_to(Rejected));
        assert!(Active.can_transition_to(Completed));

        // never backwards, never out of a terminal state
        assert!(!Approved.can_transition_to(Proposed));
        assert!(!Active.can_transition_to(Proposed));
        assert!(!Active.can_transition_to(Approved));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Proposed.can_transition_to(Completed));

        assert!(Rejected.is_terminal());
        assert!(Completed.is_terminal());
        assert!(!Proposed.is_terminal());
    }

    #[test]
    fn test_status_code_roundtrip() {
        for status in AllocationStatus::ALL {
            assert_eq!(AllocationStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(AllocationStatus::from_code(0), None);
        assert_eq!(AllocationStatus::from_code(6), None);
    }

    #[test]
    fn test_requires_proof() {
        let plain = Disbursement::planned(payment(10, 1));
        assert!(!plain.requires_proof());

        let mut gated = payment(10, 1);
        gated.milestone = "Phase 1 complete".to_string();
        assert!(Disbursement::planned(gated).requires_proof());
    }

    #[test]
    fn test_roi_recompute() {
        let proposal = test_proposal(100, vec![payment(100, 10)]);
        let mut allocation = FundAllocation::from_proposal(1, proposal, 5).unwrap();

        allocation.record_metric(PerformanceMetric {
            label: "villages connected".to_string(),
            outlook: MetricOutlook::OnTrack,
            observed_at: 50,
        });
        assert_eq!(allocation.roi_bps, 2_000);

        allocation.record_metric(PerformanceMetric {
            label: "budget burn".to_string(),
            outlook: MetricOutlook::AtRisk,
            observed_at: 60,
        });
        // average of 10000 and 5000 is 7500, scaled to 1500 bps
        assert_eq!(allocation.roi_bps, 1_500);

        allocation.record_metric(PerformanceMetric {
            label: "timeline".to_string(),
            outlook: MetricOutlook::Behind,
            observed_at: 70,
        });
        assert_eq!(allocation.roi_bps, 1_000);
        assert_eq!(allocation.metrics.len(), 3);
    }

    #[test]
    fn test_disbursed_total() {
        let proposal = test_proposal(1_000, vec![payment(400, 10), payment(600, 20)]);
        let mut allocation = FundAllocation::from_proposal(1, proposal, 5).unwrap();
        assert!(allocation.disbursed_total().unwrap().is_zero());

        allocation.disbursements[0].status = DisbursementStatus::Disbursed;
        assert_eq!(allocation.disbursed_total().unwrap(), units(400));
        assert!(!allocation.all_disbursed());

        allocation.disbursements[1].status = DisbursementStatus::Disbursed;
        assert_eq!(allocation.disbursed_total().unwrap(), units(1_000));
        assert!(allocation.all_disbursed());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let proposal = test_proposal(1_000, vec![payment(400, 10), payment(600, 20)]);
        let allocation = FundAllocation::from_proposal(3, proposal, 5).unwrap();

        let bytes = bincode::serialize(&allocation).unwrap();
        let decoded: FundAllocation = bincode::deserialize(&bytes).unwrap();
        assert_eq!(allocation, decoded);
    }
}
