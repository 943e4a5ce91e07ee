//! Allocation Ledger
//!
//! Canonical `FundAllocation` records plus the index maintenance that
//! keeps the by-status, by-category and by-recipient lookups from ever
//! drifting out of the primary records.
//!
//! # Invariants
//!
//! - Scanning an index for value `v` yields exactly the ids whose field
//!   equals `v`, after every mutating call.
//! - Status changes go through [`update_status`](AllocationLedger::update_status)
//!   alone; [`put_allocation`](AllocationLedger::put_allocation) refuses a
//!   record whose status differs from the stored one, so a stale status
//!   marker cannot be left behind by any call sequence.
//! - Ids are assigned monotonically starting at 1 and never reused.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::allocation::{AllocationStatus, FundAllocation};
use crate::errors::{TreasuryError, TreasuryResult};
use crate::storage::{keys, LedgerStore, StorageError};
use crate::types::{Address, AllocationId, Coin, Denom, Timestamp};

/// Dimension + value pair for secondary-index lookups
#[derive(Clone, Copy, Debug)]
pub enum IndexSelector<'a> {
    Status(AllocationStatus),
    Category(&'a str),
    Recipient(&'a Address),
}

impl IndexSelector<'_> {
    fn prefix(&self) -> Vec<u8> {
        match self {
            IndexSelector::Status(status) => keys::status_index_prefix(*status).to_vec(),
            IndexSelector::Category(category) => keys::category_index_prefix(category),
            IndexSelector::Recipient(recipient) => keys::recipient_index_prefix(recipient).to_vec(),
        }
    }
}

/// Aggregate snapshot of the ledger (counts by status, committed and
/// paid-out totals)
#[derive(Clone, Debug, PartialEq)]
pub struct FundSummary {
    pub proposed_count: usize,
    pub approved_count: usize,
    pub rejected_count: usize,
    pub active_count: usize,
    pub completed_count: usize,
    /// Sum over every non-terminal allocation
    pub total_allocated: Coin,
    /// Sum of executed disbursements across all allocations
    pub total_disbursed: Coin,
}

/// One upcoming payment, as reported by
/// [`pending_disbursements`](AllocationLedger::pending_disbursements)
#[derive(Clone, Debug, PartialEq)]
pub struct PendingDisbursement {
    pub allocation_id: AllocationId,
    pub index: usize,
    pub amount: Coin,
    pub scheduled_date: Timestamp,
    pub milestone: String,
}

/// The allocation ledger over any [`LedgerStore`] backend.
pub struct AllocationLedger<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> AllocationLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(value).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
        bincode::deserialize(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Id assignment
    // ------------------------------------------------------------------

    /// Number of allocations ever created (equals the last assigned id)
    pub fn allocation_count(&self) -> TreasuryResult<u64> {
        match self.store.get(keys::meta::ALLOCATION_COUNT)? {
            None => Ok(0),
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::Serialization("allocation counter is malformed".to_string())
                })?;
                Ok(u64::from_be_bytes(raw))
            }
        }
    }

    /// Assign the next allocation id and persist the counter
    pub fn next_allocation_id(&mut self) -> TreasuryResult<AllocationId> {
        let next = self
            .allocation_count()?
            .checked_add(1)
            .ok_or(TreasuryError::Overflow)?;
        self.store
            .set(keys::meta::ALLOCATION_COUNT, &next.to_be_bytes())?;
        Ok(next)
    }

    // ------------------------------------------------------------------
    // Primary records + index maintenance
    // ------------------------------------------------------------------

    /// Write the primary record and (re)write all three index markers.
    ///
    /// Refuses a record whose status differs from the one already stored;
    /// status changes must go through [`update_status`](Self::update_status)
    /// so the old index marker is retired in the same step.
    pub fn put_allocation(&mut self, allocation: &FundAllocation) -> TreasuryResult<()> {
        if let Some(existing) = self.get_allocation(allocation.id)? {
            if existing.status != allocation.status {
                return Err(TreasuryError::InvalidStatus {
                    operation: "rewrite allocation record",
                    status: existing.status,
                });
            }
        }

        self.store.set(
            &keys::allocation_key(allocation.id),
            &Self::encode(allocation)?,
        )?;
        self.store
            .set(&keys::status_index_key(allocation.status, allocation.id), b"")?;
        self.store.set(
            &keys::category_index_key(&allocation.category, allocation.id),
            b"",
        )?;
        self.store.set(
            &keys::recipient_index_key(&allocation.recipient, allocation.id),
            b"",
        )?;

        debug!(
            id = allocation.id,
            status = %allocation.status,
            category = %allocation.category,
            "allocation record written"
        );
        Ok(())
    }

    pub fn get_allocation(&self, id: AllocationId) -> TreasuryResult<Option<FundAllocation>> {
        match self.store.get(&keys::allocation_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
        }
    }

    /// [`get_allocation`](Self::get_allocation) that fails with `NotFound`
    pub fn require_allocation(&self, id: AllocationId) -> TreasuryResult<FundAllocation> {
        self.get_allocation(id)?
            .ok_or(TreasuryError::NotFound(id))
    }

    /// The single entry point for status changes: retire the old status
    /// marker, write the record with the new status, write the new marker.
    pub fn update_status(
        &mut self,
        id: AllocationId,
        new_status: AllocationStatus,
    ) -> TreasuryResult<FundAllocation> {
        let mut allocation = self.require_allocation(id)?;
        let old_status = allocation.status;
        if old_status == new_status {
            return Ok(allocation);
        }

        self.store
            .delete(&keys::status_index_key(old_status, id))?;
        allocation.status = new_status;
        self.store
            .set(&keys::allocation_key(id), &Self::encode(&allocation)?)?;
        self.store
            .set(&keys::status_index_key(new_status, id), b"")?;

        debug!(id, from = %old_status, to = %new_status, "allocation status updated");
        Ok(allocation)
    }

    // ------------------------------------------------------------------
    // Index lookups
    // ------------------------------------------------------------------

    /// Lazily yield every allocation whose indexed field matches the
    /// selector, in ascending id order, dereferencing each id through the
    /// primary store. An index marker without a primary record surfaces
    /// as `NotFound` rather than being skipped.
    pub fn list_by<'a>(
        &'a self,
        selector: IndexSelector<'_>,
    ) -> Box<dyn Iterator<Item = TreasuryResult<FundAllocation>> + 'a> {
        let prefix = selector.prefix();
        Box::new(self.store.iterate(&prefix).map(move |entry| {
            let (key, _) = entry?;
            let id = keys::parse_index_id(&key).ok_or_else(|| {
                StorageError::Serialization(format!(
                    "malformed index key {}",
                    hex::encode(&key)
                ))
            })?;
            self.require_allocation(id)
        }))
    }

    /// Count index markers for `status` without touching primary records
    pub fn count_by_status(&self, status: AllocationStatus) -> TreasuryResult<usize> {
        let prefix = keys::status_index_prefix(status);
        let mut count = 0;
        for entry in self.store.iterate(&prefix) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// One pass over the primary records: counts per status plus the
    /// committed and disbursed totals in `denom`.
    pub fn summary(&self, denom: &Denom) -> TreasuryResult<FundSummary> {
        let mut summary = FundSummary {
            proposed_count: 0,
            approved_count: 0,
            rejected_count: 0,
            active_count: 0,
            completed_count: 0,
            total_allocated: Coin::zero(denom.clone()),
            total_disbursed: Coin::zero(denom.clone()),
        };

        for entry in self.store.iterate(&keys::allocations_prefix()) {
            let (_, bytes) = entry?;
            let allocation: FundAllocation = Self::decode(&bytes)?;

            match allocation.status {
                AllocationStatus::Proposed => summary.proposed_count += 1,
                AllocationStatus::Approved => summary.approved_count += 1,
                AllocationStatus::Rejected => summary.rejected_count += 1,
                AllocationStatus::Active => summary.active_count += 1,
                AllocationStatus::Completed => summary.completed_count += 1,
            }

            if !allocation.status.is_terminal() {
                summary.total_allocated =
                    summary.total_allocated.checked_add(&allocation.amount)?;
            }
            summary.total_disbursed = summary
                .total_disbursed
                .checked_add(&allocation.disbursed_total()?)?;
        }

        Ok(summary)
    }

    /// Every pending payment of an approved or active allocation falling
    /// due within `horizon` seconds of `now`, soonest first.
    pub fn pending_disbursements(
        &self,
        now: Timestamp,
        horizon: u64,
    ) -> TreasuryResult<Vec<PendingDisbursement>> {
        let cutoff = now.saturating_add(horizon);
        let mut upcoming = Vec::new();

        for status in [AllocationStatus::Approved, AllocationStatus::Active] {
            for allocation in self.list_by(IndexSelector::Status(status)) {
                let allocation = allocation?;
                for (index, disbursement) in allocation.disbursements.iter().enumerate() {
                    if disbursement.is_disbursed() || disbursement.scheduled_date > cutoff {
                        continue;
                    }
                    upcoming.push(PendingDisbursement {
                        allocation_id: allocation.id,
                        index,
                        amount: disbursement.amount.clone(),
                        scheduled_date: disbursement.scheduled_date,
                        milestone: disbursement.milestone.clone(),
                    });
                }
            }
        }

        upcoming.sort_by_key(|p| (p.scheduled_date, p.allocation_id, p.index));
        Ok(upcoming)
    }
}

// ============================================================================
// TESTS
// ============================================================================
