//! Key Encoding Helpers
//!
//! Key encoding is PROTOCOL. These functions define the canonical byte
//! layout for every ledger key. Never inline key construction in business
//! logic.
//!
//! # Key Design Principles
//!
//! 1. **Deterministic** - Same input always produces the same key
//! 2. **Sortable** - Allocation ids sort numerically (big-endian u64)
//! 3. **Namespaced** - The first byte tags the keyspace, so record keys,
//!    index keys and meta keys never collide in the shared store
//!
//! # Layout
//!
//! ```text
//! [0x01][id: 8 BE]                          allocation record
//! [0x02][status: 1][id: 8 BE]               by-status index marker
//! [0x03][len: 1][category bytes][id: 8 BE]  by-category index marker
//! [0x04][recipient: 32][id: 8 BE]           by-recipient index marker
//! [0x00]...                                 meta singletons
//! ```
//!
//! Index entries store an empty value; the key alone is the marker. The
//! category segment is length-prefixed so one category name can never be
//! a byte prefix of another's segment (categories are validated to fit in
//! a single length byte before they reach this layer).

use crate::allocation::AllocationStatus;
use crate::types::{Address, AllocationId};

const TAG_ALLOCATION: u8 = 0x01;
const TAG_STATUS_INDEX: u8 = 0x02;
const TAG_CATEGORY_INDEX: u8 = 0x03;
const TAG_RECIPIENT_INDEX: u8 = 0x04;

// =============================================================================
// ALLOCATION RECORD KEYS
// =============================================================================

/// Key for an allocation record: tag + id (8 bytes BE) → record bytes
#[inline]
pub fn allocation_key(id: AllocationId) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = TAG_ALLOCATION;
    key[1..].copy_from_slice(&id.to_be_bytes());
    key
}

/// Prefix covering every allocation record
#[inline]
pub fn allocations_prefix() -> [u8; 1] {
    [TAG_ALLOCATION]
}

/// Parse an allocation id from a record key
#[inline]
pub fn parse_allocation_key(key: &[u8]) -> Option<AllocationId> {
    if key.len() != 9 || key[0] != TAG_ALLOCATION {
        return None;
    }
    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&key[1..]);
    Some(AllocationId::from_be_bytes(id_bytes))
}

// =============================================================================
// STATUS INDEX KEYS
// =============================================================================

/// Key for a by-status index marker: tag + status code + id (8 bytes BE)
#[inline]
pub fn status_index_key(status: AllocationStatus, id: AllocationId) -> [u8; 10] {
    let mut key = [0u8; 10];
    key[0] = TAG_STATUS_INDEX;
    key[1] = status.code();
    key[2..].copy_from_slice(&id.to_be_bytes());
    key
}

/// Prefix covering every id currently at `status`
#[inline]
pub fn status_index_prefix(status: AllocationStatus) -> [u8; 2] {
    [TAG_STATUS_INDEX, status.code()]
}

/// Parse (status, id) from a by-status index key
#[inline]
pub fn parse_status_index_key(key: &[u8]) -> Option<(AllocationStatus, AllocationId)> {
    if key.len() != 10 || key[0] != TAG_STATUS_INDEX {
        return None;
    }
    let status = AllocationStatus::from_code(key[1])?;
    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&key[2..]);
    Some((status, AllocationId::from_be_bytes(id_bytes)))
}

// =============================================================================
// CATEGORY INDEX KEYS
// =============================================================================

/// Key for a by-category index marker:
/// tag + length-prefixed category + id (8 bytes BE)
#[inline]
pub fn category_index_key(category: &str, id: AllocationId) -> Vec<u8> {
    let mut key = category_index_prefix(category);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Prefix covering every id filed under `category`
#[inline]
pub fn category_index_prefix(category: &str) -> Vec<u8> {
    let bytes = category.as_bytes();
    debug_assert!(bytes.len() <= u8::MAX as usize);
    let mut prefix = Vec::with_capacity(2 + bytes.len());
    prefix.push(TAG_CATEGORY_INDEX);
    prefix.push(bytes.len() as u8);
    prefix.extend_from_slice(bytes);
    prefix
}

// =============================================================================
// RECIPIENT INDEX KEYS
// =============================================================================

/// Key for a by-recipient index marker: tag + address + id (8 bytes BE)
#[inline]
pub fn recipient_index_key(recipient: &Address, id: AllocationId) -> [u8; 41] {
    let mut key = [0u8; 41];
    key[0] = TAG_RECIPIENT_INDEX;
    key[1..33].copy_from_slice(recipient.as_bytes());
    key[33..].copy_from_slice(&id.to_be_bytes());
    key
}

/// Prefix covering every id paying out to `recipient`
#[inline]
pub fn recipient_index_prefix(recipient: &Address) -> [u8; 33] {
    let mut prefix = [0u8; 33];
    prefix[0] = TAG_RECIPIENT_INDEX;
    prefix[1..].copy_from_slice(recipient.as_bytes());
    prefix
}

// =============================================================================
// SHARED INDEX PARSING
// =============================================================================

/// Parse the trailing allocation id common to every index key layout
#[inline]
pub fn parse_index_id(key: &[u8]) -> Option<AllocationId> {
    if key.len() < 9 {
        return None;
    }
    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&key[key.len() - 8..]);
    Some(AllocationId::from_be_bytes(id_bytes))
}

// =============================================================================
// META KEYS
// =============================================================================

/// Well-known meta keys (tag byte 0x00 keeps them out of every index range)
pub mod meta {
    /// Key for the monotonic allocation id counter
    pub const ALLOCATION_COUNT: &[u8] = b"\x00allocation_count";
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_key_ordering() {
        // Keys should sort in ascending id order
        let k1 = allocation_key(1);
        let k2 = allocation_key(2);
        let k256 = allocation_key(256);
        let kmax = allocation_key(u64::MAX);

        assert!(k1 < k2);
        assert!(k2 < k256);
        assert!(k256 < kmax);
    }

    #[test]
    fn test_allocation_key_roundtrip() {
        let key = allocation_key(42);
        assert_eq!(key.len(), 9);
        assert_eq!(parse_allocation_key(&key), Some(42));
        assert!(key.starts_with(&allocations_prefix()));
    }

    #[test]
    fn test_status_index_key_roundtrip() {
        let key = status_index_key(AllocationStatus::Approved, 7);
        let (status, id) = parse_status_index_key(&key).unwrap();
        assert_eq!(status, AllocationStatus::Approved);
        assert_eq!(id, 7);
        assert!(key.starts_with(&status_index_prefix(AllocationStatus::Approved)));
    }

    #[test]
    fn test_status_prefixes_are_disjoint() {
        let proposed = status_index_key(AllocationStatus::Proposed, 1);
        let approved_prefix = status_index_prefix(AllocationStatus::Approved);
        assert!(!proposed.starts_with(&approved_prefix));
    }

    #[test]
    fn test_category_prefix_no_substring_collision() {
        // "eco" must not capture "ecosystem" entries
        let eco = category_index_key("eco", 1);
        let ecosystem = category_index_key("ecosystem", 1);
        assert!(!ecosystem.starts_with(&category_index_prefix("eco")));
        assert!(eco.starts_with(&category_index_prefix("eco")));
    }

    #[test]
    fn test_recipient_index_key_layout() {
        let recipient = Address::new([0xcd; 32]);
        let key = recipient_index_key(&recipient, 9);
        assert_eq!(key.len(), 41);
        assert!(key.starts_with(&recipient_index_prefix(&recipient)));
        assert_eq!(parse_index_id(&key), Some(9));
    }

    #[test]
    fn test_parse_index_id_across_layouts() {
        let status_key = status_index_key(AllocationStatus::Active, 11);
        let category_key = category_index_key("infrastructure", 12);
        let recipient_key = recipient_index_key(&Address::zero(), 13);

        assert_eq!(parse_index_id(&status_key), Some(11));
        assert_eq!(parse_index_id(&category_key), Some(12));
        assert_eq!(parse_index_id(&recipient_key), Some(13));
    }

    #[test]
    fn test_parse_invalid_keys() {
        assert!(parse_allocation_key(&[0; 8]).is_none()); // too short
        assert!(parse_allocation_key(&[0; 10]).is_none()); // too long
        assert!(parse_allocation_key(&allocation_key(1)[..8]).is_none());
        assert!(parse_status_index_key(&[TAG_STATUS_INDEX, 0xff, 0, 0, 0, 0, 0, 0, 0, 1]).is_none());
        assert!(parse_index_id(&[0; 5]).is_none());
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let record = allocation_key(1);
        let status = status_index_key(AllocationStatus::Proposed, 1);
        let recipient = recipient_index_key(&Address::zero(), 1);

        assert!(!status.starts_with(&allocations_prefix()));
        assert!(!recipient.starts_with(&allocations_prefix()));
        assert_ne!(record[0], status[0]);
        assert_ne!(status[0], recipient[0]);
        assert_ne!(meta::ALLOCATION_COUNT[0], record[0]);
    }
}
