//! Canonical Primitive Types for the Treasury Ledger
//!
//! Rule: amounts are exact integers tagged with their denomination. No
//! floating point is permitted anywhere near money; rates and thresholds
//! are integer basis points.
//!
//! These types are the foundation of every persisted record. They are
//! designed to be:
//! - Deterministically serializable
//! - Efficient to copy and compare
//! - Impossible to mix across denominations by accident

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::errors::{TreasuryError, TreasuryResult};

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Allocation identifier, monotonically assigned starting at 1
pub type AllocationId = u64;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Raw token amount (supports up to ~340 undecillion units)
pub type Amount = u128;

/// Basis points for percentage calculations (10000 = 100%)
pub type Bps = u16;

/// Denominator for basis-point arithmetic
pub const BPS_DENOM: u64 = 10_000;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// 32-byte account address
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Create a new Address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed Address
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// DENOMINATED AMOUNTS
// ============================================================================

/// Denomination label for a fungible token
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Denom(String);

impl Denom {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Denom({})", self.0)
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Denom {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

/// An exact, non-negative quantity of a single denomination.
///
/// Arithmetic never wraps: additions fail with `Overflow`, subtractions
/// that would go negative fail with `Underflow`, and any operation across
/// two denominations fails with `DenomMismatch`.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: Denom, amount: Amount) -> Self {
        Self { denom, amount }
    }

    /// A zero quantity of the given denomination
    pub fn zero(denom: Denom) -> Self {
        Self { denom, amount: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    fn require_same_denom(&self, other: &Coin) -> TreasuryResult<()> {
        if self.denom != other.denom {
            return Err(TreasuryError::DenomMismatch {
                expected: self.denom.clone(),
                found: other.denom.clone(),
            });
        }
        Ok(())
    }

    /// `self + other`, failing on overflow or denomination mismatch
    pub fn checked_add(&self, other: &Coin) -> TreasuryResult<Coin> {
        self.require_same_denom(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(TreasuryError::Overflow)?;
        Ok(Coin::new(self.denom.clone(), amount))
    }

    /// `self - other`, failing if the result would be negative
    pub fn checked_sub(&self, other: &Coin) -> TreasuryResult<Coin> {
        self.require_same_denom(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(TreasuryError::Underflow)?;
        Ok(Coin::new(self.denom.clone(), amount))
    }

    /// Ordering comparison, only defined within one denomination
    pub fn compare(&self, other: &Coin) -> TreasuryResult<Ordering> {
        self.require_same_denom(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// `bps` basis points of this quantity, rounded down
    pub fn share_bps(&self, bps: Bps) -> TreasuryResult<Coin> {
        let amount = self
            .amount
            .checked_mul(bps as Amount)
            .ok_or(TreasuryError::Overflow)?
            / BPS_DENOM as Amount;
        Ok(Coin::new(self.denom.clone(), amount))
    }
}

impl fmt::Debug for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coin({} {})", self.amount, self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
