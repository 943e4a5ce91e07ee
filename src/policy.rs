//! Allocation Policy
//!
//! Every limit the engine enforces arrives through an explicit
//! [`PolicyConfig`] value. The core never reads ambient parameters, so
//! unit tests can pin policy without any environment setup.

use serde::{Deserialize, Serialize};

use crate::errors::TreasuryResult;
use crate::types::{Address, Bps, Coin, Denom};

/// Policy knobs for the allocation lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Master switch; proposals fail while false
    pub allocations_enabled: bool,
    /// Denomination the fund operates in
    pub denom: Denom,
    /// Cap on a single allocation as a share of the treasury balance
    pub max_allocation_bps: Bps,
    /// Floor the treasury may not drop below after allocating
    pub min_fund_balance: Coin,
    /// Recognized allocation categories
    pub categories: Vec<String>,
    /// Addresses allowed to submit performance metrics besides the
    /// allocation recipient
    pub authorized_auditors: Vec<Address>,
}

impl PolicyConfig {
    /// Standard policy for a fund in `denom`: allocations enabled, 5%
    /// single-allocation cap, no balance floor, the stock category set,
    /// no external auditors.
    pub fn new(denom: Denom) -> Self {
        Self {
            allocations_enabled: true,
            max_allocation_bps: 500,
            min_fund_balance: Coin::zero(denom.clone()),
            categories: vec![
                "infrastructure".to_string(),
                "ecosystem".to_string(),
                "innovation".to_string(),
                "marketing".to_string(),
                "emergency".to_string(),
            ],
            authorized_auditors: Vec::new(),
            denom,
        }
    }

    pub fn is_recognized_category(&self, category: &str) -> bool {
        self.categories.iter().any(|known| known == category)
    }

    pub fn is_authorized_auditor(&self, address: &Address) -> bool {
        self.authorized_auditors.contains(address)
    }

    /// Largest single allocation the policy permits against `balance`
    pub fn max_single_allocation(&self, balance: &Coin) -> TreasuryResult<Coin> {
        balance.share_bps(self.max_allocation_bps)
    }
}
