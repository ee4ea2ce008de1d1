//! Balance-related types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Add;

use super::Location;

/// Holdings of a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    /// Exact quantity held.
    pub amount: Decimal,
    /// Fiat value of `amount` at `price`.
    pub value: Decimal,
    /// Latest known unit price, if a price feed has populated it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl AssetBalance {
    pub fn new(amount: Decimal, value: Decimal) -> Self {
        Self { amount, value, price: None }
    }

    /// Balance valued at `price`.
    pub fn priced(amount: Decimal, price: Decimal) -> Self {
        Self { amount, value: amount * price, price: Some(price) }
    }

    /// Same amount re-valued at `price`.
    pub fn with_price(self, price: Decimal) -> Self {
        Self::priced(self.amount, price)
    }
}

/// Sums amount and value. The price survives only when both sides were valued
/// at the same price, so `value == amount * price` holds for a priced sum.
impl Add for AssetBalance {
    type Output = AssetBalance;

    fn add(self, rhs: AssetBalance) -> AssetBalance {
        let price = match (self.price, rhs.price) {
            (Some(a), Some(b)) if a == b => Some(a),
            _ => None,
        };

        AssetBalance { amount: self.amount + rhs.amount, value: self.value + rhs.value, price }
    }
}

/// Asset holdings for one exchange location, keyed by canonical asset id.
pub type ExchangeBalanceSheet = HashMap<String, AssetBalance>;

/// Balance sheets of every location with fetched balances.
pub type ExchangeBalances = HashMap<Location, ExchangeBalanceSheet>;

/// Balance entry as reported by the backend balance task.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAssetBalance {
    pub amount: Decimal,
    #[serde(alias = "usd_value")]
    pub value: Decimal,
}

/// One asset of a location, for sorted listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub asset: String,
    #[serde(flatten)]
    pub balance: AssetBalance,
}

/// Total value held on one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationTotal {
    pub location: Location,
    pub total: Decimal,
}

/// Holdings of one asset on one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationBreakdown {
    pub location: Location,
    #[serde(flatten)]
    pub balance: AssetBalance,
}
