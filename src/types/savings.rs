//! Savings-interest types for Binance-family exchanges.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Location;

/// Filter for savings-interest queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsFilter {
    pub location: Location,
    /// Answer from the local cache only, never querying the exchange.
    pub only_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default = "default_order_by")]
    pub order_by_attributes: Vec<String>,
    #[serde(default = "default_ascending")]
    pub ascending: Vec<bool>,
}

fn default_order_by() -> Vec<String> {
    vec!["timestamp".to_string()]
}

fn default_ascending() -> Vec<bool> {
    vec![false]
}

impl SavingsFilter {
    /// Every record of `location`, newest first, fetched live.
    pub fn refresh_all(location: Location) -> Self {
        Self {
            location,
            only_cache: false,
            limit: None,
            offset: None,
            order_by_attributes: default_order_by(),
            ascending: default_ascending(),
        }
    }

    /// One cached page of `location`, newest first.
    pub fn cached_page(location: Location, limit: u64, offset: u64) -> Self {
        Self {
            location,
            only_cache: true,
            limit: Some(limit),
            offset: Some(offset),
            order_by_attributes: default_order_by(),
            ascending: default_ascending(),
        }
    }
}

/// A single interest payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsEvent {
    pub asset: String,
    pub amount: Decimal,
    #[serde(alias = "usd_value")]
    pub value: Decimal,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// Total received per asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReceived {
    pub asset: String,
    pub amount: Decimal,
    #[serde(alias = "usd_value")]
    pub value: Decimal,
}

/// Savings response as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SavingsCollectionResponse {
    pub entries: Vec<SavingsEvent>,
    pub entries_found: u64,
    pub entries_limit: i64,
    pub entries_total: u64,
    #[serde(default, alias = "total_usd_value")]
    pub total_value: Decimal,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub received: Vec<AssetReceived>,
}

/// Paged collection shape shared by every list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection<T> {
    pub data: Vec<T>,
    /// Entries matching the filter.
    pub found: u64,
    /// Entries available without a premium limit, -1 when unlimited.
    pub limit: i64,
    /// Entries stored regardless of the filter.
    pub total: u64,
    pub total_value: Decimal,
}

/// Savings page with its per-asset summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsCollection {
    #[serde(flatten)]
    pub collection: Collection<SavingsEvent>,
    pub assets: Vec<String>,
    pub received: Vec<AssetReceived>,
}

impl From<SavingsCollectionResponse> for SavingsCollection {
    fn from(response: SavingsCollectionResponse) -> Self {
        Self {
            collection: Collection {
                data: response.entries,
                found: response.entries_found,
                limit: response.entries_limit,
                total: response.entries_total,
                total_value: response.total_value,
            },
            assets: response.assets,
            received: response.received,
        }
    }
}
