//! Latest known asset prices.

use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

/// Source of current unit prices in the main currency.
pub trait PriceFeed: Send + Sync {
    fn current_price(&self, asset: &str) -> Option<Decimal>;
}

/// In-memory price table updated by price refreshes.
#[derive(Debug, Default)]
pub struct PriceCache {
    prices: RwLock<HashMap<String, Decimal>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `prices` into the table, overwriting known assets.
    pub fn update(&self, prices: &HashMap<String, Decimal>) {
        let mut table = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        table.extend(prices.iter().map(|(asset, price)| (asset.clone(), *price)));
    }

    pub fn len(&self) -> usize {
        self.prices.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PriceFeed for PriceCache {
    fn current_price(&self, asset: &str) -> Option<Decimal> {
        self.prices.read().unwrap_or_else(PoisonError::into_inner).get(asset).copied()
    }
}
