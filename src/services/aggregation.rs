//! Derived views over exchange balances.
//!
//! Pure functions recomputed on every read. Ignored assets are excluded from
//! every view; asset identifiers are resolved to their canonical form before
//! they are compared or summed.

use rust_decimal::Decimal;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use super::{assets::AssetResolver, prices::PriceFeed};
use crate::types::{
    AssetBalance, AssetEntry, ExchangeAccount, ExchangeBalanceSheet, ExchangeBalances, Location,
    LocationBreakdown, LocationTotal, RawAssetBalance,
};

/// Build a balance sheet from a raw backend payload.
///
/// Identifiers are resolved to their canonical form (equivalent assets are
/// summed), empty holdings are dropped and known prices are attached.
pub fn merge_sheet(
    raw: HashMap<String, RawAssetBalance>,
    assets: &dyn AssetResolver,
    prices: &dyn PriceFeed,
) -> ExchangeBalanceSheet {
    let mut sheet = ExchangeBalanceSheet::new();

    for (asset, entry) in raw {
        if entry.amount.is_zero() {
            continue;
        }

        let canonical = assets.resolve_canonical(&asset);
        let balance = match prices.current_price(&canonical) {
            Some(price) => AssetBalance::priced(entry.amount, price),
            None => AssetBalance::new(entry.amount, entry.value),
        };

        sheet
            .entry(canonical)
            .and_modify(|existing| *existing = *existing + balance)
            .or_insert(balance);
    }

    sheet
}

/// Re-value every asset with a price in `prices`.
pub fn reprice(balances: &ExchangeBalances, prices: &HashMap<String, Decimal>) -> ExchangeBalances {
    balances
        .iter()
        .map(|(location, sheet)| {
            let sheet: ExchangeBalanceSheet = sheet
                .iter()
                .map(|(asset, balance)| {
                    let balance = match prices.get(asset) {
                        Some(price) => balance.with_price(*price),
                        None => *balance,
                    };
                    (asset.clone(), balance)
                })
                .collect();
            (*location, sheet)
        })
        .collect()
}

fn by_value_desc(a: Decimal, b: Decimal) -> Ordering {
    b.cmp(&a)
}

/// Assets of one sheet, highest value first.
pub fn sorted_assets(sheet: &ExchangeBalanceSheet, assets: &dyn AssetResolver) -> Vec<AssetEntry> {
    let mut merged: HashMap<String, AssetBalance> = HashMap::new();
    for (asset, balance) in sheet {
        if assets.is_ignored(asset) {
            continue;
        }
        merged
            .entry(assets.resolve_canonical(asset))
            .and_modify(|existing| *existing = *existing + *balance)
            .or_insert(*balance);
    }

    let mut entries: Vec<AssetEntry> =
        merged.into_iter().map(|(asset, balance)| AssetEntry { asset, balance }).collect();
    entries.sort_by(|a, b| {
        by_value_desc(a.balance.value, b.balance.value).then_with(|| a.asset.cmp(&b.asset))
    });
    entries
}

/// Total value of every location, highest first.
pub fn location_totals(
    balances: &ExchangeBalances,
    assets: &dyn AssetResolver,
) -> Vec<LocationTotal> {
    let mut totals: Vec<LocationTotal> = balances
        .iter()
        .map(|(location, sheet)| LocationTotal {
            location: *location,
            total: sheet
                .iter()
                .filter(|(asset, _)| !assets.is_ignored(asset))
                .map(|(_, balance)| balance.value)
                .sum(),
        })
        .collect();

    totals.sort_by(|a, b| by_value_desc(a.total, b.total).then_with(|| a.location.cmp(&b.location)));
    totals
}

/// Holdings of every asset summed across all locations.
pub fn aggregate_by_asset(
    balances: &ExchangeBalances,
    assets: &dyn AssetResolver,
) -> BTreeMap<String, AssetBalance> {
    let mut aggregated: BTreeMap<String, AssetBalance> = BTreeMap::new();

    for sheet in balances.values() {
        for (asset, balance) in sheet {
            if assets.is_ignored(asset) {
                continue;
            }
            aggregated
                .entry(assets.resolve_canonical(asset))
                .and_modify(|existing| *existing = *existing + *balance)
                .or_insert(*balance);
        }
    }

    aggregated
}

/// Locations holding `asset`, highest value first.
pub fn asset_breakdown(
    balances: &ExchangeBalances,
    asset: &str,
    assets: &dyn AssetResolver,
) -> Vec<LocationBreakdown> {
    let wanted = assets.resolve_canonical(asset);

    let mut breakdown: Vec<LocationBreakdown> = balances
        .iter()
        .filter_map(|(location, sheet)| {
            sheet
                .iter()
                .filter(|(id, _)| !assets.is_ignored(id) && assets.resolve_canonical(id) == wanted)
                .map(|(_, balance)| *balance)
                .reduce(|acc, balance| acc + balance)
                .map(|balance| LocationBreakdown { location: *location, balance })
        })
        .collect();

    breakdown.sort_by(|a, b| {
        by_value_desc(a.balance.value, b.balance.value).then_with(|| a.location.cmp(&b.location))
    });
    breakdown
}

/// Converted total per location label.
///
/// `convert` is applied to each asset value before summing, so non-linear
/// conversions see individual values.
pub fn converted_totals<F>(
    balances: &ExchangeBalances,
    assets: &dyn AssetResolver,
    convert: F,
) -> BTreeMap<String, Decimal>
where
    F: Fn(Decimal) -> Decimal,
{
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();

    for (location, sheet) in balances {
        let converted: Decimal = sheet
            .iter()
            .filter(|(asset, _)| !assets.is_ignored(asset))
            .map(|(_, balance)| convert(balance.value))
            .sum();
        *totals.entry(location.label().to_string()).or_insert(Decimal::ZERO) += converted;
    }

    totals
}

/// Number to suffix a new account of `location` with.
pub fn exchange_nonce(accounts: &[ExchangeAccount], location: Location) -> usize {
    accounts.iter().filter(|account| account.location == location).count() + 1
}

/// Default name for a new account of `location`, e.g. "Kraken 2".
pub fn suggested_account_name(accounts: &[ExchangeAccount], location: Location) -> String {
    format!("{} {}", location.label(), exchange_nonce(accounts, location))
}
