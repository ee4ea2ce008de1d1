//! Exchange balance registry.
//!
//! Owns the configured exchange accounts and the balance sheet of every
//! location, and keeps both in sync with the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::RwLock;

use super::{
    aggregation,
    assets::AssetResolver,
    notifications::{Message, Notification, Notifier},
    prices::PriceFeed,
    status::{Section, Status, StatusStore},
    tasks::{PendingTask, TaskRegistry},
};
use crate::{
    backend::ExchangeApi,
    error::{AppError, Result},
    types::{
        AssetBalance, AssetEntry, ExchangeAccount, ExchangeBalanceSheet, ExchangeBalances,
        ExchangeSetupPayload, Location, LocationBreakdown, LocationTotal, RawAssetBalance,
        TaskKind, TaskMeta,
    },
};

/// Result of a balance fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The location's sheet was replaced.
    Loaded,
    /// A fetch for the location was already running, or the location has no
    /// configured account.
    Skipped,
    /// The fetch failed; a notification was raised.
    Failed,
}

#[derive(Debug, Default)]
struct RegistryState {
    accounts: Vec<ExchangeAccount>,
    balances: ExchangeBalances,
}

impl RegistryState {
    fn position(&self, name: &str, location: Location) -> Option<usize> {
        self.accounts.iter().position(|account| account.matches(name, location))
    }

    fn has_location(&self, location: Location) -> bool {
        self.accounts.iter().any(|account| account.location == location)
    }
}

/// Registry of exchange accounts and their balances.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ExchangeBalanceRegistry {
    state: Arc<RwLock<RegistryState>>,
    pub(super) api: Arc<dyn ExchangeApi>,
    pub(super) tasks: Arc<TaskRegistry>,
    assets: Arc<dyn AssetResolver>,
    prices: Arc<dyn PriceFeed>,
    pub(super) status: Arc<StatusStore>,
    pub(super) notifier: Arc<dyn Notifier>,
}

impl ExchangeBalanceRegistry {
    /// Create an empty registry.
    pub fn new(
        api: Arc<dyn ExchangeApi>,
        tasks: Arc<TaskRegistry>,
        assets: Arc<dyn AssetResolver>,
        prices: Arc<dyn PriceFeed>,
        status: Arc<StatusStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            api,
            tasks,
            assets,
            prices,
            status,
            notifier,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Configured accounts, in configuration order.
    pub async fn accounts(&self) -> Vec<ExchangeAccount> {
        self.state.read().await.accounts.clone()
    }

    /// Raw balance sheets of every location.
    pub async fn balances(&self) -> ExchangeBalances {
        self.state.read().await.balances.clone()
    }

    /// Balance sheet of one location, if fetched.
    pub async fn sheet(&self, location: Location) -> Option<ExchangeBalanceSheet> {
        self.state.read().await.balances.get(&location).cloned()
    }

    /// Assets held on `location`, highest value first.
    pub async fn location_balances(&self, location: Location) -> Vec<AssetEntry> {
        let state = self.state.read().await;
        state
            .balances
            .get(&location)
            .map(|sheet| aggregation::sorted_assets(sheet, self.assets.as_ref()))
            .unwrap_or_default()
    }

    /// Total value per location, highest first.
    pub async fn exchange_totals(&self) -> Vec<LocationTotal> {
        let state = self.state.read().await;
        aggregation::location_totals(&state.balances, self.assets.as_ref())
    }

    /// Holdings per canonical asset across every location.
    pub async fn aggregated_balances(&self) -> BTreeMap<String, AssetBalance> {
        let state = self.state.read().await;
        aggregation::aggregate_by_asset(&state.balances, self.assets.as_ref())
    }

    /// Locations holding `asset`.
    pub async fn asset_breakdown(&self, asset: &str) -> Vec<LocationBreakdown> {
        let state = self.state.read().await;
        aggregation::asset_breakdown(&state.balances, asset, self.assets.as_ref())
    }

    /// Total per location label after applying `convert` to every value.
    pub async fn converted_totals<F>(&self, convert: F) -> BTreeMap<String, Decimal>
    where
        F: Fn(Decimal) -> Decimal,
    {
        let state = self.state.read().await;
        aggregation::converted_totals(&state.balances, self.assets.as_ref(), convert)
    }

    /// Loading status of the balances section.
    pub fn balances_status(&self) -> Status {
        self.status.status(Section::ExchangeBalances)
    }

    /// Suffix for the next account of `location`.
    pub async fn exchange_nonce(&self, location: Location) -> usize {
        aggregation::exchange_nonce(&self.state.read().await.accounts, location)
    }

    /// Default label for the next account of `location`.
    pub async fn suggested_account_name(&self, location: Location) -> String {
        aggregation::suggested_account_name(&self.state.read().await.accounts, location)
    }

    // ========================================================================
    // Account mutations
    // ========================================================================

    /// Replace the account list with the accounts configured on the backend.
    ///
    /// Balance sheets of locations that are no longer configured are dropped.
    pub async fn load_accounts(&self) -> Result<usize> {
        let accounts = self.api.list_exchanges().await?;
        let count = accounts.len();

        let mut state = self.state.write().await;
        state.accounts = accounts;
        let RegistryState { accounts, balances } = &mut *state;
        balances.retain(|location, _| accounts.iter().any(|a| a.location == *location));

        tracing::info!(count, "Loaded configured exchanges");
        Ok(count)
    }

    /// Append an account.
    ///
    /// Fails with [`AppError::DuplicateAccount`] if the (name, location) pair
    /// is already configured.
    pub async fn add_account(&self, account: ExchangeAccount) -> Result<()> {
        let mut state = self.state.write().await;
        if state.position(&account.name, account.location).is_some() {
            return Err(AppError::DuplicateAccount {
                name: account.name,
                location: account.location,
            });
        }

        tracing::debug!(name = %account.name, location = %account.location, "Adding exchange");
        state.accounts.push(account);
        Ok(())
    }

    /// Update the name and settings of `existing` in place.
    ///
    /// `existing` is matched by name and location and carries the new
    /// settings. A missing account is an [`AppError::InvariantViolation`];
    /// renaming onto another account of the same location is an
    /// [`AppError::DuplicateAccount`].
    pub async fn edit_account(
        &self,
        existing: &ExchangeAccount,
        new_name: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let index = state.position(&existing.name, existing.location).ok_or_else(|| {
            AppError::InvariantViolation {
                name: existing.name.clone(),
                location: existing.location,
            }
        })?;

        if let Some(new_name) = renamed(existing, new_name) {
            if state.position(new_name, existing.location).is_some() {
                return Err(AppError::DuplicateAccount {
                    name: new_name.to_string(),
                    location: existing.location,
                });
            }
        }

        let account = &mut state.accounts[index];
        if let Some(new_name) = new_name {
            account.name = new_name.to_string();
        }
        account.settings = existing.settings.clone();

        tracing::debug!(name = %account.name, location = %account.location, "Edited exchange");
        Ok(())
    }

    /// Remove an account on the backend, then locally.
    ///
    /// Returns whether the backend removed it. Recoverable failures are shown
    /// as a message and reported as `false`; an account missing from the local
    /// list after a successful removal is returned as an error.
    pub async fn remove_account(&self, account: &ExchangeAccount) -> Result<bool> {
        let result = self.try_remove_account(account).await;
        self.contain("Remove exchange", result)
    }

    async fn try_remove_account(&self, account: &ExchangeAccount) -> Result<bool> {
        if !self.api.remove_exchange(account).await? {
            return Ok(false);
        }

        let accounts_remain = {
            let mut state = self.state.write().await;
            let index = state.position(&account.name, account.location).ok_or_else(|| {
                AppError::InvariantViolation {
                    name: account.name.clone(),
                    location: account.location,
                }
            })?;

            state.accounts.remove(index);
            if !state.has_location(account.location) {
                state.balances.remove(&account.location);
            }
            !state.accounts.is_empty()
        };

        tracing::info!(name = %account.name, location = %account.location, "Removed exchange");

        if accounts_remain {
            self.fetch_all_configured_balances(false).await;
        }
        Ok(true)
    }

    /// Add (`is_edit == false`) or edit an account on the backend, then
    /// locally, and fetch its balances.
    pub async fn setup_account(&self, payload: ExchangeSetupPayload, is_edit: bool) -> Result<bool> {
        let result = self.try_setup_account(payload, is_edit).await;
        self.contain("Exchange setup", result)
    }

    async fn try_setup_account(&self, payload: ExchangeSetupPayload, is_edit: bool) -> Result<bool> {
        let location = payload.location;

        let target = if is_edit {
            payload.new_name.as_deref().filter(|new_name| *new_name != payload.name)
        } else {
            Some(payload.name.as_str())
        };
        if let Some(name) = target {
            if self.state.read().await.position(name, location).is_some() {
                return Err(AppError::DuplicateAccount { name: name.to_string(), location });
            }
        }

        if !self.api.setup_exchange(&payload, is_edit).await? {
            return Ok(false);
        }

        let account = ExchangeAccount {
            name: payload.name.clone(),
            location,
            settings: payload.settings.clone(),
        };

        if is_edit {
            self.edit_account(&account, payload.new_name.as_deref()).await?;
        } else {
            self.add_account(account).await?;
        }

        self.fetch_balances(location, false).await;
        Ok(true)
    }

    // ========================================================================
    // Balance sync
    // ========================================================================

    /// Fetch the balances of `location` and replace its sheet.
    ///
    /// Does nothing while a fetch for the same location is running. Failures
    /// raise a notification; the section status then reflects the remaining
    /// fetches and the sheets already loaded.
    pub async fn fetch_balances(&self, location: Location, ignore_cache: bool) -> FetchOutcome {
        let title = format!("Fetching {} balances", location.label());
        let meta = TaskMeta::for_location(title, location);
        let Some(pending) = self.tasks.reserve(TaskKind::QueryExchangeBalances, meta) else {
            tracing::debug!(location = %location, "Balance fetch already in flight");
            return FetchOutcome::Skipped;
        };

        let section = Section::ExchangeBalances;
        self.status.set_status(section, self.status.loading_status(section));

        match self.query_balances(pending, location, ignore_cache).await {
            Ok(sheet) => {
                let mut state = self.state.write().await;
                if !state.has_location(location) {
                    tracing::debug!(location = %location, "Discarding balances of removed exchange");
                    drop(state);
                    self.settle_balances_status().await;
                    return FetchOutcome::Skipped;
                }

                tracing::info!(
                    location = %location,
                    assets = sheet.len(),
                    "Exchange balances loaded"
                );
                state.balances.insert(location, sheet);
                drop(state);

                self.status.set_status(section, Status::Loaded);
                FetchOutcome::Loaded
            }
            Err(e) => {
                self.notifier.notify(Notification::new(
                    format!("{} balances", location.label()),
                    format!("Failed to fetch the balances of {}: {}", location.label(), e),
                ));
                self.settle_balances_status().await;
                FetchOutcome::Failed
            }
        }
    }

    /// Section status after a fetch that loaded nothing. Must run once the
    /// fetch's own task slot is released.
    async fn settle_balances_status(&self) {
        let section = Section::ExchangeBalances;
        if self.tasks.is_task_running(TaskKind::QueryExchangeBalances, None) {
            if !self.status.is_loading(section) {
                self.status.set_status(section, Status::Refreshing);
            }
        } else if self.state.read().await.balances.is_empty() {
            self.status.reset_status(section);
        } else {
            self.status.set_status(section, Status::Loaded);
        }
    }

    async fn query_balances(
        &self,
        pending: PendingTask,
        location: Location,
        ignore_cache: bool,
    ) -> Result<ExchangeBalanceSheet> {
        let task_id = self.api.query_exchange_balances(location, ignore_cache).await?;
        let payload = self.tasks.await_task(pending, task_id).await?;

        let raw: HashMap<String, RawAssetBalance> =
            serde_json::from_value(payload).map_err(|e| {
                AppError::Validation(format!("Unexpected {} balance payload: {}", location, e))
            })?;

        Ok(aggregation::merge_sheet(raw, self.assets.as_ref(), self.prices.as_ref()))
    }

    /// Fetch the balances of every configured account, one after another.
    pub async fn fetch_all_configured_balances(&self, force_refresh: bool) {
        for account in self.accounts().await {
            self.fetch_balances(account.location, force_refresh).await;
        }
    }

    /// Re-value every balance with the new `prices`.
    pub async fn apply_price_update(&self, prices: &HashMap<String, Decimal>) {
        let mut state = self.state.write().await;
        state.balances = aggregation::reprice(&state.balances, prices);
    }

    /// Turn recoverable errors into a user message and a `false` result.
    pub(super) fn contain(&self, title: &str, result: Result<bool>) -> Result<bool> {
        match result {
            Ok(success) => Ok(success),
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "{} left the exchange list out of sync", title);
                Err(e)
            }
            Err(e) => {
                self.notifier.set_message(Message::error(title, e.to_string()));
                Ok(false)
            }
        }
    }
}

/// New name of an edit that actually renames `existing`.
fn renamed<'a>(existing: &ExchangeAccount, new_name: Option<&'a str>) -> Option<&'a str> {
    new_name.filter(|new_name| *new_name != existing.name)
}
