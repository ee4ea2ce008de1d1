//! Savings-interest sync for Binance-family exchanges.

use std::collections::BTreeSet;
use tokio::task::JoinSet;

use super::{
    exchange_balances::ExchangeBalanceRegistry,
    notifications::Notification,
    status::{Section, Status},
};
use crate::{
    error::{AppError, Result},
    types::{Location, SavingsCollection, SavingsFilter, TaskKind, TaskMeta},
};

impl ExchangeBalanceRegistry {
    /// Loading status of the savings-interest section.
    pub fn savings_status(&self) -> Status {
        self.status.status(Section::ExchangeSavings)
    }

    /// One page of cached savings-interest records. Never starts a task.
    pub async fn fetch_savings_page(&self, mut filter: SavingsFilter) -> Result<SavingsCollection> {
        if !filter.location.is_binance_family() {
            return Err(AppError::Validation(format!(
                "{} does not provide savings interest",
                filter.location.label()
            )));
        }

        filter.only_cache = true;
        let response = self.api.query_savings_cache(&filter).await?;
        Ok(response.into())
    }

    /// Refresh the savings-interest history of `location` from the exchange.
    ///
    /// Returns whether the refresh succeeded; failures raise a notification.
    pub async fn sync_savings_for_location(&self, location: Location) -> bool {
        let meta = TaskMeta::for_location(
            format!("Refreshing {} savings interest", location.label()),
            location,
        );
        let Some(pending) = self.tasks.reserve(TaskKind::QueryExchangeSavings, meta) else {
            tracing::debug!(location = %location, "Savings refresh already in flight");
            return true;
        };

        let filter = SavingsFilter::refresh_all(location);
        let result = match self.api.start_savings_refresh(&filter).await {
            Ok(task_id) => self.tasks.await_task(pending, task_id).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(location = %location, "Savings interest refreshed");
                true
            }
            Err(e) => {
                self.notifier.notify(Notification::new(
                    format!("{} savings interest", location.label()),
                    format!("Failed to refresh the savings interest of {}: {}", location.label(), e),
                ));
                false
            }
        }
    }

    /// Move the savings section from `Refreshing` to `Loaded` once neither a
    /// savings refresh nor a transactions sync is running.
    ///
    /// Call when a transactions sync finishes; `refresh_all_savings` also
    /// runs it before deciding whether to refresh.
    pub fn settle_savings_status(&self) {
        let section = Section::ExchangeSavings;
        let idle = !self.tasks.is_task_running(TaskKind::QueryExchangeSavings, None)
            && !self.tasks.is_task_running(TaskKind::TransactionsSync, None);
        if idle && self.status.status(section) == Status::Refreshing {
            self.status.set_status(section, Status::Loaded);
        }
    }

    /// Refresh savings interest of every configured Binance-family location
    /// concurrently.
    ///
    /// Automatic refreshes only run on first load.
    pub async fn refresh_all_savings(&self, user_initiated: bool) {
        let section = Section::ExchangeSavings;
        self.settle_savings_status();
        if self.status.fetch_disabled(section, user_initiated) {
            tracing::debug!(user_initiated, "Savings refresh disabled");
            return;
        }

        // Held until every sync has joined.
        let meta = TaskMeta::new("Refreshing savings interest");
        let Some(_fan_out) = self.tasks.reserve(TaskKind::QueryExchangeSavings, meta) else {
            return;
        };

        let previous = self.status.status(section);
        self.status.set_status(section, self.status.loading_status(section));

        let locations: BTreeSet<Location> = self
            .accounts()
            .await
            .into_iter()
            .map(|account| account.location)
            .filter(Location::is_binance_family)
            .collect();

        let mut syncs = JoinSet::new();
        for location in locations {
            let registry = self.clone();
            syncs.spawn(async move { registry.sync_savings_for_location(location).await });
        }

        let mut join_failed = false;
        while let Some(joined) = syncs.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Savings refresh task aborted");
                join_failed = true;
            }
        }

        if join_failed {
            self.status.set_status(section, previous);
            return;
        }

        let status = if self.tasks.is_task_running(TaskKind::TransactionsSync, None) {
            Status::Refreshing
        } else {
            Status::Loaded
        };
        self.status.set_status(section, status);
    }
}
