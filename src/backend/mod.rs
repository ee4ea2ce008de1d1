//! Portfolio backend interaction module.
//!
//! Defines the contracts the registry consumes from the backend and the
//! HTTP client implementing them.

pub mod client;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{
        ExchangeAccount, ExchangeSetupPayload, Location, SavingsCollectionResponse, SavingsFilter,
        TaskId, TaskStatus,
    },
};

pub use client::BackendClient;

/// Exchange endpoints of the backend.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Exchanges configured on the backend.
    async fn list_exchanges(&self) -> Result<Vec<ExchangeAccount>>;

    /// Start a balance query for `location`, returning the task to await.
    async fn query_exchange_balances(&self, location: Location, ignore_cache: bool)
        -> Result<TaskId>;

    /// Remove an exchange account. Returns whether the backend removed it.
    async fn remove_exchange(&self, account: &ExchangeAccount) -> Result<bool>;

    /// Add (`edit == false`) or edit an exchange account.
    async fn setup_exchange(&self, payload: &ExchangeSetupPayload, edit: bool) -> Result<bool>;

    /// Query cached savings-interest records without starting a task.
    async fn query_savings_cache(&self, filter: &SavingsFilter)
        -> Result<SavingsCollectionResponse>;

    /// Start a live savings-interest refresh, returning the task to await.
    async fn start_savings_refresh(&self, filter: &SavingsFilter) -> Result<TaskId>;
}

/// Task status endpoint of the backend.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn query_task(&self, task_id: TaskId) -> Result<TaskStatus>;
}
