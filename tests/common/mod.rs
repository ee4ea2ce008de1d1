//! Common utilities for integration tests.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};

use exchange_balances_mcp::{
    backend::{ExchangeApi, TaskBackend},
    services::{
        AssetRegistry, ExchangeBalanceRegistry, Notice, NotificationLog, PriceCache, StatusStore,
        TaskRegistry,
    },
    types::{
        ExchangeAccount, ExchangeSetupPayload, Location, SavingsCollectionResponse,
        SavingsFilter, TaskId, TaskOutcome, TaskStatus,
    },
    AppError, Config, ExchangeBalancesServer, Result,
};

/// Backend interaction recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListExchanges,
    QueryBalances { location: Location, ignore_cache: bool },
    TaskFinished { location: Option<Location> },
    Remove { name: String, location: Location },
    Setup { name: String, location: Location, edit: bool },
    SavingsCache { location: Location, only_cache: bool },
    SavingsRefresh { location: Location, only_cache: bool },
}

struct TaskPlan {
    location: Option<Location>,
    result: std::result::Result<Value, String>,
    pending_polls: usize,
}

/// In-memory backend scripted per test.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    exchanges: Mutex<Vec<ExchangeAccount>>,
    balances: Mutex<HashMap<Location, Value>>,
    unreachable: Mutex<HashSet<Location>>,
    task_failures: Mutex<HashMap<Location, String>>,
    remove_result: Mutex<Option<std::result::Result<bool, String>>>,
    setup_result: Mutex<Option<std::result::Result<bool, String>>>,
    savings_cache: Mutex<Option<Value>>,
    pending_polls: AtomicUsize,
    next_task: AtomicU64,
    tasks: Mutex<HashMap<TaskId, TaskPlan>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Locations and cache flags of every balance query, in order.
    pub fn balance_queries(&self) -> Vec<(Location, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::QueryBalances { location, ignore_cache } => Some((location, ignore_cache)),
                _ => None,
            })
            .collect()
    }

    pub fn set_exchanges(&self, exchanges: Vec<ExchangeAccount>) {
        *self.exchanges.lock().unwrap() = exchanges;
    }

    /// Payload the balance task of `location` completes with.
    pub fn set_balances(&self, location: Location, payload: Value) {
        self.balances.lock().unwrap().insert(location, payload);
    }

    /// Make balance queries of `location` fail before a task is started.
    pub fn make_unreachable(&self, location: Location) {
        self.unreachable.lock().unwrap().insert(location);
    }

    /// Make tasks of `location` complete without a result.
    pub fn fail_tasks(&self, location: Location, message: &str) {
        self.task_failures.lock().unwrap().insert(location, message.to_string());
    }

    pub fn set_remove_result(&self, result: std::result::Result<bool, String>) {
        *self.remove_result.lock().unwrap() = Some(result);
    }

    pub fn set_setup_result(&self, result: std::result::Result<bool, String>) {
        *self.setup_result.lock().unwrap() = Some(result);
    }

    pub fn set_savings_cache(&self, response: Value) {
        *self.savings_cache.lock().unwrap() = Some(response);
    }

    /// Number of `pending` answers before each task completes.
    pub fn set_pending_polls(&self, polls: usize) {
        self.pending_polls.store(polls, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn start_task(&self, location: Location, result: Value) -> TaskId {
        let task_id = self.next_task.fetch_add(1, Ordering::SeqCst) + 1;
        let result = match self.task_failures.lock().unwrap().get(&location) {
            Some(message) => Err(message.clone()),
            None => Ok(result),
        };
        let plan = TaskPlan {
            location: Some(location),
            result,
            pending_polls: self.pending_polls.load(Ordering::SeqCst),
        };
        self.tasks.lock().unwrap().insert(task_id, plan);
        task_id
    }
}

#[async_trait]
impl ExchangeApi for MockBackend {
    async fn list_exchanges(&self) -> Result<Vec<ExchangeAccount>> {
        self.record(Call::ListExchanges);
        Ok(self.exchanges.lock().unwrap().clone())
    }

    async fn query_exchange_balances(
        &self,
        location: Location,
        ignore_cache: bool,
    ) -> Result<TaskId> {
        self.record(Call::QueryBalances { location, ignore_cache });

        if self.unreachable.lock().unwrap().contains(&location) {
            return Err(AppError::Transport("connection refused".to_string()));
        }

        let payload = self.balances.lock().unwrap().get(&location).cloned().unwrap_or(json!({}));
        Ok(self.start_task(location, payload))
    }

    async fn remove_exchange(&self, account: &ExchangeAccount) -> Result<bool> {
        self.record(Call::Remove { name: account.name.clone(), location: account.location });
        match self.remove_result.lock().unwrap().clone() {
            Some(Ok(removed)) => Ok(removed),
            Some(Err(message)) => Err(AppError::Api(message)),
            None => Ok(true),
        }
    }

    async fn setup_exchange(&self, payload: &ExchangeSetupPayload, edit: bool) -> Result<bool> {
        self.record(Call::Setup { name: payload.name.clone(), location: payload.location, edit });
        match self.setup_result.lock().unwrap().clone() {
            Some(Ok(success)) => Ok(success),
            Some(Err(message)) => Err(AppError::Api(message)),
            None => Ok(true),
        }
    }

    async fn query_savings_cache(
        &self,
        filter: &SavingsFilter,
    ) -> Result<SavingsCollectionResponse> {
        self.record(Call::SavingsCache { location: filter.location, only_cache: filter.only_cache });
        let response = self
            .savings_cache
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Api("No savings cached".to_string()))?;
        Ok(serde_json::from_value(response)?)
    }

    async fn start_savings_refresh(&self, filter: &SavingsFilter) -> Result<TaskId> {
        self.record(Call::SavingsRefresh {
            location: filter.location,
            only_cache: filter.only_cache,
        });
        Ok(self.start_task(filter.location, json!(true)))
    }
}

#[async_trait]
impl TaskBackend for MockBackend {
    async fn query_task(&self, task_id: TaskId) -> Result<TaskStatus> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(plan) = tasks.get_mut(&task_id) else {
            return Ok(TaskStatus::NotFound);
        };

        if plan.pending_polls > 0 {
            plan.pending_polls -= 1;
            return Ok(TaskStatus::Pending);
        }

        let plan = tasks.remove(&task_id).expect("plan exists");
        drop(tasks);
        self.record(Call::TaskFinished { location: plan.location });

        let outcome = match plan.result {
            Ok(result) => TaskOutcome { result: Some(result), message: None },
            Err(message) => TaskOutcome { result: None, message: Some(message) },
        };
        Ok(TaskStatus::Completed { outcome })
    }
}

/// Registry wired to a [`MockBackend`] with handles to every collaborator.
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub registry: ExchangeBalanceRegistry,
    pub tasks: Arc<TaskRegistry>,
    pub assets: Arc<AssetRegistry>,
    pub prices: Arc<PriceCache>,
    pub status: Arc<StatusStore>,
    pub notifications: Arc<NotificationLog>,
}

impl Harness {
    pub fn new() -> Self {
        let backend = MockBackend::new();
        let tasks = Arc::new(TaskRegistry::new(backend.clone(), Duration::from_millis(1)));
        let assets = Arc::new(AssetRegistry::new());
        let prices = Arc::new(PriceCache::new());
        let status = Arc::new(StatusStore::new());
        let notifications = Arc::new(NotificationLog::default());

        let registry = ExchangeBalanceRegistry::new(
            backend.clone(),
            tasks.clone(),
            assets.clone(),
            prices.clone(),
            status.clone(),
            notifications.clone(),
        );

        Self { backend, registry, tasks, assets, prices, status, notifications }
    }

    /// Server exposing this harness' registry.
    pub fn server(&self) -> ExchangeBalancesServer {
        ExchangeBalancesServer::from_parts(
            self.registry.clone(),
            self.prices.clone(),
            self.notifications.clone(),
        )
    }

    /// Add accounts directly, bypassing the backend.
    pub async fn with_accounts(self, accounts: &[(&str, Location)]) -> Self {
        for (name, location) in accounts {
            self.registry.add_account(ExchangeAccount::new(*name, *location)).await.unwrap();
        }
        self
    }

    /// Titles and texts of every notification raised so far.
    pub fn notification_texts(&self) -> Vec<String> {
        self.notifications
            .recent()
            .into_iter()
            .map(|notice| match notice {
                Notice::Notification(n) => format!("{}: {}", n.title, n.message),
                Notice::Message(m) => format!("{}: {}", m.title, m.description),
            })
            .collect()
    }
}

/// Balance task payload with one asset.
pub fn single_asset(asset: &str, amount: &str, value: &str) -> Value {
    json!({ asset: { "amount": amount, "usd_value": value } })
}

/// Helper to create a server against a live backend from environment variables.
pub fn create_test_server() -> Option<ExchangeBalancesServer> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let backend_url = std::env::var("BACKEND_URL").ok()?;
    if backend_url.is_empty() {
        return None;
    }

    let config = Config { backend_url, log_level: "warn".to_string(), ..Config::default() };

    ExchangeBalancesServer::new(config).ok()
}

/// Skip test if no live backend is configured.
#[macro_export]
macro_rules! skip_if_no_backend {
    () => {
        match common::create_test_server() {
            Some(server) => server,
            None => {
                eprintln!("Skipping test: BACKEND_URL not set");
                return;
            }
        }
    };
}
