//! Backend task types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Location;

/// Identifier of a backend task.
pub type TaskId = u64;

/// Kind of work a backend task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    QueryExchangeBalances,
    QueryExchangeSavings,
    TransactionsSync,
}

/// Metadata recorded alongside a running task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl TaskMeta {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), location: None }
    }

    pub fn for_location(title: impl Into<String>, location: Location) -> Self {
        Self { title: title.into(), location: Some(location) }
    }
}

/// Terminal payload of a finished task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskOutcome {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Task state reported by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    Completed {
        #[serde(default)]
        outcome: TaskOutcome,
    },
    NotFound,
}

/// Response of a request started with `async_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct AsyncTaskResponse {
    pub task_id: TaskId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_pending() {
        let status: TaskStatus = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert!(matches!(status, TaskStatus::Pending));
    }

    #[test]
    fn test_task_status_not_found() {
        let status: TaskStatus = serde_json::from_str(r#"{"status":"not-found"}"#).unwrap();
        assert!(matches!(status, TaskStatus::NotFound));
    }

    #[test]
    fn test_task_status_completed_with_result() {
        let json = r#"{"status":"completed","outcome":{"result":{"BTC":{"amount":"1","usd_value":"2"}},"message":""}}"#;
        let status: TaskStatus = serde_json::from_str(json).unwrap();

        match status {
            TaskStatus::Completed { outcome } => {
                assert!(outcome.result.is_some());
                assert_eq!(outcome.message.as_deref(), Some(""));
            }
            _ => panic!("Expected completed status"),
        }
    }

    #[test]
    fn test_task_status_completed_with_error() {
        let json = r#"{"status":"completed","outcome":{"result":null,"message":"Invalid API key"}}"#;
        let status: TaskStatus = serde_json::from_str(json).unwrap();

        match status {
            TaskStatus::Completed { outcome } => {
                assert!(outcome.result.is_none());
                assert_eq!(outcome.message.as_deref(), Some("Invalid API key"));
            }
            _ => panic!("Expected completed status"),
        }
    }

    #[test]
    fn test_task_meta_serialization() {
        let meta = TaskMeta::for_location("Fetching kraken balances", Location::Kraken);
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["location"], "kraken");

        let meta = TaskMeta::new("Syncing transactions");
        let value = serde_json::to_value(&meta).unwrap();
        assert!(value.get("location").is_none());
    }
}
