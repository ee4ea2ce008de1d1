//! Loading status per data section.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

/// Data section whose loading state is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ExchangeBalances,
    ExchangeSavings,
}

/// Loading state of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Never loaded.
    #[default]
    None,
    /// First load in progress.
    Loading,
    /// Reload of already loaded data in progress.
    Refreshing,
    Loaded,
}

impl Status {
    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading | Status::Refreshing)
    }
}

/// Tracks the loading status of every section.
///
/// Only drives progress reporting and the throttling of automatic refreshes.
#[derive(Debug, Default)]
pub struct StatusStore {
    statuses: Mutex<HashMap<Section, Status>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, section: Section) -> Status {
        let statuses = self.statuses.lock().unwrap_or_else(PoisonError::into_inner);
        statuses.get(&section).copied().unwrap_or_default()
    }

    pub fn set_status(&self, section: Section, status: Status) {
        tracing::debug!(section = ?section, status = ?status, "Section status changed");
        let mut statuses = self.statuses.lock().unwrap_or_else(PoisonError::into_inner);
        statuses.insert(section, status);
    }

    pub fn reset_status(&self, section: Section) {
        self.set_status(section, Status::None);
    }

    pub fn is_first_load(&self, section: Section) -> bool {
        self.status(section) == Status::None
    }

    pub fn is_loading(&self, section: Section) -> bool {
        self.status(section).is_loading()
    }

    /// Status to show when a load of `section` starts.
    pub fn loading_status(&self, section: Section) -> Status {
        if self.is_first_load(section) {
            Status::Loading
        } else {
            Status::Refreshing
        }
    }

    /// Whether a fetch of `section` must be skipped.
    ///
    /// Automatic fetches only run on first load; user-initiated ones run
    /// unless a load is already in progress.
    pub fn fetch_disabled(&self, section: Section, user_initiated: bool) -> bool {
        !(self.is_first_load(section) || user_initiated) || self.is_loading(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_is_none() {
        let store = StatusStore::new();
        assert_eq!(store.status(Section::ExchangeBalances), Status::None);
        assert!(store.is_first_load(Section::ExchangeBalances));
        assert_eq!(store.loading_status(Section::ExchangeBalances), Status::Loading);
    }

    #[test]
    fn test_loading_status_after_load() {
        let store = StatusStore::new();
        store.set_status(Section::ExchangeBalances, Status::Loaded);
        assert_eq!(store.loading_status(Section::ExchangeBalances), Status::Refreshing);
        assert_eq!(store.status(Section::ExchangeSavings), Status::None);
    }

    #[test]
    fn test_fetch_disabled_rules() {
        let store = StatusStore::new();
        let section = Section::ExchangeSavings;

        // First load always runs
        assert!(!store.fetch_disabled(section, false));
        assert!(!store.fetch_disabled(section, true));

        // Loaded: only user-initiated refreshes run
        store.set_status(section, Status::Loaded);
        assert!(store.fetch_disabled(section, false));
        assert!(!store.fetch_disabled(section, true));

        // In progress: nothing runs
        store.set_status(section, Status::Refreshing);
        assert!(store.fetch_disabled(section, true));
        assert!(store.fetch_disabled(section, false));
    }

    #[test]
    fn test_reset_status() {
        let store = StatusStore::new();
        store.set_status(Section::ExchangeBalances, Status::Loaded);
        store.reset_status(Section::ExchangeBalances);
        assert!(store.is_first_load(Section::ExchangeBalances));
    }
}
