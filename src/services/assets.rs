//! Asset identity lookups: associations and the ignore list.

use std::{
    collections::{HashMap, HashSet},
    sync::{PoisonError, RwLock},
};

/// Resolves asset identifiers before balances are merged or aggregated.
pub trait AssetResolver: Send + Sync {
    /// Canonical identifier of `asset`; unknown assets map to themselves.
    fn resolve_canonical(&self, asset: &str) -> String;

    /// Whether `asset` is excluded from every aggregate.
    fn is_ignored(&self, asset: &str) -> bool;
}

#[derive(Debug, Default)]
struct AssetState {
    associations: HashMap<String, String>,
    ignored: HashSet<String>,
}

/// In-memory asset registry.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    state: RwLock<AssetState>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry ignoring every asset in `ignored`.
    pub fn with_ignored<I, S>(ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        for asset in ignored {
            registry.ignore(asset);
        }
        registry
    }

    /// Treat `asset` as `canonical` from now on.
    pub fn associate(&self, asset: impl Into<String>, canonical: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.associations.insert(asset.into(), canonical.into());
    }

    pub fn ignore(&self, asset: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.ignored.insert(asset.into());
    }

    pub fn unignore(&self, asset: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.ignored.remove(asset);
    }
}

impl AssetResolver for AssetRegistry {
    fn resolve_canonical(&self, asset: &str) -> String {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.associations.get(asset).cloned().unwrap_or_else(|| asset.to_string())
    }

    fn is_ignored(&self, asset: &str) -> bool {
        let canonical = self.resolve_canonical(asset);
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.ignored.contains(asset) || state.ignored.contains(&canonical)
    }
}
