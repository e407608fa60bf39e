//! Site registry: the routing map from site name to its validation URL,
//! credential store, and login driver.
//!
//! Registration is a process-lifetime operation; the sweeps take a
//! copy-on-read snapshot, so an unregistration mid-sweep never tears a
//! binding out from under running work.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::cookie::login::LoginDriver;
use crate::cookie::store::CredentialStore;

/// Everything the scheduler needs to service one site.
#[derive(Clone)]
pub struct SiteBinding {
    /// URL a stored jar is replayed against to check liveness.
    pub validation_url: String,
    pub store: Arc<dyn CredentialStore>,
    pub login: Arc<dyn LoginDriver>,
}

#[derive(Default)]
pub struct SiteRegistry {
    sites: RwLock<HashMap<String, SiteBinding>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        validation_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        login: Arc<dyn LoginDriver>,
    ) {
        let binding = SiteBinding {
            validation_url: validation_url.into(),
            store,
            login,
        };
        self.write().insert(name.into(), binding);
    }

    /// Remove the whole binding in one step.
    pub fn unregister(&self, name: &str) {
        self.write().remove(name);
    }

    pub fn get(&self, name: &str) -> Option<SiteBinding> {
        self.read().get(name).cloned()
    }

    /// Stable copy of the current bindings for one sweep.
    pub fn snapshot(&self) -> Vec<(String, SiteBinding)> {
        self.read()
            .iter()
            .map(|(name, binding)| (name.clone(), binding.clone()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SiteBinding>> {
        self.sites.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SiteBinding>> {
        self.sites.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
