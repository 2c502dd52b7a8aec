//! # Types
//!
//! Core types for the reconciler.

use crate::config::SharedControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::credentials::{CredentialError, CredentialReconciler};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Invalid Installation: {0}")]
    InvalidInstallation(String),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] anyhow::Error),
}

impl ReconcilerError {
    /// Label used for the error metric and the Ready condition reason
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::InvalidInstallation(_) => "InvalidInstallation",
            ReconcilerError::Credentials(e) => e.reason(),
            ReconcilerError::ReconciliationFailed(_) => "ReconciliationFailed",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone, Default)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

/// Per-resource backoff bookkeeping, keyed by `namespace/name`
#[derive(Debug, Clone, Default)]
pub struct BackoffTracker {
    states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl BackoffTracker {
    #[must_use]
    pub fn key(namespace: &str, name: &str) -> String {
        format!("{namespace}/{name}")
    }

    /// Record a failure and return the delay before the next attempt with the error count
    ///
    /// Falls back to `fallback` if the state lock is poisoned.
    pub fn record_error(&self, key: &str, fallback: Duration) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_default();
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (fallback, 0)
            }
        }
    }

    /// Forget failures for `key` after a pass that did not fail
    pub fn reset(&self, key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(key);
        }
    }

    /// Drop state for every key `keep` rejects, returning how many were dropped
    pub fn retain(&self, keep: impl Fn(&str) -> bool) -> usize {
        match self.states.lock() {
            Ok(mut states) => {
                let before = states.len();
                states.retain(|key, _| keep(key));
                before - states.len()
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, skipping prune", e);
                0
            }
        }
    }

    #[must_use]
    pub fn tracked(&self) -> usize {
        self.states.lock().map(|states| states.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn error_count(&self, key: &str) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(key).map(|s| s.error_count))
            .unwrap_or(0)
    }
}

#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub config: SharedControllerConfig,
    pub credentials: CredentialReconciler,
    // Tracked here rather than in reconcile() so the error policy never blocks the watch
    pub backoff: BackoffTracker,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Reconciler backed by the cluster for both Postgres and Secret access
    #[must_use]
    pub fn new(client: Client, config: SharedControllerConfig) -> Self {
        let credentials = CredentialReconciler::for_keycloak(&client);
        Self::with_credentials(client, config, credentials)
    }

    #[must_use]
    pub fn with_credentials(
        client: Client,
        config: SharedControllerConfig,
        credentials: CredentialReconciler,
    ) -> Self {
        Self {
            client,
            config,
            credentials,
            backoff: BackoffTracker::default(),
        }
    }
}
