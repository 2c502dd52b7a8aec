//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{ControllerConfig, SharedControllerConfig};
use crate::constants::{DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::Installation;
use crate::observability;
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for the Installation CRD across all namespaces
    pub installations: Api<Installation>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: SharedControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the default filter. `log_format` of
/// `json` selects structured output, anything else plain text.
pub fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "credential_bridge_controller=info".into());

    let result = if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if let Err(e) = result {
        warn!("Tracing subscriber init returned error (may already be initialized): {}", e);
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    let controller_config: SharedControllerConfig = Arc::new(ControllerConfig::from_env());
    init_tracing(&controller_config.log_format);

    info!("Starting Credential Bridge Controller v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: namespace={}, default_tier={}, reconcile_interval={}s, not_ready_requeue={}s, reconcile_timeout={}s",
        controller_config.controller_namespace,
        controller_config.default_tier,
        controller_config.reconcile_interval_secs,
        controller_config.not_ready_requeue_secs,
        controller_config.reconcile_timeout_secs
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = server_state.clone();
    let server_port = controller_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Readiness probes must pass before reconciliation starts
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    // Installations may be deployed in any namespace
    let installations: Api<Installation> = Api::all(client.clone());

    let reconciler = Arc::new(Reconciler::new(client.clone(), controller_config.clone()));

    log_startup_summary(&installations).await?;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        installations,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval = Duration::from_millis(DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log existing Installations grouped by namespace
///
/// Also proves the CRD is installed and queryable before the watch starts.
/// The controller's initial list reconciles every one of them.
async fn log_startup_summary(installations: &Api<Installation>) -> Result<()> {
    let list = installations
        .list(&ListParams::default())
        .await
        .context("Installation CRD is not queryable; is it installed?")?;

    if list.items.is_empty() {
        info!("No existing Installation resources found, watch will pick up new resources");
        return Ok(());
    }

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        by_namespace
            .entry(item.namespace().unwrap_or_default())
            .or_default()
            .push(item.name_any());
    }

    info!("Credential Bridge Controller - Startup Resource Summary");
    info!("Total Installations: {}", list.items.len());
    for (namespace, mut names) in by_namespace {
        names.sort();
        info!("Namespace: {} ({}): {}", namespace, names.len(), names.join(", "));
    }

    Ok(())
}
