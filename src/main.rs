//! # Credential Bridge Controller
//!
//! A Kubernetes controller that provisions a Postgres instance for each
//! Keycloak `Installation` and publishes the instance's credentials in the
//! secret layout the Keycloak operator reads.
//!
//! ## Overview
//!
//! For every `Installation` the controller:
//!
//! 1. **Requests a Postgres instance** - create-or-update of a `Postgres` resource, tagged with its owner
//! 2. **Waits for provisioning** - requeues while the instance is not complete
//! 3. **Reads the instance credentials** - from the secret the provisioning backend reports
//! 4. **Renames the fields** - into `DATABASE`, `EXTERNAL_PORT`, `EXTERNAL_ADDRESS`, `PASSWORD`, `USERNAME`, `SUPERUSER`
//! 5. **Merges them into the consumer secret** - leaving keys written by others untouched
//!
//! ## Features
//!
//! - **Multi-namespace**: Watches `Installation` resources across all namespaces
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

use anyhow::Result;
use credential_bridge_controller::crd::Postgres;
use credential_bridge_controller::runtime::{initialization, watch_loop};
use kube::Api;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialization::initialize().await?;

    let postgres: Api<Postgres> = Api::all(init.client.clone());

    watch_loop::run_watch_loop(
        init.installations,
        postgres,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
