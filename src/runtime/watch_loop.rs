//! # Watch Loop
//!
//! Controller watch loop that monitors Installation resources and triggers
//! reconciliation when changes are detected.
//!
//! Postgres instances are watched too. Each one carries its owner's
//! annotations, so a phase change on the instance wakes the owning
//! Installation without waiting for the not-ready requeue.

use crate::config::SharedControllerConfig;
use crate::constants::{OWNER_NAMESPACE_ANNOTATION, OWNER_NAME_ANNOTATION};
use crate::controller::reconciler::{reconcile, BackoffTracker, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{Installation, Postgres};
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::{watcher, Controller};
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Installation recorded in the owner annotations of `meta`, if any
#[must_use]
pub fn owning_installation(meta: &ObjectMeta) -> Option<ObjectRef<Installation>> {
    let annotations = meta.annotations.as_ref()?;
    let name = annotations.get(OWNER_NAME_ANNOTATION)?;
    let namespace = annotations.get(OWNER_NAMESPACE_ANNOTATION)?;
    Some(ObjectRef::new(name).within(namespace))
}

/// Backoff keys of every Installation currently in `installations`
#[must_use]
pub fn live_backoff_keys(installations: &[Arc<Installation>]) -> HashSet<String> {
    installations
        .iter()
        .map(|inst| BackoffTracker::key(&inst.namespace().unwrap_or_default(), &inst.name_any()))
        .collect()
}

// Deleted Installations are never reconciled again, so their backoff state is
// dropped here against the controller's cache.
async fn prune_backoff(store: Store<Installation>, tracker: BackoffTracker, every: Duration) {
    if store.wait_until_ready().await.is_err() {
        return;
    }
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let live = live_backoff_keys(&store.state());
        let dropped = tracker.retain(|key| live.contains(key));
        if dropped > 0 {
            debug!("Dropped backoff state for {} deleted Installation(s)", dropped);
        }
    }
}

/// Run the controller watch loop
///
/// Restarts the controller stream when it ends and exits once a shutdown
/// signal marks the server as not ready.
pub async fn run_watch_loop(
    installations: Api<Installation>,
    postgres: Api<Postgres>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    controller_config: SharedControllerConfig,
) -> Result<(), anyhow::Error> {
    let backoff_duration_ms = Arc::new(AtomicU64::new(controller_config.backoff_start_ms));

    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let backoff = backoff_duration_ms.clone();
        let config = controller_config.clone();
        let watch_span = tracing::info_span!("controller.watch", operation = "watch_loop");

        info!("Starting controller watch loop...");
        let controller = Controller::new(
            installations.clone(),
            watcher::Config::default().any_semantic(),
        )
        .watches(postgres.clone(), watcher::Config::default(), |pg: Postgres| {
            owning_installation(&pg.metadata)
        });
        let pruner = tokio::spawn(prune_backoff(
            controller.store(),
            reconciler.backoff.clone(),
            controller_config.reconcile_interval(),
        ));

        let controller_future = controller
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, reconciler.clone())
            .filter_map(move |event| {
                let backoff = backoff.clone();
                let config = config.clone();
                async move {
                    match &event {
                        Ok((obj, _action)) => {
                            backoff.store(config.backoff_start_ms, Ordering::Relaxed);
                            debug!("Reconciled {}", obj);
                            Some(event)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &error_string,
                                &backoff,
                                config.backoff_max_ms,
                                config.watch_restart_delay_duration(),
                            )
                            .await
                            .map(|()| event)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()));

        tracing::Instrument::instrument(controller_future, watch_span).await;
        pruner.abort();

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            controller_config.watch_restart_delay_after_end_secs
        );
        tokio::time::sleep(controller_config.watch_restart_delay_after_end_duration()).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CredentialsSpec, InstallationSpec};
    use std::collections::BTreeMap;

    #[test]
    fn test_owner_annotations_map_to_installation() {
        let meta = ObjectMeta {
            annotations: Some(BTreeMap::from([
                (OWNER_NAME_ANNOTATION.to_string(), "rhsso".to_string()),
                (OWNER_NAMESPACE_ANNOTATION.to_string(), "rhsso-operator".to_string()),
            ])),
            ..ObjectMeta::default()
        };

        let obj_ref = owning_installation(&meta).unwrap();

        assert_eq!(obj_ref.name, "rhsso");
        assert_eq!(obj_ref.namespace.as_deref(), Some("rhsso-operator"));
    }

    #[test]
    fn test_unannotated_object_maps_to_nothing() {
        assert!(owning_installation(&ObjectMeta::default()).is_none());
    }

    #[test]
    fn test_deleted_installation_backoff_is_pruned() {
        let mut live = Installation::new(
            "rhsso",
            InstallationSpec {
                installation_type: "managed".to_string(),
                credentials: CredentialsSpec {
                    postgres_name: "keycloak-postgres".to_string(),
                    target_namespace: "rhsso".to_string(),
                    target_secret_name: "keycloak-db-secret".to_string(),
                    tier: None,
                },
                suspend: false,
            },
        );
        live.metadata.namespace = Some("rhsso-operator".to_string());
        let tracker = BackoffTracker::default();
        tracker.record_error("rhsso-operator/rhsso", Duration::from_secs(60));
        tracker.record_error("rhsso-operator/removed", Duration::from_secs(60));

        let keys = live_backoff_keys(&[Arc::new(live)]);
        let dropped = tracker.retain(|key| keys.contains(key));

        assert_eq!(dropped, 1);
        assert_eq!(tracker.error_count("rhsso-operator/rhsso"), 1);
        assert_eq!(tracker.error_count("rhsso-operator/removed"), 0);
    }
}
