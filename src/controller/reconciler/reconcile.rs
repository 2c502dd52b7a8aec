//! # Reconcile
//!
//! Drives one Installation through the credential pipeline and reports the
//! outcome on its status.
//!
//! Outcomes map onto requeue decisions:
//! - instance still provisioning: status `Provisioning`, short requeue
//! - credential secret written or already current: status `Ready`, interval requeue
//! - error: status `Failed`, error returned to the error policy for backoff

use crate::config::ControllerConfig;
use crate::controller::credentials::{
    CredentialError, CredentialOutcome, CredentialRequest, Owner, ResourcePhase,
};
use crate::controller::reconciler::status::{update_status, InstallationPhase, StatusUpdate};
use crate::controller::reconciler::types::{BackoffTracker, Reconciler, ReconcilerError};
use crate::controller::reconciler::validation::validate_installation;
use crate::crd::{Installation, SecretRef};
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};

/// Build the pipeline request for `installation`
///
/// The Postgres instance lives next to the Installation; the credential secret
/// goes to the consumer namespace from `spec.credentials.targetNamespace`.
#[must_use]
pub fn credential_request(installation: &Installation, config: &ControllerConfig) -> CredentialRequest {
    let credentials = &installation.spec.credentials;
    CredentialRequest {
        owner: Owner::from_installation(installation),
        postgres_name: credentials.postgres_name.clone(),
        tier: credentials.tier.unwrap_or(config.default_tier),
        target: SecretRef::new(
            credentials.target_secret_name.as_str(),
            credentials.target_namespace.as_str(),
        ),
    }
}

/// Ready condition reason for a failed pass
#[must_use]
pub fn failure_reason(error: &ReconcilerError) -> &'static str {
    match error {
        ReconcilerError::Credentials(CredentialError::ProvisioningFailed { .. }) => {
            "ProvisioningFailed"
        }
        ReconcilerError::InvalidInstallation(_) => "InvalidInstallation",
        _ => "ReconciliationFailed",
    }
}

pub async fn reconcile(
    installation: Arc<Installation>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = installation.name_any();
    let namespace = installation.namespace().unwrap_or_default();
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.kind = "Installation",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
    );

    async move {
        let start = Instant::now();
        observability::metrics::increment_reconciliations();

        let result = reconcile_installation(&installation, &ctx).await;

        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        result
    }
    .instrument(span)
    .await
}

async fn reconcile_installation(
    installation: &Installation,
    ctx: &Reconciler,
) -> Result<Action, ReconcilerError> {
    let name = installation.name_any();
    let namespace = installation.namespace().unwrap_or_default();
    let config = ctx.config.as_ref();

    if installation.spec.suspend {
        info!("Reconciliation suspended for {}/{}", namespace, name);
        record_status(
            ctx,
            installation,
            &StatusUpdate::new(InstallationPhase::Suspended, "ReconciliationSuspended")
                .with_description("Reconciliation is suspended"),
        )
        .await;
        return Ok(Action::await_change());
    }

    if let Err(e) = validate_installation(installation) {
        let error = ReconcilerError::InvalidInstallation(e.to_string());
        fail(ctx, installation, &error).await;
        return Err(error);
    }

    let request = credential_request(installation, config);
    let outcome = ctx
        .credentials
        .reconcile_with_deadline(&request, config.reconcile_timeout())
        .await;

    match outcome {
        Ok(CredentialOutcome::NotReady(phase)) => {
            observability::metrics::increment_not_ready();
            ctx.backoff.reset(&BackoffTracker::key(&namespace, &name));
            let status_phase = match phase {
                ResourcePhase::Pending => InstallationPhase::Pending,
                _ => InstallationPhase::Provisioning,
            };
            record_status(
                ctx,
                installation,
                &StatusUpdate::new(status_phase, "ReconciliationInProgress")
                    .with_description(format!(
                        "Postgres instance {} is {}",
                        request.postgres_name, phase
                    )),
            )
            .await;
            observability::metrics::increment_requeues_total("not-ready");
            Ok(Action::requeue(config.not_ready_requeue()))
        }
        Ok(CredentialOutcome::Synced { outcome, .. }) => {
            observability::metrics::increment_secret_writes(outcome.as_str());
            ctx.backoff.reset(&BackoffTracker::key(&namespace, &name));
            record_status(
                ctx,
                installation,
                &StatusUpdate::new(InstallationPhase::Ready, "ReconciliationSucceeded")
                    .with_description("Credential secret is up to date")
                    .with_credential_secret(request.target.to_string()),
            )
            .await;
            observability::metrics::increment_requeues_total("interval");
            Ok(Action::requeue(config.reconcile_interval()))
        }
        Err(e) => {
            if matches!(e, CredentialError::ProvisioningFailed { .. }) {
                observability::metrics::increment_provisioning_failures();
            }
            if !e.is_retryable() {
                warn!(
                    "Credential reconciliation for {}/{} needs operator attention: {}",
                    namespace, name, e
                );
            }
            let error = ReconcilerError::from(e);
            fail(ctx, installation, &error).await;
            Err(error)
        }
    }
}

async fn fail(ctx: &Reconciler, installation: &Installation, error: &ReconcilerError) {
    observability::metrics::increment_reconciliation_errors(error.reason());
    record_status(
        ctx,
        installation,
        &StatusUpdate::new(InstallationPhase::Failed, failure_reason(error))
            .with_description(error.to_string()),
    )
    .await;
}

// A failed status write must not mask the reconciliation result
async fn record_status(ctx: &Reconciler, installation: &Installation, update: &StatusUpdate) {
    if let Err(e) = update_status(ctx, installation, update).await {
        warn!(
            "Failed to update status of {}/{} to {}: {}",
            installation.namespace().unwrap_or_default(),
            installation.name_any(),
            update.phase.as_str(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CredentialsSpec, InstallationSpec, Tier};

    fn installation(tier: Option<Tier>) -> Installation {
        let mut inst = Installation::new(
            "rhsso",
            InstallationSpec {
                installation_type: "workshop".to_string(),
                credentials: CredentialsSpec {
                    postgres_name: "keycloak-postgres".to_string(),
                    target_namespace: "rhsso".to_string(),
                    target_secret_name: "keycloak-db-secret".to_string(),
                    tier,
                },
                suspend: false,
            },
        );
        inst.metadata.namespace = Some("rhsso-operator".to_string());
        inst.metadata.uid = Some("uid-1".to_string());
        inst
    }

    #[test]
    fn test_request_targets_consumer_namespace() {
        let request = credential_request(&installation(None), &ControllerConfig::default());

        assert_eq!(request.target, SecretRef::new("keycloak-db-secret", "rhsso"));
        assert_eq!(request.postgres_name, "keycloak-postgres");
        assert_eq!(request.owner.namespace, "rhsso-operator");
        assert_eq!(request.owner.variant, "workshop");
        assert_eq!(request.owner.uid.as_deref(), Some("uid-1"));
    }

    #[test]
    fn test_tier_override_wins_over_default() {
        let config = ControllerConfig::default();
        assert_eq!(credential_request(&installation(None), &config).tier, config.default_tier);
        assert_eq!(
            credential_request(&installation(Some(Tier::Development)), &config).tier,
            Tier::Development
        );
    }

    #[test]
    fn test_failure_reason_distinguishes_terminal_failure() {
        let terminal = ReconcilerError::from(CredentialError::ProvisioningFailed {
            name: "keycloak-postgres".to_string(),
            message: Some("quota exceeded".to_string()),
        });
        let transient = ReconcilerError::from(CredentialError::Cancelled {
            name: "keycloak-postgres".to_string(),
            elapsed_secs: 60,
        });

        assert_eq!(failure_reason(&terminal), "ProvisioningFailed");
        assert_eq!(failure_reason(&transient), "ReconciliationFailed");
    }
}
