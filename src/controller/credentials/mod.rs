//! # Credential Reconciliation
//!
//! Bridges a provisioned Postgres instance to the credential secret a Keycloak
//! deployment expects.
//!
//! ## Pipeline
//!
//! 1. **Provision** - request (or re-request) the instance, tagged with its owner
//! 2. **Gate** - stop with "not ready" unless the instance is complete
//! 3. **Fetch** - read the instance's native credential secret
//! 4. **Transform** - rename fields into the consumer's schema
//! 5. **Upsert** - merge the result into the consumer's secret
//!
//! Stages run strictly in order. Nothing is retried here; the surrounding
//! controller calls this again on its own schedule.

pub mod apply;
pub mod blob;
pub mod error;
pub mod fetcher;
pub mod ownership;
pub mod phase;
pub mod provisioner;
pub mod store;
pub mod transform;
pub mod upsert;

pub use apply::UpsertOutcome;
pub use blob::CredentialBlob;
pub use error::CredentialError;
pub use ownership::{annotated, apply_owner_annotations, Owner};
pub use phase::{check_phase, GateDecision, ResourceHandle, ResourcePhase};
pub use provisioner::{KubePostgresProvisioner, ProvisionRequest, ResourceProvisioner};
pub use store::{CredentialStore, KubeSecretStore};
pub use transform::{transform, FieldMapping, FieldSource, KEYCLOAK_DATABASE_MAPPING};

use crate::crd::{SecretRef, Tier};
use k8s_openapi::api::core::v1::Secret;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Instrument};

/// What one pass of the pipeline achieved
#[derive(Debug, Clone)]
pub enum CredentialOutcome {
    /// The instance is still being provisioned; nothing was written
    NotReady(ResourcePhase),
    /// The consumer secret reflects the instance's current credentials
    Synced {
        secret: Box<Secret>,
        outcome: UpsertOutcome,
    },
}

impl CredentialOutcome {
    #[must_use]
    pub fn into_secret(self) -> Option<Secret> {
        match self {
            CredentialOutcome::NotReady(_) => None,
            CredentialOutcome::Synced { secret, .. } => Some(*secret),
        }
    }
}

/// Parameters for one credential reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub owner: Owner,
    /// Name of the Postgres instance; it lives in the owner's namespace
    pub postgres_name: String,
    pub tier: Tier,
    /// Consumer secret to write
    pub target: SecretRef,
}

/// Runs the provision → gate → fetch → transform → upsert pipeline
#[derive(Clone)]
pub struct CredentialReconciler {
    provisioner: Arc<dyn ResourceProvisioner>,
    store: Arc<dyn CredentialStore>,
    mapping: &'static [FieldMapping],
}

impl std::fmt::Debug for CredentialReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialReconciler")
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

impl CredentialReconciler {
    #[must_use]
    pub fn new(
        provisioner: Arc<dyn ResourceProvisioner>,
        store: Arc<dyn CredentialStore>,
        mapping: &'static [FieldMapping],
    ) -> Self {
        Self {
            provisioner,
            store,
            mapping,
        }
    }

    /// Kubernetes-backed reconciler producing the Keycloak secret layout
    #[must_use]
    pub fn for_keycloak(client: &Client) -> Self {
        Self::new(
            Arc::new(KubePostgresProvisioner::new(client.clone())),
            Arc::new(KubeSecretStore::new(client.clone())),
            KEYCLOAK_DATABASE_MAPPING,
        )
    }

    /// Run the pipeline once
    ///
    /// Returns `Ok(None)` while the instance is still provisioning.
    ///
    /// # Errors
    ///
    /// See [`CredentialError`]; a failed instance yields `ProvisioningFailed`.
    pub async fn reconcile(
        &self,
        request: &CredentialRequest,
    ) -> Result<Option<Secret>, CredentialError> {
        self.reconcile_detailed(request)
            .await
            .map(CredentialOutcome::into_secret)
    }

    /// Run the pipeline once under `deadline`
    ///
    /// Expiry aborts at the next await point. If that happens before the upsert
    /// stage starts, nothing has been written to the consumer secret.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the deadline expires, otherwise as [`Self::reconcile_detailed`].
    pub async fn reconcile_with_deadline(
        &self,
        request: &CredentialRequest,
        deadline: Duration,
    ) -> Result<CredentialOutcome, CredentialError> {
        match tokio::time::timeout(deadline, self.reconcile_detailed(request)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(CredentialError::Cancelled {
                name: request.postgres_name.clone(),
                elapsed_secs: deadline.as_secs(),
            }),
        }
    }

    /// Run the pipeline once, reporting what was done
    ///
    /// # Errors
    ///
    /// See [`CredentialError`].
    pub async fn reconcile_detailed(
        &self,
        request: &CredentialRequest,
    ) -> Result<CredentialOutcome, CredentialError> {
        let name = request.postgres_name.as_str();
        let provision_request = ProvisionRequest::new(
            &request.owner,
            name,
            request.owner.namespace.as_str(),
            request.tier,
        );
        provision_request
            .validate()
            .map_err(CredentialError::InvalidRequest)?;
        if request.target.name.is_empty() || request.target.namespace.is_empty() {
            return Err(CredentialError::InvalidRequest(format!(
                "credential secret for {name} needs a name and namespace"
            )));
        }
        if request.target.namespace == request.owner.namespace {
            return Err(CredentialError::InvalidRequest(format!(
                "credential secret {} must be outside the owner namespace {}",
                request.target, request.owner.namespace
            )));
        }

        let annotate = provisioner::owner_annotator(&request.owner);
        let handle = self
            .provisioner
            .provision(&provision_request, &annotate)
            .instrument(tracing::info_span!("credentials.provision", postgres.name = name))
            .await
            .map_err(|source| CredentialError::Provision {
                name: name.to_string(),
                source,
            })?;

        let credential_ref = match check_phase(&handle)? {
            GateDecision::NotReady(phase) => {
                info!(
                    "Postgres instance {} is {}, credential secret not written yet",
                    name, phase
                );
                return Ok(CredentialOutcome::NotReady(phase));
            }
            GateDecision::Ready(credential_ref) => credential_ref,
        };
        if credential_ref == request.target {
            return Err(CredentialError::InvalidRequest(format!(
                "credential secret {} is the native credentials secret of {name}",
                request.target
            )));
        }

        let source = fetcher::fetch_blob(self.store.as_ref(), name, &credential_ref)
            .instrument(tracing::info_span!("credentials.fetch", postgres.name = name))
            .await?;

        let target_blob = transform(&source, self.mapping);
        debug!(
            "Transformed {} source fields into {} target fields for {}",
            source.len(),
            target_blob.len(),
            name
        );

        let (secret, outcome) = upsert::upsert_credentials(
            self.store.as_ref(),
            &request.target,
            &request.owner,
            name,
            &target_blob,
        )
        .instrument(tracing::info_span!(
            "credentials.upsert",
            postgres.name = name,
            secret.namespace = request.target.namespace.as_str()
        ))
        .await?;

        info!(
            "Credential secret {} {} from postgres instance {}",
            request.target,
            outcome.as_str(),
            name
        );
        Ok(CredentialOutcome::Synced {
            secret: Box::new(secret),
            outcome,
        })
    }
}
