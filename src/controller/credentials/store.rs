//! # Credential Store
//!
//! Read and create-or-update access to credential secrets.

use crate::controller::credentials::apply::{create_or_update, is_conflict, UpsertOutcome};
use crate::controller::credentials::blob::CredentialBlob;
use crate::crd::SecretRef;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client};
use tracing::warn;

/// Mutation applied to the current in-memory copy of a secret
pub type SecretMutation<'a> = &'a (dyn Fn(&mut Secret) -> Result<()> + Send + Sync);

/// Persisted secret store seam
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the blob stored at `secret_ref`
    async fn get(&self, secret_ref: &SecretRef) -> Result<CredentialBlob>;

    /// Read-or-create the secret at `secret_ref`, apply `mutate`, and write
    /// back only if the mutation changed it
    async fn upsert(
        &self,
        secret_ref: &SecretRef,
        mutate: SecretMutation<'_>,
    ) -> Result<(Secret, UpsertOutcome)>;
}

/// Store backed by core `Secret` objects
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialStore for KubeSecretStore {
    async fn get(&self, secret_ref: &SecretRef) -> Result<CredentialBlob> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &secret_ref.namespace);
        let secret = api
            .get(&secret_ref.name)
            .await
            .with_context(|| format!("Failed to read secret {secret_ref}"))?;
        Ok(CredentialBlob::from_secret(&secret))
    }

    async fn upsert(
        &self,
        secret_ref: &SecretRef,
        mutate: SecretMutation<'_>,
    ) -> Result<(Secret, UpsertOutcome)> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &secret_ref.namespace);
        let template = Secret {
            metadata: ObjectMeta {
                name: Some(secret_ref.name.clone()),
                namespace: Some(secret_ref.namespace.clone()),
                ..ObjectMeta::default()
            },
            type_: Some("Opaque".to_string()),
            ..Secret::default()
        };

        let result = create_or_update(&api, &secret_ref.name, template, mutate).await;
        if let Err(e) = &result {
            if is_conflict(e) {
                warn!(
                    "Secret {} was modified concurrently, the write will be retried on the next reconciliation",
                    secret_ref
                );
            }
        }
        result
    }
}
