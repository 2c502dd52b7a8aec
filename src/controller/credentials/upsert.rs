//! # Idempotent Upsert
//!
//! Writes the transformed credentials into the consumer's secret.
//!
//! The secret may carry keys written by other actors (for example the
//! consumer's own operator). Only keys produced by the field mapping are set;
//! everything else in `data`, and every foreign annotation, is left alone.
//! Owner annotations are re-applied on every pass so that an update by an
//! actor that dropped them is repaired on the next reconciliation.

use crate::controller::credentials::apply::UpsertOutcome;
use crate::controller::credentials::blob::CredentialBlob;
use crate::controller::credentials::error::CredentialError;
use crate::controller::credentials::ownership::{apply_owner_annotations, Owner};
use crate::controller::credentials::store::CredentialStore;
use crate::crd::SecretRef;
use k8s_openapi::api::core::v1::Secret;
use tracing::debug;

/// Upsert `target`, applying owner annotations and then `mutate`
///
/// # Errors
///
/// `Upsert` naming the secret and the resource being reconciled.
pub async fn upsert_owned<F>(
    store: &dyn CredentialStore,
    target: &SecretRef,
    owner: &Owner,
    resource_name: &str,
    mutate: F,
) -> Result<(Secret, UpsertOutcome), CredentialError>
where
    F: Fn(&mut Secret) + Send + Sync,
{
    let mutation = |secret: &mut Secret| -> anyhow::Result<()> {
        if secret.metadata.resource_version.is_some() && !owner.is_recorded_on(&secret.metadata) {
            debug!("Restoring owner annotations on {}", target);
        }
        apply_owner_annotations(&mut secret.metadata, owner);
        mutate(secret);
        Ok(())
    };

    let (secret, outcome) =
        store
            .upsert(target, &mutation)
            .await
            .map_err(|source| CredentialError::Upsert {
                name: resource_name.to_string(),
                secret: target.clone(),
                source,
            })?;

    debug!("Credential secret {} {}", target, outcome.as_str());
    Ok((secret, outcome))
}

/// Set every field of `blob` on `secret`, creating `data` only if absent
pub fn merge_fields(secret: &mut Secret, blob: &CredentialBlob) {
    let data = secret.data.get_or_insert_with(Default::default);
    blob.merge_into(data);
}

/// Merge `blob` into the owned secret at `target`
///
/// # Errors
///
/// See [`upsert_owned`].
pub async fn upsert_credentials(
    store: &dyn CredentialStore,
    target: &SecretRef,
    owner: &Owner,
    resource_name: &str,
    blob: &CredentialBlob,
) -> Result<(Secret, UpsertOutcome), CredentialError> {
    upsert_owned(store, target, owner, resource_name, |secret| {
        merge_fields(secret, blob);
    })
    .await
}
