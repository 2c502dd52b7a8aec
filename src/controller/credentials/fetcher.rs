//! # Credential Fetcher
//!
//! Reads the backing resource's native credentials once the phase gate has
//! produced a credential reference.

use crate::controller::credentials::blob::CredentialBlob;
use crate::controller::credentials::error::CredentialError;
use crate::controller::credentials::store::CredentialStore;
use crate::crd::SecretRef;
use tracing::debug;

/// Fetch the native credential blob for `resource_name`
///
/// # Errors
///
/// `FetchCredentials` naming the resource and secret when the store read fails.
pub async fn fetch_blob(
    store: &dyn CredentialStore,
    resource_name: &str,
    secret_ref: &SecretRef,
) -> Result<CredentialBlob, CredentialError> {
    let blob = store
        .get(secret_ref)
        .await
        .map_err(|source| CredentialError::FetchCredentials {
            name: resource_name.to_string(),
            secret: secret_ref.clone(),
            source,
        })?;

    debug!(
        "Read {} credential fields for {} from {}",
        blob.len(),
        resource_name,
        secret_ref
    );
    Ok(blob)
}
