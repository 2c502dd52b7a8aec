//! # Create-or-Update
//!
//! Read-modify-write against the Kubernetes API.
//!
//! Updates are sent with the `resourceVersion` that was read, so a concurrent
//! writer makes the update fail with `409 Conflict` instead of being
//! overwritten. The conflict is surfaced to the caller; the whole
//! reconciliation is retried on the next pass.

use anyhow::{Context, Result};
use kube::api::{Api, PostParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// What a create-or-update call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// The mutation produced no change; nothing was written
    Unchanged,
}

impl UpsertOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

/// Create `template` (after mutation) if `name` is absent, otherwise mutate the
/// live object and replace it when the mutation changed something
///
/// # Errors
///
/// Returns the API error from the read, create, or replace call, or the
/// mutation's own error.
pub async fn create_or_update<K, F>(
    api: &Api<K>,
    name: &str,
    mut template: K,
    mutate: F,
) -> Result<(K, UpsertOutcome)>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug + PartialEq,
    F: Fn(&mut K) -> Result<()>,
{
    let existing = api
        .get_opt(name)
        .await
        .with_context(|| format!("Failed to read {name}"))?;

    match existing {
        None => {
            mutate(&mut template)?;
            let created = api
                .create(&PostParams::default(), &template)
                .await
                .with_context(|| format!("Failed to create {name}"))?;
            debug!("Created {}", name);
            Ok((created, UpsertOutcome::Created))
        }
        Some(current) => {
            let mut desired = current.clone();
            mutate(&mut desired)?;
            if desired == current {
                debug!("{} unchanged, skipping write", name);
                return Ok((current, UpsertOutcome::Unchanged));
            }
            let updated = api
                .replace(name, &PostParams::default(), &desired)
                .await
                .with_context(|| format!("Failed to update {name}"))?;
            debug!("Updated {}", name);
            Ok((updated, UpsertOutcome::Updated))
        }
    }
}

/// Whether an error chain contains a `409 Conflict` from the API server
#[must_use]
pub fn is_conflict(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<kube::Error>(),
            Some(kube::Error::Api(response)) if response.code == 409
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_errors_are_not_conflicts() {
        let err = anyhow::anyhow!("connection refused").context("Failed to update secret");
        assert!(!is_conflict(&err));
    }
}
