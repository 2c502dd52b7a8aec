//! # Status Updates
//!
//! Writes phase, description and the Ready condition back to the Installation.
//! A patch is only sent when something the user can see actually changed, so
//! that status writes do not trigger needless watch events.

use crate::constants::CONTROLLER_NAME;
use crate::controller::reconciler::types::Reconciler;
use crate::crd::{Condition, Installation, InstallationStatus};
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use tracing::debug;

/// Lifecycle phase reported on an Installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationPhase {
    Pending,
    Provisioning,
    Ready,
    Failed,
    Suspended,
}

impl InstallationPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallationPhase::Pending => "Pending",
            InstallationPhase::Provisioning => "Provisioning",
            InstallationPhase::Ready => "Ready",
            InstallationPhase::Failed => "Failed",
            InstallationPhase::Suspended => "Suspended",
        }
    }
}

/// Desired status for one reconciliation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub phase: InstallationPhase,
    pub description: Option<String>,
    /// Ready condition reason
    pub reason: &'static str,
    /// `namespace/name` of the credential secret, once written
    pub credential_secret: Option<String>,
}

impl StatusUpdate {
    #[must_use]
    pub fn new(phase: InstallationPhase, reason: &'static str) -> Self {
        Self {
            phase,
            description: None,
            reason,
            credential_secret: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_credential_secret(mut self, credential_secret: impl Into<String>) -> Self {
        self.credential_secret = Some(credential_secret.into());
        self
    }
}

/// Compute the status to write, or `None` when nothing visible changed
///
/// A previously recorded credential secret is kept when the update carries none.
#[must_use]
pub fn next_status(
    current: Option<&InstallationStatus>,
    generation: Option<i64>,
    update: &StatusUpdate,
) -> Option<InstallationStatus> {
    let credential_secret = update
        .credential_secret
        .clone()
        .or_else(|| current.and_then(|s| s.credential_secret.clone()));

    if let Some(current) = current {
        if current.phase.as_deref() == Some(update.phase.as_str())
            && current.description == update.description
            && current.credential_secret == credential_secret
            && current.observed_generation == generation
        {
            return None;
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let ready = update.phase == InstallationPhase::Ready;
    let condition = Condition {
        r#type: "Ready".to_string(),
        status: if ready { "True" } else { "False" }.to_string(),
        last_transition_time: Some(now.clone()),
        reason: Some(update.reason.to_string()),
        message: update.description.clone(),
    };

    Some(InstallationStatus {
        phase: Some(update.phase.as_str().to_string()),
        description: update.description.clone(),
        conditions: vec![condition],
        observed_generation: generation,
        last_reconcile_time: Some(now),
        credential_secret,
    })
}

/// Patch the Installation's status subresource if `update` changes it
pub async fn update_status(
    reconciler: &Reconciler,
    installation: &Installation,
    update: &StatusUpdate,
) -> Result<()> {
    let Some(status) = next_status(
        installation.status.as_ref(),
        installation.metadata.generation,
        update,
    ) else {
        debug!(
            "Skipping status update - phase and description unchanged: phase={}, description={:?}",
            update.phase.as_str(),
            update.description
        );
        return Ok(());
    };

    let api: Api<Installation> = Api::namespaced(
        reconciler.client.clone(),
        installation.namespace().as_deref().unwrap_or("default"),
    );
    let patch = serde_json::json!({ "status": status });

    api.patch_status(
        &installation.name_any(),
        &PatchParams::apply(CONTROLLER_NAME),
        &Patch::Merge(patch),
    )
    .await?;

    Ok(())
}
