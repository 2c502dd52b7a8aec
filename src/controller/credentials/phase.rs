//! # Phase Gate
//!
//! Decides whether a provisioned resource is far enough along for its
//! credentials to be read.
//!
//! | Phase          | Outcome                              |
//! |----------------|--------------------------------------|
//! | `Pending`      | not ready, caller polls again later  |
//! | `Provisioning` | not ready, caller polls again later  |
//! | `Complete`     | proceed with the credential ref      |
//! | `Failed`       | terminal error                       |

use crate::controller::credentials::error::CredentialError;
use crate::crd::{Postgres, SecretRef};
use kube::ResourceExt;
use std::fmt;
use tracing::debug;

/// Lifecycle phase of a backing resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourcePhase {
    Pending,
    Provisioning,
    Complete,
    Failed,
}

impl ResourcePhase {
    /// Map the backend's free-form phase string onto a closed phase
    ///
    /// Unknown strings are treated as `Pending` so the resource keeps being polled.
    #[must_use]
    pub fn from_backend(phase: Option<&str>) -> Self {
        let Some(raw) = phase else {
            return ResourcePhase::Pending;
        };
        match raw.trim().to_lowercase().as_str() {
            "" | "awaiting components" => ResourcePhase::Pending,
            "in progress" | "deletion in progress" | "paused" => ResourcePhase::Provisioning,
            "complete" => ResourcePhase::Complete,
            "failed" => ResourcePhase::Failed,
            other => {
                debug!("Unrecognised provisioning phase '{}', treating as pending", other);
                ResourcePhase::Pending
            }
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourcePhase::Pending => "Pending",
            ResourcePhase::Provisioning => "Provisioning",
            ResourcePhase::Complete => "Complete",
            ResourcePhase::Failed => "Failed",
        }
    }
}

impl fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of a backing resource, as returned by a provisioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub name: String,
    pub namespace: String,
    pub phase: ResourcePhase,
    pub credential_ref: Option<SecretRef>,
    pub message: Option<String>,
}

impl ResourceHandle {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, phase: ResourcePhase) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase,
            credential_ref: None,
            message: None,
        }
    }

    #[must_use]
    pub fn with_credential_ref(mut self, credential_ref: SecretRef) -> Self {
        self.credential_ref = Some(credential_ref);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<&Postgres> for ResourceHandle {
    fn from(postgres: &Postgres) -> Self {
        let status = postgres.status.as_ref();
        Self {
            name: postgres.name_any(),
            namespace: postgres.namespace().unwrap_or_default(),
            phase: ResourcePhase::from_backend(status.and_then(|s| s.phase.as_deref())),
            credential_ref: status.and_then(|s| s.secret_ref.clone()),
            message: status.and_then(|s| s.message.clone()),
        }
    }
}

/// Result of passing a handle through the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Credentials can be read from this location
    Ready(SecretRef),
    /// Try again later; not a fault
    NotReady(ResourcePhase),
}

/// Gate the pipeline on the handle's phase
///
/// # Errors
///
/// `ProvisioningFailed` for a failed resource, `MissingCredentialRef` when a
/// complete resource does not say where its credentials are.
pub fn check_phase(handle: &ResourceHandle) -> Result<GateDecision, CredentialError> {
    match handle.phase {
        ResourcePhase::Pending | ResourcePhase::Provisioning => {
            Ok(GateDecision::NotReady(handle.phase))
        }
        ResourcePhase::Complete => match &handle.credential_ref {
            Some(secret_ref) if !secret_ref.name.is_empty() => {
                let mut secret_ref = secret_ref.clone();
                // An unqualified ref points next to the resource
                if secret_ref.namespace.is_empty() {
                    secret_ref.namespace.clone_from(&handle.namespace);
                }
                Ok(GateDecision::Ready(secret_ref))
            }
            _ => Err(CredentialError::MissingCredentialRef {
                name: handle.name.clone(),
            }),
        },
        ResourcePhase::Failed => Err(CredentialError::ProvisioningFailed {
            name: handle.name.clone(),
            message: handle.message.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_phase_mapping() {
        assert_eq!(ResourcePhase::from_backend(None), ResourcePhase::Pending);
        assert_eq!(ResourcePhase::from_backend(Some("")), ResourcePhase::Pending);
        assert_eq!(
            ResourcePhase::from_backend(Some("in progress")),
            ResourcePhase::Provisioning
        );
        assert_eq!(
            ResourcePhase::from_backend(Some("Complete")),
            ResourcePhase::Complete
        );
        assert_eq!(ResourcePhase::from_backend(Some("failed")), ResourcePhase::Failed);
        assert_eq!(
            ResourcePhase::from_backend(Some("reticulating")),
            ResourcePhase::Pending
        );
    }

    #[test]
    fn test_in_flight_phases_are_not_ready() {
        for phase in [ResourcePhase::Pending, ResourcePhase::Provisioning] {
            let handle = ResourceHandle::new("pg", "ns", phase)
                .with_credential_ref(SecretRef::new("pg-sec", "ns"));
            assert_eq!(check_phase(&handle).unwrap(), GateDecision::NotReady(phase));
        }
    }

    #[test]
    fn test_complete_yields_credential_ref() {
        let handle = ResourceHandle::new("pg", "ns", ResourcePhase::Complete)
            .with_credential_ref(SecretRef::new("pg-sec", "ns"));
        assert_eq!(
            check_phase(&handle).unwrap(),
            GateDecision::Ready(SecretRef::new("pg-sec", "ns"))
        );
    }

    #[test]
    fn test_unqualified_ref_resolves_to_resource_namespace() {
        let handle = ResourceHandle::new("pg", "rhsso-operator", ResourcePhase::Complete)
            .with_credential_ref(SecretRef::new("pg-sec", ""));
        assert_eq!(
            check_phase(&handle).unwrap(),
            GateDecision::Ready(SecretRef::new("pg-sec", "rhsso-operator"))
        );
    }

    #[test]
    fn test_complete_without_ref_is_error() {
        let handle = ResourceHandle::new("pg", "ns", ResourcePhase::Complete);
        assert!(matches!(
            check_phase(&handle),
            Err(CredentialError::MissingCredentialRef { .. })
        ));
    }

    #[test]
    fn test_failed_is_terminal() {
        let handle =
            ResourceHandle::new("pg", "ns", ResourcePhase::Failed).with_message("quota exceeded");
        match check_phase(&handle) {
            Err(CredentialError::ProvisioningFailed { name, message }) => {
                assert_eq!(name, "pg");
                assert_eq!(message.as_deref(), Some("quota exceeded"));
            }
            other => panic!("expected ProvisioningFailed, got {other:?}"),
        }
    }
}
