//! # Credential Errors
//!
//! Every error names the stage that failed and the Postgres instance being
//! reconciled. "Still provisioning" is not an error and never appears here.

use crate::crd::SecretRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid credential request: {0}")]
    InvalidRequest(String),

    #[error("failed to provision postgres instance while reconciling postgres credentials, {name}")]
    Provision {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("postgres instance {name} failed to provision: {}", .message.as_deref().unwrap_or("no message from provisioning backend"))]
    ProvisioningFailed {
        name: String,
        message: Option<String>,
    },

    #[error("postgres instance {name} reports complete but has no credential secret reference")]
    MissingCredentialRef { name: String },

    #[error("failed to get postgres credential secret {secret} while reconciling postgres credentials, {name}")]
    FetchCredentials {
        name: String,
        secret: SecretRef,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create or update credential secret {secret}, {name}")]
    Upsert {
        name: String,
        secret: SecretRef,
        #[source]
        source: anyhow::Error,
    },

    #[error("credential reconciliation for {name} cancelled after {elapsed_secs}s deadline")]
    Cancelled { name: String, elapsed_secs: u64 },
}

impl CredentialError {
    /// Whether the next scheduled pass can be expected to make progress
    ///
    /// Terminal provisioning failures and malformed requests need operator action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            CredentialError::ProvisioningFailed { .. } | CredentialError::InvalidRequest(_)
        )
    }

    /// Short machine-readable reason, used for status conditions and metrics
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            CredentialError::InvalidRequest(_) => "InvalidRequest",
            CredentialError::Provision { .. } => "ProvisionRequestFailed",
            CredentialError::ProvisioningFailed { .. } => "ProvisioningFailed",
            CredentialError::MissingCredentialRef { .. } => "MissingCredentialRef",
            CredentialError::FetchCredentials { .. } => "CredentialFetchFailed",
            CredentialError::Upsert { .. } => "CredentialSecretWriteFailed",
            CredentialError::Cancelled { .. } => "Cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors_not_retryable() {
        let failed = CredentialError::ProvisioningFailed {
            name: "pg".to_string(),
            message: None,
        };
        assert!(!failed.is_retryable());
        assert!(!CredentialError::InvalidRequest("empty name".to_string()).is_retryable());
    }

    #[test]
    fn test_transient_errors_retryable() {
        let fetch = CredentialError::FetchCredentials {
            name: "pg".to_string(),
            secret: SecretRef::new("pg-sec", "ns"),
            source: anyhow::anyhow!("connection reset"),
        };
        assert!(fetch.is_retryable());
        assert!(CredentialError::Cancelled {
            name: "pg".to_string(),
            elapsed_secs: 60
        }
        .is_retryable());
    }

    #[test]
    fn test_messages_name_operation_and_subject() {
        let err = CredentialError::Provision {
            name: "keycloak-postgres".to_string(),
            source: anyhow::anyhow!("503"),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to provision postgres instance"));
        assert!(msg.contains("keycloak-postgres"));

        let failed = CredentialError::ProvisioningFailed {
            name: "keycloak-postgres".to_string(),
            message: Some("quota exceeded".to_string()),
        };
        assert!(failed.to_string().contains("quota exceeded"));
    }
}
