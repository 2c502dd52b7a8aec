//! # Installation Spec
//!
//! The owning tenant object. Each Installation asks for one Postgres instance
//! and one consumer-facing credential secret.

use crate::constants::{DEFAULT_POSTGRES_NAME, DEFAULT_TARGET_SECRET_NAME};
use crate::crd::{InstallationStatus, Tier};
use serde::{Deserialize, Serialize};

/// Installation Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: credential-bridge.microscaler.io/v1alpha1
/// kind: Installation
/// metadata:
///   name: rhmi
///   namespace: redhat-rhmi-operator
/// spec:
///   type: managed
///   credentials:
///     targetNamespace: redhat-rhmi-rhsso
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Installation",
    group = "credential-bridge.microscaler.io",
    version = "v1alpha1",
    namespaced,
    status = "InstallationStatus",
    shortname = "inst",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}, {"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstallationSpec {
    /// Deployment variant (e.g. "managed", "workshop")
    /// Passed through to the provisioning backend, which uses it to pick a strategy
    #[serde(rename = "type")]
    pub installation_type: String,
    /// Where the Postgres instance and the derived credentials live
    pub credentials: CredentialsSpec,
    /// Suspend reconciliation
    /// When true, the controller leaves the Postgres request and the credential secret untouched
    #[serde(default)]
    pub suspend: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsSpec {
    /// Name of the Postgres instance to request
    /// The instance is created in the Installation's own namespace
    #[serde(default = "default_postgres_name")]
    pub postgres_name: String,
    /// Namespace of the consumer (Keycloak) that reads the credential secret
    pub target_namespace: String,
    /// Name of the credential secret written into `target_namespace`
    #[serde(default = "default_target_secret_name")]
    pub target_secret_name: String,
    /// Provisioning tier override; the controller default applies when unset
    #[serde(default)]
    pub tier: Option<Tier>,
}

#[must_use]
pub fn default_postgres_name() -> String {
    DEFAULT_POSTGRES_NAME.to_string()
}

#[must_use]
pub fn default_target_secret_name() -> String {
    DEFAULT_TARGET_SECRET_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults_applied() {
        let spec: InstallationSpec = serde_json::from_value(serde_json::json!({
            "type": "managed",
            "credentials": { "targetNamespace": "rhsso" }
        }))
        .unwrap();

        assert_eq!(spec.installation_type, "managed");
        assert_eq!(spec.credentials.postgres_name, DEFAULT_POSTGRES_NAME);
        assert_eq!(spec.credentials.target_secret_name, DEFAULT_TARGET_SECRET_NAME);
        assert!(spec.credentials.tier.is_none());
        assert!(!spec.suspend);
    }

    #[test]
    fn test_tier_override_deserializes() {
        let spec: InstallationSpec = serde_json::from_value(serde_json::json!({
            "type": "workshop",
            "credentials": { "targetNamespace": "rhsso", "tier": "development" }
        }))
        .unwrap();

        assert_eq!(spec.credentials.tier, Some(Tier::Development));
    }
}
