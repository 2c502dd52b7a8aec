//! # Postgres Request
//!
//! Client-side model of the provisioning backend's `Postgres` resource.
//!
//! The backend owns the schema; only the fields this controller writes
//! (`spec`) or reads (`status.phase`, `status.secretRef`) are modelled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Postgres instance request understood by the provisioning backend
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "Postgres",
    group = "integreatly.org",
    version = "v1alpha1",
    namespaced,
    status = "PostgresStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct PostgresSpec {
    /// Deployment variant, used by the backend to select a provisioning strategy
    #[serde(rename = "type")]
    pub deployment_type: String,
    /// Requested tier
    pub tier: Tier,
    /// Where the backend should write the instance's native credentials
    pub secret_ref: SecretRef,
}

/// Observed state reported by the provisioning backend
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostgresStatus {
    /// Lifecycle phase as a free-form backend string (e.g. "in progress", "complete")
    #[serde(default)]
    pub phase: Option<String>,
    /// Backend message accompanying the phase
    #[serde(default)]
    pub message: Option<String>,
    /// Location of the native credentials once provisioning is complete
    #[serde(default)]
    pub secret_ref: Option<SecretRef>,
    /// Backend strategy that fulfilled the request
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Name + namespace pointer to a Secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
}

impl SecretRef {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Provisioning tiers recognised by the backend
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Production,
    Development,
}

impl Tier {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Production => "production",
            Tier::Development => "development",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" => Ok(Tier::Production),
            "development" => Ok(Tier::Development),
            other => Err(anyhow::anyhow!(
                "unknown tier '{other}', expected one of: production, development"
            )),
        }
    }
}
