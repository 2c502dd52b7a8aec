//! # Validation
//!
//! Validates an Installation before any external call is made.
//! Names and namespaces are checked per RFC 1123.

use crate::crd::Installation;
use anyhow::Result;
use kube::ResourceExt;
use regex::Regex;

/// Validate Kubernetes resource name (RFC 1123 subdomain)
/// Format: lowercase alphanumeric, hyphens, dots
/// Length: 1-253 characters
/// Cannot start or end with hyphen or dot
pub fn validate_kubernetes_name(name: &str, field_name: &str) -> Result<()> {
    let name_trimmed = name.trim();

    if name_trimmed.is_empty() {
        return Err(anyhow::anyhow!("{field_name} cannot be empty"));
    }

    if name_trimmed.len() > 253 {
        return Err(anyhow::anyhow!(
            "{} '{}' exceeds maximum length of 253 characters (got {})",
            field_name,
            name_trimmed,
            name_trimmed.len()
        ));
    }

    let name_regex =
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    if !name_regex.is_match(name_trimmed) {
        return Err(anyhow::anyhow!(
            "{field_name} '{name_trimmed}' must be a valid Kubernetes name (lowercase alphanumeric, hyphens, dots; cannot start/end with hyphen or dot)"
        ));
    }

    Ok(())
}

/// Validate Kubernetes namespace (RFC 1123 label)
/// Format: lowercase alphanumeric, hyphens
/// Length: 1-63 characters
pub fn validate_kubernetes_namespace(namespace: &str, field_name: &str) -> Result<()> {
    let namespace_trimmed = namespace.trim();

    if namespace_trimmed.is_empty() {
        return Err(anyhow::anyhow!("{field_name} cannot be empty"));
    }

    if namespace_trimmed.len() > 63 {
        return Err(anyhow::anyhow!(
            "{} '{}' exceeds maximum length of 63 characters (got {})",
            field_name,
            namespace_trimmed,
            namespace_trimmed.len()
        ));
    }

    let namespace_regex = Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    if !namespace_regex.is_match(namespace_trimmed) {
        return Err(anyhow::anyhow!(
            "{field_name} '{namespace_trimmed}' must be a valid Kubernetes namespace (lowercase alphanumeric, hyphens; cannot start/end with hyphen)"
        ));
    }

    Ok(())
}

/// Validate every name the credential pipeline will use for `installation`
pub fn validate_installation(installation: &Installation) -> Result<()> {
    let namespace = installation
        .namespace()
        .ok_or_else(|| anyhow::anyhow!("Installation must be namespaced"))?;
    validate_kubernetes_namespace(&namespace, "metadata.namespace")?;

    let credentials = &installation.spec.credentials;
    validate_kubernetes_name(&credentials.postgres_name, "credentials.postgresName")?;
    validate_kubernetes_namespace(&credentials.target_namespace, "credentials.targetNamespace")?;
    validate_kubernetes_name(&credentials.target_secret_name, "credentials.targetSecretName")?;
    if credentials.target_namespace.trim() == namespace {
        return Err(anyhow::anyhow!(
            "credentials.targetNamespace '{namespace}' must differ from the Installation namespace"
        ));
    }
    Ok(())
}
