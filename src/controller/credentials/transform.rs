//! # Schema Transformer
//!
//! Renames the provisioning backend's credential fields into the fixed
//! field names the Keycloak operator reads for an external database.

use crate::controller::credentials::blob::CredentialBlob;

/// Where a target field's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Copied from this source field; empty when the source lacks it
    Field(&'static str),
    /// Always this value
    Literal(&'static str),
}

/// One target field and its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub target: &'static str,
    pub source: FieldSource,
}

impl FieldMapping {
    #[must_use]
    pub const fn field(target: &'static str, source: &'static str) -> Self {
        Self {
            target,
            source: FieldSource::Field(source),
        }
    }

    #[must_use]
    pub const fn literal(target: &'static str, value: &'static str) -> Self {
        Self {
            target,
            source: FieldSource::Literal(value),
        }
    }
}

pub const DATABASE_KEY: &str = "DATABASE";
pub const EXTERNAL_PORT_KEY: &str = "EXTERNAL_PORT";
pub const EXTERNAL_ADDRESS_KEY: &str = "EXTERNAL_ADDRESS";
pub const PASSWORD_KEY: &str = "PASSWORD";
pub const USERNAME_KEY: &str = "USERNAME";
pub const SUPERUSER_KEY: &str = "SUPERUSER";

/// Keycloak external-database secret layout
pub const KEYCLOAK_DATABASE_MAPPING: &[FieldMapping] = &[
    FieldMapping::field(DATABASE_KEY, "database"),
    FieldMapping::field(EXTERNAL_PORT_KEY, "port"),
    FieldMapping::field(EXTERNAL_ADDRESS_KEY, "host"),
    FieldMapping::field(PASSWORD_KEY, "password"),
    FieldMapping::field(USERNAME_KEY, "username"),
    // provisioned users are never superusers
    FieldMapping::literal(SUPERUSER_KEY, "false"),
];

/// Apply `mapping` to `source`
///
/// Every target field in `mapping` is present in the output. Source fields
/// not named by `mapping` are dropped.
#[must_use]
pub fn transform(source: &CredentialBlob, mapping: &[FieldMapping]) -> CredentialBlob {
    mapping
        .iter()
        .map(|entry| {
            let value = match entry.source {
                FieldSource::Field(name) => source.get(name).map(<[u8]>::to_vec).unwrap_or_default(),
                FieldSource::Literal(value) => value.as_bytes().to_vec(),
            };
            (entry.target, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> CredentialBlob {
        [
            ("database", "db1"),
            ("port", "5432"),
            ("host", "pg.example"),
            ("password", "secret"),
            ("username", "admin"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_keycloak_mapping_renames_fields() {
        let target = transform(&source(), KEYCLOAK_DATABASE_MAPPING);

        let expected: CredentialBlob = [
            ("DATABASE", "db1"),
            ("EXTERNAL_PORT", "5432"),
            ("EXTERNAL_ADDRESS", "pg.example"),
            ("PASSWORD", "secret"),
            ("USERNAME", "admin"),
            ("SUPERUSER", "false"),
        ]
        .into_iter()
        .collect();
        assert_eq!(target, expected);
    }

    #[test]
    fn test_literal_ignores_source_content() {
        let mut source = source();
        source.insert("SUPERUSER", "true");
        source.insert("superuser", "true");

        let target = transform(&source, KEYCLOAK_DATABASE_MAPPING);
        assert_eq!(target.get(SUPERUSER_KEY), Some(&b"false"[..]));
    }

    #[test]
    fn test_missing_source_fields_become_empty() {
        let source: CredentialBlob = [("host", "pg.example")].into_iter().collect();
        let target = transform(&source, KEYCLOAK_DATABASE_MAPPING);

        assert_eq!(target.len(), KEYCLOAK_DATABASE_MAPPING.len());
        assert_eq!(target.get(PASSWORD_KEY), Some(&b""[..]));
        assert_eq!(target.get(EXTERNAL_ADDRESS_KEY), Some(&b"pg.example"[..]));
    }

    #[test]
    fn test_unmapped_source_fields_dropped() {
        let mut source = source();
        source.insert("sslmode", "require");

        let target = transform(&source, KEYCLOAK_DATABASE_MAPPING);
        assert!(!target.contains_key("sslmode"));
    }

    #[test]
    fn test_every_target_mapped_once() {
        let mut targets: Vec<_> = KEYCLOAK_DATABASE_MAPPING.iter().map(|m| m.target).collect();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), KEYCLOAK_DATABASE_MAPPING.len());
    }
}
