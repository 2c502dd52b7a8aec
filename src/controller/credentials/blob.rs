//! # Credential Blob
//!
//! Field-name to byte-value map for a credential set.

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroize;

/// Opaque credential map (e.g. `host`, `port`, `password`)
///
/// Values are wiped from memory on drop. `Debug` never prints values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialBlob {
    fields: BTreeMap<String, Vec<u8>>,
}

impl CredentialBlob {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `data` section of a Secret
    ///
    /// `stringData` is write-only on the API server and is not consulted.
    #[must_use]
    pub fn from_secret(secret: &Secret) -> Self {
        let fields = secret
            .data
            .as_ref()
            .map(|data| {
                data.iter()
                    .map(|(k, v)| (k.clone(), v.0.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Self { fields }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.fields.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Write every field into `data`, leaving keys outside this blob untouched
    pub fn merge_into(&self, data: &mut BTreeMap<String, ByteString>) {
        for (key, value) in &self.fields {
            data.insert(key.clone(), ByteString(value.clone()));
        }
    }
}

impl<K, V> FromIterator<(K, V)> for CredentialBlob
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut blob = Self::new();
        for (k, v) in iter {
            blob.insert(k, v);
        }
        blob
    }
}

impl fmt::Debug for CredentialBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBlob")
            .field("keys", &self.fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Drop for CredentialBlob {
    fn drop(&mut self) {
        for value in self.fields.values_mut() {
            value.zeroize();
        }
    }
}
