//! # Ownership Annotations
//!
//! Records which Installation caused an object to exist. Annotations are used
//! instead of `ownerReferences` because the Postgres request and the credential
//! secret live in namespaces other than the owner's.

use crate::constants::{OWNER_NAME_ANNOTATION, OWNER_NAMESPACE_ANNOTATION, OWNER_UID_ANNOTATION};
use crate::crd::Installation;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

/// Identity of the Installation that owns derived objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
    /// Deployment variant of the Installation (`spec.type`)
    pub variant: String,
}

impl Owner {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: None,
            variant: variant.into(),
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn from_installation(installation: &Installation) -> Self {
        Self {
            name: installation.name_any(),
            namespace: installation.namespace().unwrap_or_default(),
            uid: installation.uid(),
            variant: installation.spec.installation_type.clone(),
        }
    }

    /// Whether `meta` already carries this owner's annotations
    #[must_use]
    pub fn is_recorded_on(&self, meta: &ObjectMeta) -> bool {
        let Some(annotations) = meta.annotations.as_ref() else {
            return false;
        };
        let uid_matches = match &self.uid {
            Some(uid) => annotations.get(OWNER_UID_ANNOTATION) == Some(uid),
            None => true,
        };
        annotations.get(OWNER_NAME_ANNOTATION) == Some(&self.name)
            && annotations.get(OWNER_NAMESPACE_ANNOTATION) == Some(&self.namespace)
            && uid_matches
    }
}

/// Stamp the owner annotations onto `meta`, keeping every other annotation
pub fn apply_owner_annotations(meta: &mut ObjectMeta, owner: &Owner) {
    let annotations = meta.annotations.get_or_insert_with(Default::default);
    annotations.insert(OWNER_NAME_ANNOTATION.to_string(), owner.name.clone());
    annotations.insert(OWNER_NAMESPACE_ANNOTATION.to_string(), owner.namespace.clone());
    if let Some(uid) = &owner.uid {
        annotations.insert(OWNER_UID_ANNOTATION.to_string(), uid.clone());
    }
}

/// Value-returning form of [`apply_owner_annotations`]
#[must_use]
pub fn annotated(mut meta: ObjectMeta, owner: &Owner) -> ObjectMeta {
    apply_owner_annotations(&mut meta, owner);
    meta
}
