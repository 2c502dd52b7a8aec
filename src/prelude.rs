//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use credential_bridge_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Seams for the provisioning backend and the secret store
pub use crate::controller::credentials::{
    CredentialStore, KubePostgresProvisioner, KubeSecretStore, ResourceProvisioner,
};

// Pipeline types
pub use crate::controller::credentials::{
    CredentialBlob, CredentialError, CredentialOutcome, CredentialReconciler, CredentialRequest,
    FieldMapping, Owner, ResourceHandle, ResourcePhase, UpsertOutcome, KEYCLOAK_DATABASE_MAPPING,
};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{reconcile, BackoffState, Reconciler, ReconcilerError};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, SharedControllerConfig};
