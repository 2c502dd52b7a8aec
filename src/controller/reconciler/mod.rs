//! # Reconciler
//!
//! Installation reconciliation: validation, the credential pipeline, and
//! status reporting.

pub mod reconcile;
pub mod status;
pub mod types;
pub mod validation;

pub use reconcile::{credential_request, reconcile};
pub use status::{InstallationPhase, StatusUpdate};
pub use types::{BackoffState, BackoffTracker, Reconciler, ReconcilerError};
