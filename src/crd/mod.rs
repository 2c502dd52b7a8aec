//! # Custom Resource Definitions
//!
//! CRD types used by the controller.
//!
//! ## Module Structure
//!
//! - `installation.rs` - The owning `Installation` resource (served by this controller)
//! - `status.rs` - Installation status and conditions
//! - `postgres.rs` - The provisioning backend's `Postgres` resource (consumed, not served)

mod installation;
mod postgres;
mod status;

pub use installation::{
    default_postgres_name, default_target_secret_name, CredentialsSpec, Installation,
    InstallationSpec,
};
pub use postgres::{Postgres, PostgresSpec, PostgresStatus, SecretRef, Tier};
pub use status::{Condition, InstallationStatus};
