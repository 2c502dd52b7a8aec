//! Credential Bridge Controller Library
//!
//! Provisions Postgres instances for Keycloak installations and publishes
//! their credentials in the secret layout the Keycloak operator expects.
//!
//! ## Quick Start
//!
//! ```rust
//! use credential_bridge_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
