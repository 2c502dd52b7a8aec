//! # Controller
//!
//! Core controller modules for the Credential Bridge Controller.
//!
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `credentials`: Provision, gate, fetch, transform and upsert pipeline
//! - `reconciler`: Installation reconciliation and status reporting
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod credentials;
pub mod reconciler;
pub mod server;
