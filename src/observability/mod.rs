//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//!
//! Logging is plain `tracing`; the subscriber is installed in
//! [`crate::runtime::initialization`].

pub mod metrics;
