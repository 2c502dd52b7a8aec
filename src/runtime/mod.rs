//! # Runtime
//!
//! Process-level wiring around the reconciler.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server and client setup
//! - `watch_loop`: the kube-runtime controller and its restart loop
//! - `error_policy`: per-resource backoff and watch error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
