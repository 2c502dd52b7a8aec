//! # Configuration
//!
//! Controller configuration loaded from the environment at startup.

mod controller;

pub use controller::ControllerConfig;

/// Shared, read-only controller configuration
pub type SharedControllerConfig = std::sync::Arc<ControllerConfig>;
