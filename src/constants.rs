//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager / controller name used for status patches
pub const CONTROLLER_NAME: &str = "credential-bridge-controller";

/// Annotation key carrying the owning Installation's name
pub const OWNER_NAME_ANNOTATION: &str = "credential-bridge.microscaler.io/owner-name";

/// Annotation key carrying the owning Installation's namespace
pub const OWNER_NAMESPACE_ANNOTATION: &str = "credential-bridge.microscaler.io/owner-namespace";

/// Annotation key carrying the owning Installation's UID
pub const OWNER_UID_ANNOTATION: &str = "credential-bridge.microscaler.io/owner-uid";

/// Secret name the Keycloak operator looks for when using an external database
pub const DEFAULT_TARGET_SECRET_NAME: &str = "keycloak-db-secret";

/// Default name of the Postgres instance requested from the provisioning backend
pub const DEFAULT_POSTGRES_NAME: &str = "keycloak-postgres";

/// Default namespace the controller runs in
pub const DEFAULT_CONTROLLER_NAMESPACE: &str = "credential-bridge-system";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default interval between successful reconciliations (seconds)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

/// Default requeue interval while the backing Postgres instance is still provisioning (seconds)
pub const DEFAULT_NOT_READY_REQUEUE_SECS: u64 = 30;

/// Default deadline for a single credential reconciliation (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default exponential backoff starting value for watch errors (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for watch errors (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Minimum error backoff (minutes)
pub const MIN_ERROR_BACKOFF_MINUTES: u64 = 1;

/// Maximum error backoff (minutes)
pub const MAX_ERROR_BACKOFF_MINUTES: u64 = 10;
