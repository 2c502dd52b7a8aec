//! # Error Handling Tests
//!
//! Error classification, retry policy and backoff calculation.
//!
//! These tests verify:
//! - Retryable vs terminal credential errors
//! - Status reasons derived from reconciler errors
//! - Backoff calculation using the Fibonacci sequence
//! - Watch stream error classification

use credential_bridge_controller::controller::backoff::FibonacciBackoff;
use credential_bridge_controller::controller::credentials::CredentialError;
use credential_bridge_controller::controller::reconciler::reconcile::failure_reason;
use credential_bridge_controller::controller::reconciler::{BackoffTracker, ReconcilerError};
use credential_bridge_controller::crd::SecretRef;
use credential_bridge_controller::runtime::error_policy::{classify_watch_error, WatchErrorKind};
use std::time::Duration;

fn secret_ref() -> SecretRef {
    SecretRef::new("keycloak-postgres", "rhsso-operator")
}

#[test]
fn test_transient_errors_are_retryable() {
    let errors = vec![
        CredentialError::Provision {
            name: "keycloak-postgres".to_string(),
            source: anyhow::anyhow!("connection refused"),
        },
        CredentialError::FetchCredentials {
            name: "keycloak-postgres".to_string(),
            secret: secret_ref(),
            source: anyhow::anyhow!("timeout"),
        },
        CredentialError::Upsert {
            name: "keycloak-postgres".to_string(),
            secret: SecretRef::new("keycloak-db-secret", "rhsso"),
            source: anyhow::anyhow!("409 Conflict"),
        },
        CredentialError::Cancelled {
            name: "keycloak-postgres".to_string(),
            elapsed_secs: 60,
        },
        CredentialError::MissingCredentialRef {
            name: "keycloak-postgres".to_string(),
        },
    ];

    for error in errors {
        assert!(error.is_retryable(), "{error} should be retryable");
    }
}

#[test]
fn test_errors_name_operation_and_subject() {
    let error = CredentialError::Upsert {
        name: "keycloak-postgres".to_string(),
        secret: SecretRef::new("keycloak-db-secret", "rhsso"),
        source: anyhow::anyhow!("409 Conflict"),
    };

    let message = error.to_string();
    assert!(message.contains("rhsso/keycloak-db-secret"));
    assert!(message.contains("keycloak-postgres"));
    // Cause stays reachable for logging
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_status_reason_for_terminal_and_transient_failures() {
    let terminal = ReconcilerError::from(CredentialError::ProvisioningFailed {
        name: "keycloak-postgres".to_string(),
        message: None,
    });
    let transient = ReconcilerError::from(CredentialError::FetchCredentials {
        name: "keycloak-postgres".to_string(),
        secret: secret_ref(),
        source: anyhow::anyhow!("timeout"),
    });
    let invalid = ReconcilerError::InvalidInstallation("targetNamespace cannot be empty".into());

    assert_eq!(failure_reason(&terminal), "ProvisioningFailed");
    assert_eq!(failure_reason(&transient), "ReconciliationFailed");
    assert_eq!(failure_reason(&invalid), "InvalidInstallation");
    assert_eq!(transient.reason(), "CredentialFetchFailed");
}

#[test]
fn test_backoff_calculation_fibonacci_sequence() {
    let mut backoff = FibonacciBackoff::new(1, 10);
    let expected_minutes = [1, 1, 2, 3, 5, 8, 10, 10, 10];

    for (step, minutes) in expected_minutes.into_iter().enumerate() {
        let delay = backoff.next_backoff();
        assert_eq!(
            delay,
            Duration::from_secs(minutes * 60),
            "step {step} should back off {minutes} minutes"
        );
    }
}

#[test]
fn test_backoff_is_tracked_per_installation() {
    let tracker = BackoffTracker::default();
    let fallback = Duration::from_secs(60);
    let a = BackoffTracker::key("team-a", "rhsso");
    let b = BackoffTracker::key("team-b", "rhsso");

    for _ in 0..4 {
        tracker.record_error(&a, fallback);
    }
    let (delay_b, count_b) = tracker.record_error(&b, fallback);

    assert_eq!(tracker.error_count(&a), 4);
    assert_eq!(count_b, 1);
    assert_eq!(delay_b, Duration::from_secs(60));

    tracker.reset(&a);
    assert_eq!(tracker.error_count(&a), 0);
}

#[test]
fn test_watch_error_classification() {
    let cases = [
        ("ApiError: Unauthorized: 401", WatchErrorKind::Unauthorized),
        ("ApiError: Expired: too old resource version", WatchErrorKind::Expired),
        ("ApiError: 410 Gone", WatchErrorKind::Expired),
        ("ApiError: TooManyRequests (429)", WatchErrorKind::TooManyRequests),
        ("ApiError: installations.credential-bridge.microscaler.io not found", WatchErrorKind::NotFound),
        ("hyper: connection closed before message completed", WatchErrorKind::Other),
    ];

    for (message, expected) in cases {
        assert_eq!(classify_watch_error(message), expected, "message: {message}");
    }
}
