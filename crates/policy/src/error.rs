//! Error types for the policy crate.

use thiserror::Error;

/// Errors from reading or seeding preferences.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// The stored value has a different type than requested.
    #[error("preference {key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// The backing store could not be read.
    #[error("preference store unavailable: {0}")]
    Unavailable(String),

    /// Seed data could not be parsed.
    #[error("invalid preference data: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// A platform collaborator rejected a request.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("wake lock request failed: {0}")]
    WakeLock(String),

    #[error("audio route change failed: {0}")]
    AudioRoute(String),

    #[error("telephony request failed: {0}")]
    Telephony(String),
}
