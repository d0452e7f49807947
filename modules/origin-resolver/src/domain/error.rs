//! Domain errors for origin resolution.

use thiserror::Error;

/// Terminal, per-request errors. None of these are retried; retries, if
/// wanted, belong to the calling reverse proxy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The request origin is outside the policy perimeter.
    #[error("origin denied: {reason}")]
    PolicyDenied { reason: String },

    /// tailscaled could not be reached, or the lookup timed out.
    #[error("whois transport failure: {message}")]
    Transport { message: String },

    /// tailscaled answered 200 but the payload did not decode.
    #[error("malformed whois response: {message}")]
    Malformed { message: String },

    /// The inbound request carries no usable socket origin.
    #[error("invalid request origin: {message}")]
    InvalidOrigin { message: String },
}

impl DomainError {
    #[must_use]
    pub fn policy_denied(reason: impl Into<String>) -> Self {
        Self::PolicyDenied {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_origin(message: impl Into<String>) -> Self {
        Self::InvalidOrigin {
            message: message.into(),
        }
    }
}
