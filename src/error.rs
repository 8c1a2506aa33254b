//! Error taxonomy for the session controller.
//!
//! Every failure is surfaced to the action that initiated it; nothing here is
//! retried automatically. `code()` gives a stable identifier the UI can key on.

use crate::roles::{ModAction, Role};

/// Errors produced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Bad credentials.
    #[error("invalid username or password")]
    AuthFailed,

    /// Too many failed sign-in attempts.
    #[error("account locked after too many failed sign-in attempts")]
    AccountLocked,

    /// Unknown user, channel, or roster member.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Send or receive on a torn-down binding.
    #[error("connection closed")]
    ConnectionClosed,

    /// Redundant join.
    #[error("already a member of #{channel}")]
    AlreadyMember { channel: String },

    /// Moderation attempted without a sufficient role. Raised before dispatch.
    #[error("{action} on {target} not permitted for role {role}")]
    PermissionDenied { action: ModAction, role: Role, target: String },

    /// A REST body or stream payload could not be decoded.
    #[error("malformed response from {what}: {detail}")]
    MalformedResponse { what: String, detail: String },

    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid context: {0}")]
    InvalidContext(String),

    /// The underlying duplex connection could not be opened.
    #[error("could not connect to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-success status with no more specific mapping.
    #[error("server returned status {status} for {path}")]
    Server { status: u16, path: String },
}

impl SessionError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthFailed => "E_AUTH_FAILED",
            Self::AccountLocked => "E_ACCOUNT_LOCKED",
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::ConnectionClosed => "E_CONNECTION_CLOSED",
            Self::AlreadyMember { .. } => "E_ALREADY_MEMBER",
            Self::PermissionDenied { .. } => "E_PERMISSION_DENIED",
            Self::MalformedResponse { .. } => "E_MALFORMED_RESPONSE",
            Self::NotSignedIn => "E_NOT_SIGNED_IN",
            Self::InvalidContext(_) => "E_INVALID_CONTEXT",
            Self::ConnectionFailed { .. } => "E_CONNECTION_FAILED",
            Self::Config(_) => "E_CONFIG",
            Self::Http(_) => "E_HTTP",
            Self::Server { .. } => "E_SERVER",
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub(crate) fn malformed(what: impl Into<String>, detail: impl ToString) -> Self {
        Self::MalformedResponse { what: what.into(), detail: detail.to_string() }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
