//! Identity types shared by every identity backend.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCode;

// =============================================================================
// IDENTITY
// =============================================================================

/// Profile attributes attached to an identity at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// An authenticated principal as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Service-assigned user identifier.
    pub id: Uuid,
    /// Login email, when the service exposes one.
    #[serde(default)]
    pub email: Option<String>,
    /// Profile metadata supplied at sign-up.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl Identity {
    /// Name to show for this principal: the profile name, else the local
    /// part of the email, else `"guest"`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if let Some(name) = self.user_metadata.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name;
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.trim().is_empty())
            .unwrap_or("guest")
    }
}

/// Profile fields forwarded to the identity service when creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpProfile {
    pub display_name: String,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Session transition reported through the change channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityEvent {
    /// Delivered once to a listener when it registers.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl IdentityEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
        }
    }
}

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity service operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The HTTP request could not be completed (network, timeout).
    #[error("identity request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("identity service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("identity response parse failed: {0}")]
    Parse(String),

    /// The operation needs a signed-in session and none is held.
    #[error("no active session")]
    NoSession,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for IdentityError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_IDENTITY_REQUEST",
            Self::Rejected { .. } => "E_IDENTITY_REJECTED",
            Self::Parse(_) => "E_IDENTITY_PARSE",
            Self::NoSession => "E_NO_SESSION",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Rejected { status: 429 | 500..=599, .. })
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
