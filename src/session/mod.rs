//! Locally published authentication session.
//!
//! DESIGN
//! ======
//! A [`Session`] is a plain value: who is signed in, and whether an auth
//! operation is still outstanding. The [`SessionSynchronizer`] is its only
//! writer and publishes whole values, so readers never see a half-applied
//! update.

pub mod synchronizer;

pub use synchronizer::{SessionHandle, SessionSynchronizer};

use crate::error::ErrorCode;
use crate::identity::{Identity, IdentityError};

/// Published belief about the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// `None` means no authenticated user.
    pub identity: Option<Identity>,
    /// True while an auth operation (initial lookup included) is in flight.
    pub is_resolving: bool,
}

impl Session {
    /// State before the initial identity lookup completes.
    #[must_use]
    pub fn pending() -> Self {
        Self { identity: None, is_resolving: true }
    }

    /// Resolved, anonymous state.
    #[must_use]
    pub fn empty() -> Self {
        Self { identity: None, is_resolving: false }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// The signed-in principal, once resolution has settled.
    #[must_use]
    pub fn settled_identity(&self) -> Option<&Identity> {
        if self.is_resolving { None } else { self.identity.as_ref() }
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No identity service is configured.
    #[error("identity service not configured")]
    Configuration,

    /// The identity service rejected or failed the operation.
    #[error("authentication failed: {reason}")]
    Authentication { reason: String, retryable: bool },

    /// The session was used after its synchronizer was disposed.
    #[error("session used outside a live synchronizer")]
    IllegalUse,
}

impl SessionError {
    pub(crate) fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication { reason: reason.into(), retryable: false }
    }
}

impl From<IdentityError> for SessionError {
    fn from(err: IdentityError) -> Self {
        let retryable = err.retryable();
        Self::Authentication { reason: err.to_string(), retryable }
    }
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration => "E_SESSION_CONFIG",
            Self::Authentication { .. } => "E_AUTHENTICATION",
            Self::IllegalUse => "E_ILLEGAL_USE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Authentication { retryable: true, .. })
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
