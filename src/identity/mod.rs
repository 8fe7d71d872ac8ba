//! Identity service capability.
//!
//! ARCHITECTURE
//! ============
//! The session synchronizer only talks to identity backends through the
//! [`IdentityService`] trait. `http` is the production adapter for the hosted
//! auth API; tests plug in an in-memory fake. Change notifications are
//! delivered through a [`ListenerRegistry`] owned by the backend.

pub mod http;
pub mod listeners;
pub mod types;

pub use http::HttpIdentityService;
pub use listeners::{IdentityHandler, ListenerId, ListenerRegistry, Subscription};
pub use types::{Identity, IdentityError, IdentityEvent, SignUpProfile, UserMetadata};

/// Remote authentication capability.
///
/// Operations report success or failure only; the resulting identity is
/// published through [`IdentityService::on_identity_change`].
#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Look up the identity behind the currently held session, if any.
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), IdentityError>;

    async fn sign_up(&self, email: &str, password: &str, profile: &SignUpProfile) -> Result<(), IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Register a change listener. Delivery stops when the returned
    /// subscription is cancelled or dropped.
    fn on_identity_change(&self, handler: IdentityHandler) -> Subscription;
}

// =============================================================================
// TEST HELPERS
// =============================================================================
