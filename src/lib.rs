//! Stayfinder client core.
//!
//! ARCHITECTURE
//! ============
//! - `session`: the process-wide auth session, mirrored from the identity
//!   service and published to any number of readers.
//! - `identity`: the identity service capability and its hosted-API adapter.
//! - `listings`: listing rows and the curated featured-listings selection.
//! - `config`: backend settings from the environment.

pub mod config;
pub mod error;
pub mod identity;
pub mod listings;
pub mod session;

pub use error::ErrorCode;
pub use session::{Session, SessionError, SessionHandle, SessionSynchronizer};
