//! Shared error classification.
//!
//! DESIGN
//! ======
//! Every module owns its own `thiserror` enum. This trait gives callers a
//! stable machine-readable code and a retry hint without matching on each
//! concrete type.

/// Stable code + retry hint for an error surfaced to consumers.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
