//! Session layer.
//!
//! The persistent session manager and the one-shot fire-and-forget sender.
//! Both drive the transport through the abstract
//! [`Dialer`](crate::transport::Dialer) capability.

// ============================================================================
// Submodules
// ============================================================================

/// Persistent device session manager.
pub mod manager;

/// One-shot fire-and-forget sender.
pub mod oneshot;

// ============================================================================
// Re-exports
// ============================================================================

pub use manager::{ConnectionStatus, SessionManager, SessionManagerBuilder};
pub use oneshot::{ONE_SHOT_TIMEOUT, OneShotSender};
