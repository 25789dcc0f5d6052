//! Transport layer.
//!
//! Abstract frame-link capability plus the production WebSocket dialer.
//! The session manager owns exactly one link at a time; consumers never
//! touch the transport directly.

// ============================================================================
// Submodules
// ============================================================================

/// Transport capability traits.
pub mod link;

/// WebSocket transport implementation.
pub mod ws;

// ============================================================================
// Re-exports
// ============================================================================

pub use link::{Dialer, FrameLink};
pub use ws::WsDialer;
