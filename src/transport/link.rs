//! Transport capability traits.
//!
//! The session manager never touches a socket directly. It consumes the
//! transport as an abstract capability: a [`Dialer`] opens a full-duplex
//! [`FrameLink`] carrying one text frame per message. Production code wires
//! in [`WsDialer`](super::WsDialer); tests script stub links to drive the
//! session state machine without a device.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::endpoint::Endpoint;
use crate::error::Result;

// ============================================================================
// FrameLink
// ============================================================================

/// A full-duplex text-frame link to a device.
///
/// The link is exclusively owned by the session manager's actor task, so
/// all methods take `&mut self`; no internal locking is required.
#[async_trait]
pub trait FrameLink: Send {
    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is broken.
    async fn send(&mut self, frame: &str) -> Result<()>;

    /// Receives the next text frame.
    ///
    /// Returns `None` on clean close (remote close handshake or end of
    /// stream) and `Some(Err(_))` on a transport failure.
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Closes the link.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails; callers tearing down
    /// a session may ignore it.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// Dialer
// ============================================================================

/// Opens [`FrameLink`]s to device endpoints.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dials the endpoint and returns an open link.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable or the handshake
    /// fails.
    async fn dial(&self, endpoint: &Endpoint) -> Result<Box<dyn FrameLink>>;
}
