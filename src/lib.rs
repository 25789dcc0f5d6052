//! wordclock-link - Session manager for ESP32 word-clock devices.
//!
//! This library maintains a persistent WebSocket session with a word-clock
//! device, multiplexes its line-oriented text protocol into typed state
//! streams, and reconciles that state with locally persisted preferences.
//!
//! # Architecture
//!
//! The session manager is the single owner of the connection and all
//! derived state:
//!
//! - One actor task holds the transport link; every public call is a
//!   message into its queue (no locks, strict ordering)
//! - The codec is pure: frames in, typed events out, commands in, frames
//!   out
//! - Consumers only read: watch channels for last-value state, a broadcast
//!   channel for the raw line stream
//! - Malformed frames are dropped, never raised; transport failures become
//!   status transitions, never faults
//!
//! # Quick Start
//!
//! ```no_run
//! use wordclock_link::{Command, ModeTag, SessionManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = SessionManager::new();
//!     session.connect();
//!
//!     let mut status = session.watch_status();
//!     let _ = status.changed().await;
//!
//!     session.send_command(&Command::Mode(ModeTag::Digital));
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`endpoint`] | Device addressing and validation |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`prefs`] | Durable preference store |
//! | [`protocol`] | Wire codec: commands, events, mode tags |
//! | [`session`] | Session manager and one-shot sender |
//! | [`transport`] | Frame-link capability and WebSocket dialer |

// ============================================================================
// Modules
// ============================================================================

/// Device addressing.
///
/// [`Endpoint`] identifies the device to dial; equality drives connect
/// idempotence.
pub mod endpoint;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Durable connection and device preferences.
///
/// Read at startup, written through on change, survives restarts.
pub mod prefs;

/// Wire protocol codec.
///
/// Stateless parsing of inbound frames and serialization of outbound
/// commands.
pub mod protocol;

/// Session layer.
///
/// The persistent [`SessionManager`] and the one-shot [`OneShotSender`].
pub mod session;

/// Transport layer.
///
/// Abstract frame-link capability plus the production WebSocket dialer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Addressing
pub use endpoint::{DEFAULT_HOST, DEFAULT_PORT, Endpoint};

// Error types
pub use error::{Error, Result};

// Preferences
pub use prefs::PreferenceStore;

// Protocol types
pub use protocol::{Command, DeviceSettings, ModeTag, ParsedEvent, Rgb, Schedule, parse_line};

// Session types
pub use session::{
    ConnectionStatus, ONE_SHOT_TIMEOUT, OneShotSender, SessionManager, SessionManagerBuilder,
};

// Transport types
pub use transport::{Dialer, FrameLink, WsDialer};
