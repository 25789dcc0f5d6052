//! Device endpoint addressing.
//!
//! An [`Endpoint`] identifies the word-clock device to dial: an IPv4 host
//! plus a TCP port. The WebSocket path is fixed (`/ws`) by the firmware and
//! is not configurable.
//!
//! Endpoint equality drives connect idempotence in the session manager: a
//! `connect` against the endpoint already connected to is a no-op, anything
//! else tears down the old link and redials.
//!
//! # Example
//!
//! ```
//! use wordclock_link::Endpoint;
//!
//! let endpoint = Endpoint::new("192.168.3.219", 81).unwrap();
//! assert_eq!(endpoint.ws_url(), "ws://192.168.3.219:81/ws");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::Ipv4Addr;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Factory-default device address.
pub const DEFAULT_HOST: &str = "192.168.3.219";

/// Factory-default device port.
pub const DEFAULT_PORT: u16 = 81;

/// WebSocket path served by the firmware.
const WS_PATH: &str = "/ws";

// ============================================================================
// Endpoint
// ============================================================================

/// Host and port of a word-clock device.
///
/// Hosts are IPv4 dotted-quad strings (the device lives on the local
/// network; there is no DNS, TLS, or authentication involved).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// IPv4 address of the device.
    host: String,

    /// TCP port of the WebSocket listener.
    port: u16,
}

// ============================================================================
// Constructors
// ============================================================================

impl Endpoint {
    /// Creates a validated endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `host` is not an IPv4 dotted-quad or
    /// `port` is zero.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();

        if host.parse::<Ipv4Addr>().is_err() {
            return Err(Error::config(format!("invalid IPv4 address: {host}")));
        }
        if port == 0 {
            return Err(Error::config("port must be in 1-65535"));
        }

        Ok(Self { host, port })
    }
}

impl Default for Endpoint {
    /// Returns the factory-default device endpoint.
    #[inline]
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Endpoint {
    /// Returns the device host address.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the device port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL for this endpoint.
    ///
    /// Format: `ws://{host}:{port}/ws`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, WS_PATH)
    }

    /// Parses the WebSocket URL into a [`Url`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the URL cannot be parsed. Endpoints built
    /// through [`Endpoint::new`] always parse.
    pub fn parsed_ws_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.ws_url())?)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Tests
// ============================================================================
