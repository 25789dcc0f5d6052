//! One-shot fire-and-forget sender.
//!
//! Out-of-process triggers (a home-screen widget, a shell script, an
//! automation hook) have no session to reuse: they dial, send one frame,
//! and hang up. [`OneShotSender`] bounds the whole open→send→close sequence
//! with a single timeout and reports success as a plain boolean; no error
//! ever propagates to the trigger.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::prefs::PreferenceStore;
use crate::protocol::Command;
use crate::transport::{Dialer, WsDialer};

// ============================================================================
// Constants
// ============================================================================

/// Overall budget for one open→send→close round.
pub const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// OneShotSender
// ============================================================================

/// Connect→send→close helper with a bounded overall runtime.
pub struct OneShotSender {
    /// Transport dialer.
    dialer: Arc<dyn Dialer>,

    /// Overall budget for one send.
    timeout: Duration,
}

impl OneShotSender {
    /// Creates a sender with the production WebSocket transport.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dialer(Arc::new(WsDialer::new()))
    }

    /// Creates a sender over a specific dialer.
    #[must_use]
    pub fn with_dialer(dialer: Arc<dyn Dialer>) -> Self {
        Self {
            dialer,
            timeout: ONE_SHOT_TIMEOUT,
        }
    }

    /// Replaces the overall timeout budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends one frame to the endpoint.
    ///
    /// Returns `true` when the frame was handed to the transport and the
    /// link closed within the budget; `false` on timeout or any failure.
    pub async fn send(&self, endpoint: &Endpoint, frame: &str) -> bool {
        match timeout(self.timeout, self.send_inner(endpoint, frame)).await {
            Ok(Ok(())) => {
                debug!(endpoint = %endpoint, frame, "One-shot send delivered");
                true
            }
            Ok(Err(e)) => {
                warn!(endpoint = %endpoint, error = %e, "One-shot send failed");
                false
            }
            Err(_) => {
                warn!(
                    endpoint = %endpoint,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "One-shot send timed out"
                );
                false
            }
        }
    }

    /// Serializes and sends one command to the endpoint.
    pub async fn send_command(&self, endpoint: &Endpoint, command: &Command) -> bool {
        self.send(endpoint, &command.to_frame()).await
    }

    /// Sends one frame to the endpoint recorded in the preference store.
    pub async fn send_stored(&self, store: &PreferenceStore, frame: &str) -> bool {
        self.send(&store.endpoint(), frame).await
    }

    /// The unbounded open→send→close sequence.
    async fn send_inner(&self, endpoint: &Endpoint, frame: &str) -> Result<()> {
        let mut link = self.dialer.dial(endpoint).await?;
        link.send(frame).await?;
        link.close().await?;
        Ok(())
    }
}

impl Default for OneShotSender {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
