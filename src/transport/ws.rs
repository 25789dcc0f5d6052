//! WebSocket transport.
//!
//! [`WsDialer`] opens `ws://<host>:<port>/ws` connections to the device and
//! adapts the tungstenite message stream to the [`FrameLink`] contract:
//! text frames pass through, binary/ping/pong frames are skipped, and the
//! close handshake maps to clean end-of-stream.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::endpoint::Endpoint;
use crate::error::Result;

use super::link::{Dialer, FrameLink};

// ============================================================================
// WsDialer
// ============================================================================

/// Production dialer over tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

impl WsDialer {
    /// Creates a new dialer.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Box<dyn FrameLink>> {
        let url = endpoint.parsed_ws_url()?;
        let (stream, _response) = connect_async(url.as_str()).await?;

        debug!(endpoint = %endpoint, "WebSocket connection opened");

        Ok(Box::new(WsLink { stream }))
    }
}

// ============================================================================
// WsLink
// ============================================================================

/// A live WebSocket link to the device.
struct WsLink {
    /// Underlying message stream.
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameLink for WsLink {
    async fn send(&mut self, frame: &str) -> Result<()> {
        self.stream
            .send(Message::Text(frame.to_string().into()))
            .await?;
        trace!(frame, "Frame sent");
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.to_string())),

                Some(Ok(Message::Close(_))) => {
                    debug!("WebSocket closed by remote");
                    return None;
                }

                // Ignore Binary, Ping, Pong, raw frames.
                Some(Ok(_)) => continue,

                Some(Err(e)) => return Some(Err(e.into())),

                None => {
                    debug!("WebSocket stream ended");
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
