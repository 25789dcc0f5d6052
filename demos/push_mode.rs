//! Widget-style one-shot mode push.
//!
//! Demonstrates:
//! - Reading the stored endpoint and last mode from the preference store
//! - Cycling Clock → Digital → Temperature like a home-screen widget
//! - Fire-and-forget delivery with a bounded timeout and boolean outcome
//!
//! Usage:
//!   cargo run --example push_mode
//!   cargo run --example push_mode -- MATRIX

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;
use wordclock_link::{Command, ModeTag, OneShotSender, PreferenceStore};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = PreferenceStore::open_default()?;

    // Explicit tag argument, or cycle onward from the last recorded mode.
    let mode = match std::env::args().nth(1) {
        Some(tag) => ModeTag::parse(&tag)
            .ok_or_else(|| anyhow::anyhow!("unknown mode tag: {tag}"))?,
        None => store.last_mode().unwrap_or(ModeTag::Clock).cycle_next(),
    };

    let endpoint = store.endpoint();
    println!("Pushing MODE:{mode} to {endpoint}...");

    let sender = OneShotSender::new();
    if sender.send_command(&endpoint, &Command::Mode(mode)).await {
        store.set_last_mode(mode)?;
        println!("✓ Delivered");
        Ok(())
    } else {
        println!("✗ Failed (device unreachable or timeout)");
        std::process::exit(1);
    }
}
