//! Connect to a device and watch every state stream.
//!
//! Demonstrates:
//! - Opening a session against a configurable endpoint
//! - Observing connection status, settings, temperature, and schedule
//! - Tapping the raw line stream for protocol debugging
//!
//! Usage:
//!   cargo run --example watch_device
//!   cargo run --example watch_device -- 192.168.3.219 81

// ============================================================================
// Imports
// ============================================================================

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wordclock_link::{Command, Endpoint, ModeTag, SessionManager};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let endpoint = match (args.next(), args.next()) {
        (Some(host), Some(port)) => {
            let port = port.parse().context("port must be an integer")?;
            Endpoint::new(host, port)?
        }
        _ => Endpoint::default(),
    };

    println!("=== watch_device: {endpoint} ===\n");

    let session = SessionManager::builder().endpoint(endpoint).spawn();
    session.connect();

    // ========================================================================
    // Stream Observers
    // ========================================================================

    let mut status = session.watch_status();
    let mut settings = session.watch_settings();
    let mut temperature = session.watch_temperature();
    let mut schedule = session.watch_schedule();
    let mut raw = session.subscribe_raw();

    let requester = session.clone();
    tokio::spawn(async move {
        // Ask for the temperature face once the session settles.
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        requester.send_command(&Command::Mode(ModeTag::Temperature));
    });

    loop {
        tokio::select! {
            changed = status.changed() => {
                changed.context("status stream ended")?;
                println!("[status]      {:?}", *status.borrow());
            }
            changed = settings.changed() => {
                changed.context("settings stream ended")?;
                if let Some(s) = *settings.borrow() {
                    println!(
                        "[settings]    mode={} color=({},{},{}) brightness={}",
                        s.mode, s.color.r, s.color.g, s.color.b, s.brightness
                    );
                }
            }
            changed = temperature.changed() => {
                changed.context("temperature stream ended")?;
                if let Some(t) = *temperature.borrow() {
                    println!("[temperature] {t}°C");
                }
            }
            changed = schedule.changed() => {
                changed.context("schedule stream ended")?;
                if let Some(s) = *schedule.borrow() {
                    println!(
                        "[schedule]    enabled={} {}:{:02}-{}:{:02}",
                        s.enabled, s.start_hour, s.start_minute, s.end_hour, s.end_minute
                    );
                }
            }
            frame = raw.recv() => {
                match frame {
                    Ok(line) => println!("[raw]         {line}"),
                    Err(_) => {} // lagged or closed; watch streams carry on
                }
            }
        }
    }
}
