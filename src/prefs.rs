//! Durable connection and device preferences.
//!
//! A small JSON key-value file holding what must survive a restart: the
//! last device endpoint, the last active display mode, and the schedule
//! window. Read at startup, written through on change.
//!
//! The store is a cheap cloneable handle over shared state. Access is
//! last-write-wins with no cross-process locking: writes are infrequent
//! user-driven settings changes, and device-driven and user-driven writes
//! never race on the same key in practice.
//!
//! # Example
//!
//! ```no_run
//! use wordclock_link::{Endpoint, PreferenceStore};
//!
//! # fn example() -> wordclock_link::Result<()> {
//! let store = PreferenceStore::open_default()?;
//! let endpoint = store.endpoint();
//! store.set_endpoint(&Endpoint::new("192.168.3.40", 81)?)?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::endpoint::{DEFAULT_HOST, DEFAULT_PORT, Endpoint};
use crate::error::{Error, Result};
use crate::protocol::{ModeTag, Schedule};

// ============================================================================
// Constants
// ============================================================================

/// Directory name under the platform config dir.
const APP_DIR: &str = "wordclock-link";

/// Preference file name.
const FILE_NAME: &str = "preferences.json";

// ============================================================================
// Preferences
// ============================================================================

/// On-disk preference schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Preferences {
    /// Last device host.
    #[serde(default = "default_host")]
    host: String,

    /// Last device port.
    #[serde(default = "default_port")]
    port: u16,

    /// Last active display mode (wire tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_mode: Option<String>,

    /// Whether the on/off schedule is enabled.
    #[serde(default)]
    schedule_enabled: bool,

    /// Hour the display turns on.
    #[serde(default = "default_start_hour")]
    start_hour: u8,

    /// Minute the display turns on.
    #[serde(default = "default_start_minute")]
    start_minute: u8,

    /// Hour the display turns off.
    #[serde(default = "default_end_hour")]
    end_hour: u8,

    /// Minute the display turns off.
    #[serde(default = "default_end_minute")]
    end_minute: u8,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_start_hour() -> u8 {
    21
}

const fn default_start_minute() -> u8 {
    45
}

const fn default_end_hour() -> u8 {
    6
}

const fn default_end_minute() -> u8 {
    35
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            last_mode: None,
            schedule_enabled: false,
            start_hour: default_start_hour(),
            start_minute: default_start_minute(),
            end_hour: default_end_hour(),
            end_minute: default_end_minute(),
        }
    }
}

// ============================================================================
// PreferenceStore
// ============================================================================

/// Handle to the preference file.
///
/// Clones share one in-memory cache; every setter writes the file through.
#[derive(Clone)]
pub struct PreferenceStore {
    /// Shared path + cache.
    inner: Arc<StoreInner>,
}

/// Shared state behind the handle.
struct StoreInner {
    /// Preference file location.
    path: PathBuf,

    /// In-memory copy of the file contents.
    cache: Mutex<Preferences>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PreferenceStore {
    /// Opens the store at an explicit path.
    ///
    /// A missing file yields defaults; the file is created on first write.
    /// A corrupt file is replaced by defaults with a warning rather than
    /// failing startup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if an existing file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let prefs = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt preference file, using defaults");
                    Preferences::default()
                }
            }
        } else {
            debug!(path = %path.display(), "No preference file yet, using defaults");
            Preferences::default()
        };

        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                cache: Mutex::new(prefs),
            }),
        })
    }

    /// Opens the store at the platform default location.
    ///
    /// `<config dir>/wordclock-link/preferences.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the platform config directory cannot be
    /// determined.
    pub fn open_default() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| Error::store("no platform config directory available"))?;
        Self::open(base.join(APP_DIR).join(FILE_NAME))
    }

    /// Returns the preference file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl PreferenceStore {
    /// Returns the stored endpoint, or the factory default if the stored
    /// values no longer validate.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        let cache = self.inner.cache.lock();
        Endpoint::new(cache.host.clone(), cache.port).unwrap_or_default()
    }

    /// Returns the last active display mode, if one was ever recorded.
    #[must_use]
    pub fn last_mode(&self) -> Option<ModeTag> {
        let cache = self.inner.cache.lock();
        cache.last_mode.as_deref().and_then(ModeTag::parse)
    }

    /// Returns the stored schedule window.
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        let cache = self.inner.cache.lock();
        Schedule {
            enabled: cache.schedule_enabled,
            start_hour: cache.start_hour,
            start_minute: cache.start_minute,
            end_hour: cache.end_hour,
            end_minute: cache.end_minute,
        }
    }
}

// ============================================================================
// Mutators
// ============================================================================

impl PreferenceStore {
    /// Persists the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set_endpoint(&self, endpoint: &Endpoint) -> Result<()> {
        let mut cache = self.inner.cache.lock();
        cache.host = endpoint.host().to_string();
        cache.port = endpoint.port();
        self.save(&cache)
    }

    /// Persists the last active display mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set_last_mode(&self, mode: ModeTag) -> Result<()> {
        let mut cache = self.inner.cache.lock();
        cache.last_mode = Some(mode.wire_name().to_string());
        self.save(&cache)
    }

    /// Persists the schedule window.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set_schedule(&self, schedule: &Schedule) -> Result<()> {
        let mut cache = self.inner.cache.lock();
        cache.schedule_enabled = schedule.enabled;
        cache.start_hour = schedule.start_hour;
        cache.start_minute = schedule.start_minute;
        cache.end_hour = schedule.end_hour;
        cache.end_minute = schedule.end_minute;
        self.save(&cache)
    }

    /// Writes the cache to disk.
    fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.inner.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.inner.path, json)?;
        debug!(path = %self.inner.path.display(), "Preferences saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
