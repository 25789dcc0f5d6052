//! Display mode tags.
//!
//! The device renders exactly one mode at a time. Mode tags appear in two
//! places on the wire: as the first field of inbound `SETTINGS:` frames and
//! in outbound `MODE:`/`SET_MODE:` commands.
//!
//! Firmware revisions disagree on the temperature tag (`TEMP` vs
//! `TEMPERATURE`), so inbound parsing goes through an alias table rather
//! than a direct name match. Outbound commands always use the short legacy
//! form the firmware accepts everywhere.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

// ============================================================================
// ModeTag
// ============================================================================

/// Enumerated display mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeTag {
    /// Word-matrix clock face.
    Clock,

    /// Seven-segment style digit face.
    Digital,

    /// Ambient temperature readout.
    Temperature,

    /// Alarm / countdown timer face.
    Alarm,

    /// Free-form LED matrix canvas.
    Matrix,
}

// ============================================================================
// Alias Table
// ============================================================================

/// Inbound tag spellings, including legacy aliases.
///
/// New aliases are a data change here, not a code change.
static ALIASES: &[(&str, ModeTag)] = &[
    ("CLOCK", ModeTag::Clock),
    ("DIGITAL", ModeTag::Digital),
    ("TEMPERATURE", ModeTag::Temperature),
    ("TEMP", ModeTag::Temperature),
    ("ALARM", ModeTag::Alarm),
    ("MATRIX", ModeTag::Matrix),
];

static ALIAS_MAP: LazyLock<FxHashMap<&'static str, ModeTag>> =
    LazyLock::new(|| ALIASES.iter().copied().collect());

// ============================================================================
// Parsing and Formatting
// ============================================================================

impl ModeTag {
    /// Parses a wire tag, accepting legacy aliases case-insensitively.
    ///
    /// Returns `None` for tags no firmware revision emits.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        ALIAS_MAP.get(tag.trim().to_ascii_uppercase().as_str()).copied()
    }

    /// Returns the tag used in outbound commands.
    ///
    /// Always the short legacy spelling (`TEMP`, not `TEMPERATURE`).
    #[inline]
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Clock => "CLOCK",
            Self::Digital => "DIGITAL",
            Self::Temperature => "TEMP",
            Self::Alarm => "ALARM",
            Self::Matrix => "MATRIX",
        }
    }

    /// Returns the next mode in the quick-toggle cycle.
    ///
    /// One-shot triggers (e.g. a home-screen shortcut) cycle through the
    /// three glanceable faces only: Clock → Digital → Temperature → Clock.
    #[inline]
    #[must_use]
    pub const fn cycle_next(self) -> Self {
        match self {
            Self::Clock => Self::Digital,
            Self::Digital => Self::Temperature,
            _ => Self::Clock,
        }
    }
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ============================================================================
// Tests
// ============================================================================
