//! Outbound command serialization.
//!
//! Commands are flat colon/comma-joined ASCII lines, one per WebSocket text
//! frame. The set is closed: every control surface goes through [`Command`]
//! rather than hand-building frame strings.
//!
//! # Wire Format
//!
//! | Command | Frame |
//! |---------|-------|
//! | [`Command::GetSettings`] | `GET_SETTINGS` |
//! | [`Command::Mode`] | `MODE:<TAG>` |
//! | [`Command::SetMode`] | `SET_MODE:<TAG>` |
//! | [`Command::Color`] | `COLOR:<r>,<g>,<b>,<brightness>` |
//! | [`Command::TimerStart`] | `TIMER:START:<totalSeconds>` |
//! | [`Command::TimerStop`] | `TIMER:STOP` |
//! | [`Command::TimerReset`] | `TIMER:RESET` |
//! | [`Command::ScheduleOn`] | `SCHEDULE:ON,<H>:<M>,<H>:<M>` |
//! | [`Command::ScheduleOff`] | `SCHEDULE:OFF` |
//! | [`Command::MatrixSet`] | `MATRIX_SET:<row>,<col>,<r>,<g>,<b>,<brightness>` |
//! | [`Command::MatrixClear`] | `MATRIX_CLEAR:<row>,<col>` |
//!
//! Times are unpadded (`7:5`, not `07:05`); the firmware parses integers,
//! not fixed-width fields.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use super::mode::ModeTag;

// ============================================================================
// Command
// ============================================================================

/// An outbound device command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Requests the current settings snapshot.
    ///
    /// The device does not push state unsolicited on connect; clients pull
    /// with this immediately after the session opens.
    GetSettings,

    /// Switches the display mode.
    Mode(ModeTag),

    /// Switches the display mode (alternate verb some firmware revisions
    /// expect).
    SetMode(ModeTag),

    /// Sets display color and brightness.
    Color {
        /// Red channel.
        r: u8,
        /// Green channel.
        g: u8,
        /// Blue channel.
        b: u8,
        /// Brightness, 0–255.
        brightness: u8,
    },

    /// Starts the countdown timer.
    TimerStart {
        /// Total countdown length in seconds.
        total_seconds: u32,
    },

    /// Stops the countdown timer.
    TimerStop,

    /// Resets the countdown timer.
    TimerReset,

    /// Enables the on/off schedule with the given window.
    ScheduleOn {
        /// Hour the display turns on.
        start_hour: u8,
        /// Minute the display turns on.
        start_minute: u8,
        /// Hour the display turns off.
        end_hour: u8,
        /// Minute the display turns off.
        end_minute: u8,
    },

    /// Disables the on/off schedule.
    ScheduleOff,

    /// Lights a single matrix cell.
    MatrixSet {
        /// Cell row.
        row: u8,
        /// Cell column.
        col: u8,
        /// Red channel.
        r: u8,
        /// Green channel.
        g: u8,
        /// Blue channel.
        b: u8,
        /// Brightness, 0–255.
        brightness: u8,
    },

    /// Clears a single matrix cell.
    MatrixClear {
        /// Cell row.
        row: u8,
        /// Cell column.
        col: u8,
    },
}

// ============================================================================
// Serialization
// ============================================================================

impl Command {
    /// Serializes the command into its wire frame.
    #[must_use]
    pub fn to_frame(&self) -> String {
        match *self {
            Self::GetSettings => "GET_SETTINGS".to_string(),
            Self::Mode(tag) => format!("MODE:{}", tag.wire_name()),
            Self::SetMode(tag) => format!("SET_MODE:{}", tag.wire_name()),
            Self::Color { r, g, b, brightness } => {
                format!("COLOR:{r},{g},{b},{brightness}")
            }
            Self::TimerStart { total_seconds } => format!("TIMER:START:{total_seconds}"),
            Self::TimerStop => "TIMER:STOP".to_string(),
            Self::TimerReset => "TIMER:RESET".to_string(),
            Self::ScheduleOn {
                start_hour,
                start_minute,
                end_hour,
                end_minute,
            } => format!("SCHEDULE:ON,{start_hour}:{start_minute},{end_hour}:{end_minute}"),
            Self::ScheduleOff => "SCHEDULE:OFF".to_string(),
            Self::MatrixSet {
                row,
                col,
                r,
                g,
                b,
                brightness,
            } => format!("MATRIX_SET:{row},{col},{r},{g},{b},{brightness}"),
            Self::MatrixClear { row, col } => format!("MATRIX_CLEAR:{row},{col}"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_frame())
    }
}

// ============================================================================
// Tests
// ============================================================================
