//! Inbound frame parsing and derived-state types.
//!
//! The device speaks a line-oriented text protocol: one frame per WebSocket
//! text message, colon-delimited prefix dispatch. Parsing is pure and
//! stateless; the session manager applies the resulting events to its
//! derived state.
//!
//! # Inbound Grammar
//!
//! | Prefix | Payload | Event |
//! |--------|---------|-------|
//! | `SETTINGS:` | `mode,r,g,b,brightness` | [`ParsedEvent::Settings`] |
//! | `TEMP:` | integer | [`ParsedEvent::Temperature`] |
//! | `SCHEDULE:OFF` | — | [`ParsedEvent::Schedule`] (disabled sentinel) |
//! | `SCHEDULE:ON,H:M,H:M` | two times | [`ParsedEvent::Schedule`] |
//! | anything else | — | [`ParsedEvent::Raw`] |
//!
//! A known prefix with a malformed payload yields `None`: the channel is
//! noisy (a TCP fragment can surface as a truncated line), so bad frames are
//! dropped and the next status read repairs the state. Parse failures are
//! never errors.

// ============================================================================
// Imports
// ============================================================================

use super::mode::ModeTag;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of settings frames.
const SETTINGS_PREFIX: &str = "SETTINGS:";

/// Prefix of temperature frames.
const TEMP_PREFIX: &str = "TEMP:";

/// Prefix of schedule frames.
const SCHEDULE_PREFIX: &str = "SCHEDULE:";

/// Fallback color when an RGB field fails to parse.
const DEFAULT_COLOR: Rgb = Rgb::new(255, 0, 0);

/// Fallback brightness when the brightness field fails to parse.
const DEFAULT_BRIGHTNESS: f32 = 255.0;

// ============================================================================
// Rgb
// ============================================================================

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Creates a color from channel values.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

// ============================================================================
// DeviceSettings
// ============================================================================

/// Snapshot of the device's display settings.
///
/// Derived from the most recent `SETTINGS:` frame and overwritten wholesale
/// on each one; fields are never merged across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceSettings {
    /// Active display mode.
    pub mode: ModeTag,

    /// Display color.
    pub color: Rgb,

    /// Display brightness, 0.0–255.0.
    pub brightness: f32,
}

// ============================================================================
// Schedule
// ============================================================================

/// The device's on/off schedule window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Schedule {
    /// Whether the schedule is active.
    pub enabled: bool,

    /// Hour the display turns on.
    pub start_hour: u8,

    /// Minute the display turns on.
    pub start_minute: u8,

    /// Hour the display turns off.
    pub end_hour: u8,

    /// Minute the display turns off.
    pub end_minute: u8,
}

impl Schedule {
    /// Returns the disabled-schedule sentinel.
    ///
    /// Disabling resets the window to 07:00–22:00 rather than keeping the
    /// last real values; re-enabling starts from the factory window.
    #[inline]
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            start_hour: 7,
            start_minute: 0,
            end_hour: 22,
            end_minute: 0,
        }
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// A typed event decoded from one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// A `SETTINGS:` frame.
    Settings(DeviceSettings),

    /// A `TEMP:` frame, in integer degrees.
    Temperature(i32),

    /// A `SCHEDULE:` frame.
    Schedule(Schedule),

    /// A line matching no known prefix, passed through verbatim.
    Raw(String),
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses one inbound line into a typed event.
///
/// Returns `None` for a known prefix with a malformed payload (the frame is
/// dropped silently). Lines matching no prefix come back as
/// [`ParsedEvent::Raw`].
#[must_use]
pub fn parse_line(line: &str) -> Option<ParsedEvent> {
    if let Some(payload) = line.strip_prefix(SETTINGS_PREFIX) {
        return parse_settings(payload).map(ParsedEvent::Settings);
    }

    if let Some(payload) = line.strip_prefix(TEMP_PREFIX) {
        return payload.trim().parse::<i32>().ok().map(ParsedEvent::Temperature);
    }

    if let Some(payload) = line.strip_prefix(SCHEDULE_PREFIX) {
        return parse_schedule(payload).map(ParsedEvent::Schedule);
    }

    Some(ParsedEvent::Raw(line.to_string()))
}

/// Parses a `SETTINGS:` payload: `mode,r,g,b,brightness`.
///
/// Requires at least five comma fields. Individual numeric fields fall back
/// to the defaults on parse failure; an unknown mode tag drops the frame.
fn parse_settings(payload: &str) -> Option<DeviceSettings> {
    let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return None;
    }

    let mode = ModeTag::parse(fields[0])?;

    Some(DeviceSettings {
        mode,
        color: Rgb::new(
            parse_u8_or(fields[1], DEFAULT_COLOR.r),
            parse_u8_or(fields[2], DEFAULT_COLOR.g),
            parse_u8_or(fields[3], DEFAULT_COLOR.b),
        ),
        brightness: fields[4].parse::<f32>().unwrap_or(DEFAULT_BRIGHTNESS),
    })
}

/// Parses a `SCHEDULE:` payload: `OFF` or `ON,H:M,H:M`.
fn parse_schedule(payload: &str) -> Option<Schedule> {
    let payload = payload.trim();

    if payload == "OFF" {
        return Some(Schedule::disabled());
    }

    let times = payload.strip_prefix("ON,")?;
    let (start, end) = times.split_once(',')?;
    let (start_hour, start_minute) = parse_time(start)?;
    let (end_hour, end_minute) = parse_time(end)?;

    Some(Schedule {
        enabled: true,
        start_hour,
        start_minute,
        end_hour,
        end_minute,
    })
}

/// Parses an `H:M` pair. Both components must be integers.
fn parse_time(pair: &str) -> Option<(u8, u8)> {
    let (hour, minute) = pair.split_once(':')?;
    Some((
        hour.trim().parse::<u8>().ok()?,
        minute.trim().parse::<u8>().ok()?,
    ))
}

/// Parses a u8 field, falling back to `default` on failure.
#[inline]
fn parse_u8_or(field: &str, default: u8) -> u8 {
    field.parse::<u8>().unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_settings_full_frame() {
        let event = parse_line("SETTINGS:DIGITAL,0,255,0,128").expect("event");
        assert_eq!(
            event,
            ParsedEvent::Settings(DeviceSettings {
                mode: ModeTag::Digital,
                color: Rgb::new(0, 255, 0),
                brightness: 128.0,
            })
        );
    }

    #[test]
    fn test_settings_whitespace_trimmed() {
        // Firmware pads fields inconsistently.
        let event = parse_line("SETTINGS: DIGITAL, 255,0,255,200").expect("event");
        let ParsedEvent::Settings(settings) = event else {
            panic!("expected settings event");
        };
        assert_eq!(settings.mode, ModeTag::Digital);
        assert_eq!(settings.color, Rgb::new(255, 0, 255));
        assert_eq!(settings.brightness, 200.0);
    }

    #[test]
    fn test_settings_field_defaults() {
        // Each bad numeric field falls back independently.
        let event = parse_line("SETTINGS:CLOCK,x,y,z,nope").expect("event");
        let ParsedEvent::Settings(settings) = event else {
            panic!("expected settings event");
        };
        assert_eq!(settings.color, Rgb::new(255, 0, 0));
        assert_eq!(settings.brightness, 255.0);
    }

    #[test]
    fn test_settings_out_of_range_uses_default() {
        let event = parse_line("SETTINGS:CLOCK,300,12,12,90").expect("event");
        let ParsedEvent::Settings(settings) = event else {
            panic!("expected settings event");
        };
        assert_eq!(settings.color, Rgb::new(255, 12, 12));
    }

    #[test]
    fn test_settings_too_few_fields_dropped() {
        assert_eq!(parse_line("SETTINGS:CLOCK,1,2,3"), None);
        assert_eq!(parse_line("SETTINGS:"), None);
    }

    #[test]
    fn test_settings_unknown_mode_dropped() {
        assert_eq!(parse_line("SETTINGS:DISCO,1,2,3,4"), None);
    }

    #[test]
    fn test_settings_legacy_temperature_tag() {
        let event = parse_line("SETTINGS:TEMPERATURE,1,2,3,4").expect("event");
        let ParsedEvent::Settings(settings) = event else {
            panic!("expected settings event");
        };
        assert_eq!(settings.mode, ModeTag::Temperature);
    }

    #[test]
    fn test_temperature_frame() {
        assert_eq!(parse_line("TEMP:21"), Some(ParsedEvent::Temperature(21)));
        assert_eq!(parse_line("TEMP:-4"), Some(ParsedEvent::Temperature(-4)));
    }

    #[test]
    fn test_temperature_malformed_dropped() {
        assert_eq!(parse_line("TEMP:warm"), None);
        assert_eq!(parse_line("TEMP:"), None);
    }

    #[test]
    fn test_schedule_off_resets_to_sentinel() {
        let event = parse_line("SCHEDULE:OFF").expect("event");
        assert_eq!(event, ParsedEvent::Schedule(Schedule::disabled()));

        let ParsedEvent::Schedule(schedule) = event else {
            panic!("expected schedule event");
        };
        assert!(!schedule.enabled);
        assert_eq!((schedule.start_hour, schedule.start_minute), (7, 0));
        assert_eq!((schedule.end_hour, schedule.end_minute), (22, 0));
    }

    #[test]
    fn test_schedule_on_parses_both_times() {
        let event = parse_line("SCHEDULE:ON,7:30,21:15").expect("event");
        assert_eq!(
            event,
            ParsedEvent::Schedule(Schedule {
                enabled: true,
                start_hour: 7,
                start_minute: 30,
                end_hour: 21,
                end_minute: 15,
            })
        );
    }

    #[test]
    fn test_schedule_malformed_dropped() {
        assert_eq!(parse_line("SCHEDULE:ON,7:30"), None);
        assert_eq!(parse_line("SCHEDULE:ON,7:xx,21:15"), None);
        assert_eq!(parse_line("SCHEDULE:ON,730,2115"), None);
        // Legacy numeric form some firmware revisions emit.
        assert_eq!(parse_line("SCHEDULE:1,22,0,7,0"), None);
    }

    #[test]
    fn test_unmatched_line_is_raw() {
        assert_eq!(
            parse_line("GARBAGE_LINE"),
            Some(ParsedEvent::Raw("GARBAGE_LINE".to_string()))
        );
        assert_eq!(parse_line(""), Some(ParsedEvent::Raw(String::new())));
    }

    #[test]
    fn test_mode_round_trip_through_settings() {
        // A MODE command echoed back inside a SETTINGS frame recovers the tag.
        let frame = format!("SETTINGS:{},1,2,3,4", ModeTag::Clock.wire_name());
        let ParsedEvent::Settings(settings) = parse_line(&frame).expect("event") else {
            panic!("expected settings event");
        };
        assert_eq!(settings.mode, ModeTag::Clock);
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(line in ".*") {
            let _ = parse_line(&line);
        }

        #[test]
        fn prop_unknown_prefixes_pass_through(line in "[A-Z_]{1,12}") {
            prop_assume!(!line.starts_with("SETTINGS:"));
            prop_assume!(!line.starts_with("TEMP:"));
            prop_assume!(!line.starts_with("SCHEDULE:"));
            prop_assert_eq!(parse_line(&line), Some(ParsedEvent::Raw(line.clone())));
        }

        #[test]
        fn prop_valid_settings_always_parse(
            r in 0u8..=255,
            g in 0u8..=255,
            b in 0u8..=255,
            brightness in 0u16..=255,
        ) {
            let frame = format!("SETTINGS:CLOCK,{r},{g},{b},{brightness}");
            let parsed = parse_line(&frame);
            prop_assert_eq!(
                parsed,
                Some(ParsedEvent::Settings(DeviceSettings {
                    mode: ModeTag::Clock,
                    color: Rgb::new(r, g, b),
                    brightness: f32::from(brightness),
                }))
            );
        }
    }
}
