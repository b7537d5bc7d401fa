use chrono::{NaiveTime, Timelike};

use super::{
    domain::{ClockFormat, MinuteOfDay},
    errors::{HeliartError, ValidationErrorKind},
};

type Result<T> = std::result::Result<T, HeliartError>;

/// Parse a clock time such as `"18:30:00"` or `"6:30:00 PM"` into a minute of the day.
///
/// Seconds are validated but otherwise dropped.
pub fn parse_clock_time(text: &str, format: ClockFormat) -> Result<MinuteOfDay> {
    let invalid = || ValidationErrorKind::InvalidClockTime {
        text: text.to_string(),
        expected: format.describe(),
    };

    let time = NaiveTime::parse_from_str(text.trim(), format.pattern()).map_err(|_| invalid())?;
    Ok(MinuteOfDay::from_hm(time.hour(), time.minute()).ok_or_else(invalid)?)
}

/// Render a 24-hour `HH:MM:SS` time as `hh:mm AM` / `hh:mm PM`.
pub fn to_twelve_hour_clock(hhmmss: &str) -> Result<String> {
    let invalid = || ValidationErrorKind::InvalidClockTime {
        text: hhmmss.to_string(),
        expected: ClockFormat::TwentyFourHour.describe(),
    };

    let parts: Vec<&str> = hhmmss.split(':').collect();
    let [hours, minutes, seconds] = parts[..] else {
        return Err(invalid().into());
    };
    let is_numeric = |field: &str| !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit());
    if !(is_numeric(hours) && is_numeric(minutes) && is_numeric(seconds)) {
        return Err(invalid().into());
    }

    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    if hours > 23 {
        return Err(invalid().into());
    }

    let period = if hours >= 12 { "PM" } else { "AM" };
    let hours = match hours {
        0 => 12,
        13..=23 => hours - 12,
        h => h,
    };

    Ok(format!("{hours:02}:{minutes} {period}"))
}

impl MinuteOfDay {
    /// The minute as a 12-hour clock reading, e.g. `06:30 PM`.
    pub fn to_twelve_hour_clock(&self) -> String {
        let hhmmss = format!("{self}:00");
        // Display always yields a well-formed HH:MM below 24:00.
        to_twelve_hour_clock(&hhmmss).unwrap_or(hhmmss)
    }
}
