//! Maps the current time onto the Sun's position in its day/night cycle.
//!
//! Daytime (sunrise to sunset) is spread linearly over `[0, 180]` degrees and the remaining
//! dark span, which wraps through midnight, over `[180, 360)`. Sunrise is 0 degrees, solar
//! "noon" in the middle of the day span is 90 and sunset is 180.

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use super::domain::{MinuteOfDay, SunTimes, MINUTES_PER_DAY};

/// Returned for a day of zero length, where sunrise and sunset coincide.
pub const ZERO_LENGTH_DAY_ANGLE: f64 = 90.0;

pub const BUCKET_COUNT: usize = 16;
pub const BUCKET_WIDTH: f64 = 360.0 / BUCKET_COUNT as f64;

/// The minute of the day at a location with the given offset from UTC.
pub fn local_minute(utc_offset: FixedOffset, now: DateTime<Utc>) -> MinuteOfDay {
    let local = now.with_timezone(&utc_offset);
    // hour() < 24 and minute() < 60, so this is always a valid minute of the day.
    MinuteOfDay::from_hm(local.hour(), local.minute()).unwrap_or_default()
}

/// The Sun's angle for `current`, given that day's sunrise and sunset.
///
/// Assumes `sunrise <= sunset`. The result is always in `[0, 360)`.
pub fn angle_at(sunrise: MinuteOfDay, sunset: MinuteOfDay, current: MinuteOfDay) -> f64 {
    let (r, s, c) = (
        sunrise.get() as f64,
        sunset.get() as f64,
        current.get() as f64,
    );

    let angle = if sunrise <= current && current <= sunset {
        if sunrise == sunset {
            return ZERO_LENGTH_DAY_ANGLE;
        }
        (c - r) / (s - r) * 180.0
    } else {
        let total = MINUTES_PER_DAY as f64;
        let night_length = total - (s - r);
        let progress = if current < sunrise {
            (c + (total - s)) / night_length
        } else {
            (c - s) / night_length
        };
        180.0 + progress * 180.0
    };

    angle.rem_euclid(360.0)
}

/// Shift `now` into the location's local time and compute the Sun's angle.
pub fn compute_angle(
    sunrise: MinuteOfDay,
    sunset: MinuteOfDay,
    utc_offset: FixedOffset,
    now: DateTime<Utc>,
) -> f64 {
    angle_at(sunrise, sunset, local_minute(utc_offset, now))
}

impl SunTimes {
    pub fn angle_at(&self, now: DateTime<Utc>) -> f64 {
        compute_angle(self.sunrise, self.sunset, self.utc_offset, now)
    }
}

/// Index of the 22.5 degree wedge nearest to `angle`. 360 folds back onto bucket 0.
pub fn select_bucket(angle: f64) -> usize {
    (angle / BUCKET_WIDTH).round() as usize % BUCKET_COUNT
}
