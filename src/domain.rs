use std::fmt;

use chrono::FixedOffset;
use serde::Serialize;

use crate::errors::{HeliartError, ValidationErrorKind};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Latitude(f64);

impl Latitude {
    pub fn new(lat: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Latitude must be between -90.0 and 90.0 degrees. Found '{lat}'"
            ));
        }
        Ok(Self(lat))
    }

    pub fn parse(lat: &str) -> Result<Self, String> {
        let lat = lat
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Latitude must be a number. Found '{lat}'"))?;
        Self::new(lat)
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Longitude(f64);

impl Longitude {
    pub fn new(lon: f64) -> Result<Self, String> {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!(
                "Longitude must be between -180.0 and 180.0 degrees. Found '{lon}'"
            ));
        }
        Ok(Self(lon))
    }

    pub fn parse(lon: &str) -> Result<Self, String> {
        let lon = lon
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Longitude must be a number. Found '{lon}'"))?;
        Self::new(lon)
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: Latitude,
    pub longitude: Longitude,
}

impl Coordinates {
    pub fn new(latitude: Latitude, longitude: Longitude) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Six fractional digits, the format the coordinate cache persists.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude.0, self.longitude.0)
    }
}

/// Minutes elapsed since local midnight, always in `[0, 1440)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MinuteOfDay(u32);

impl MinuteOfDay {
    pub fn new(minute: u32) -> Option<Self> {
        (minute < MINUTES_PER_DAY).then_some(Self(minute))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Self::new(hour * 60 + minute)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// The clock formats the sunrise/sunset service can answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockFormat {
    /// `HH:MM:SS`
    #[default]
    TwentyFourHour,
    /// `H:MM:SS AM`
    TwelveHour,
}

impl ClockFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            ClockFormat::TwentyFourHour => "%H:%M:%S",
            ClockFormat::TwelveHour => "%I:%M:%S %p",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ClockFormat::TwentyFourHour => "HH:MM:SS",
            ClockFormat::TwelveHour => "H:MM:SS AM/PM",
        }
    }

    /// Value of the `time_format` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            ClockFormat::TwentyFourHour => "24",
            ClockFormat::TwelveHour => "12",
        }
    }
}

/// Sunrise and sunset at a location, in that location's local time.
#[derive(Debug, Clone, PartialEq)]
pub struct SunTimes {
    pub sunrise: MinuteOfDay,
    pub sunset: MinuteOfDay,
    pub utc_offset: FixedOffset,
}

impl SunTimes {
    pub fn new(
        sunrise: MinuteOfDay,
        sunset: MinuteOfDay,
        utc_offset_minutes: i32,
    ) -> Result<Self, HeliartError> {
        // A sunset past local midnight would need a wraparound model the angle engine doesn't have.
        if sunset < sunrise {
            return Err(ValidationErrorKind::InvertedSunWindow { sunrise, sunset }.into());
        }
        let utc_offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ValidationErrorKind::InvalidUtcOffset(utc_offset_minutes))?;
        Ok(Self {
            sunrise,
            sunset,
            utc_offset,
        })
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset.local_minus_utc() / 60
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Show { json: bool, watch: bool },
    Locate { json: bool },
    Forget,
}
