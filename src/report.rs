use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    art::ArtSource,
    calc,
    domain::{Coordinates, SunTimes},
    errors::HeliartError,
};

/// Where a set of coordinates came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Origin {
    Arguments,
    Cache,
    ConfigFile,
    Geocoded(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Arguments => write!(f, "command line"),
            Origin::Cache => write!(f, "cache"),
            Origin::ConfigFile => write!(f, "config file"),
            Origin::Geocoded(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub location: Coordinates,
    pub sunrise: String,
    pub sunset: String,
    pub utc_offset_minutes: i32,
    pub local_time: String,
    pub angle: f64,
    pub bucket: usize,
    #[serde(skip)]
    pub art: String,
}

impl Report {
    pub fn new(
        location: Coordinates,
        sun_times: &SunTimes,
        now: DateTime<Utc>,
        art: &ArtSource,
    ) -> Result<Self, HeliartError> {
        let angle = sun_times.angle_at(now);
        let bucket = calc::select_bucket(angle);
        tracing::debug!(angle, bucket, "sun position");

        Ok(Self {
            location,
            sunrise: sun_times.sunrise.to_twelve_hour_clock(),
            sunset: sun_times.sunset.to_twelve_hour_clock(),
            utc_offset_minutes: sun_times.utc_offset_minutes(),
            local_time: calc::local_minute(sun_times.utc_offset, now).to_twelve_hour_clock(),
            angle,
            bucket,
            art: art.load(bucket)?,
        })
    }

    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct WithArt<'a> {
            #[serde(flatten)]
            report: &'a Report,
            art: &'a str,
        }

        let with_art = WithArt {
            report: self,
            art: &self.art,
        };
        serde_json::json!(with_art).to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sunrise: {}", self.sunrise)?;
        writeln!(f, "Sunset:  {}", self.sunset)?;
        write!(f, "{}", self.art)
    }
}

#[derive(Debug, Serialize)]
pub struct LocateReport {
    pub location: Coordinates,
    pub origin: Origin,
}

impl fmt::Display for LocateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.location, self.origin)
    }
}
