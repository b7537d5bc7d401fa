use std::{error, fmt, io, path::Path};

use crate::domain::MinuteOfDay;

/// The external services heliart talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Geocoding,
    SunTimes,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Geocoding => write!(f, "geocoding service"),
            Service::SunTimes => write!(f, "sunrise/sunset service"),
        }
    }
}

#[derive(Debug)]
pub enum HeliartError {
    Config(ConfigErrorKind),
    Fetch { service: Service, reason: String },
    Validation(ValidationErrorKind),
    Io { context: String, source: io::Error },
    Runtime(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorKind {
    MissingApiKey,
    EmptyPlace,
    InvalidTimeout,
}

impl ConfigErrorKind {
    fn as_str(&self) -> String {
        match self {
            ConfigErrorKind::MissingApiKey => {
                "Missing geocoding API key. Set the GEOCODEKEY environment variable or add 'geocode_key' to the config file".to_string()
            }
            ConfigErrorKind::EmptyPlace => "No place name was given to look up".to_string(),
            ConfigErrorKind::InvalidTimeout => {
                "Invalid timeout - must be a whole number of seconds greater than zero".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    InvalidClockTime { text: String, expected: &'static str },
    InvalidUtcOffset(i32),
    InvertedSunWindow {
        sunrise: MinuteOfDay,
        sunset: MinuteOfDay,
    },
    InvalidCachedCoordinates(String),
}

impl ValidationErrorKind {
    fn as_str(&self) -> String {
        match self {
            ValidationErrorKind::InvalidClockTime { text, expected } => {
                format!("Invalid clock time '{text}' - expected the format '{expected}'")
            }
            ValidationErrorKind::InvalidUtcOffset(minutes) => {
                format!("Invalid UTC offset of {minutes} minutes")
            }
            ValidationErrorKind::InvertedSunWindow { sunrise, sunset } => {
                format!("Sunset at {sunset} comes before sunrise at {sunrise}")
            }
            ValidationErrorKind::InvalidCachedCoordinates(content) => {
                format!("Cached coordinates '{content}' are not in the form '<lat>,<lon>'")
            }
        }
    }
}

impl HeliartError {
    pub fn fetch(service: Service, reason: impl Into<String>) -> Self {
        HeliartError::Fetch {
            service,
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        HeliartError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn file(action: &str, path: &Path, source: io::Error) -> Self {
        Self::io(format!("Failed to {action} '{}'", path.display()), source)
    }
}

impl fmt::Display for HeliartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeliartError::Config(err) => write!(f, "Config error: {}", err.as_str()),
            HeliartError::Fetch { service, reason } => {
                write!(f, "Request to the {service} failed: {reason}")
            }
            HeliartError::Validation(err) => write!(f, "Validation error: {}", err.as_str()),
            HeliartError::Io { context, source } => write!(f, "{context}: {source}"),
            HeliartError::Runtime(msg) => write!(f, "Runtime error: {msg}"),
        }
    }
}

impl error::Error for HeliartError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            HeliartError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigErrorKind> for HeliartError {
    fn from(err: ConfigErrorKind) -> Self {
        HeliartError::Config(err)
    }
}

impl From<ValidationErrorKind> for HeliartError {
    fn from(err: ValidationErrorKind) -> Self {
        HeliartError::Validation(err)
    }
}

impl From<tokio::task::JoinError> for HeliartError {
    fn from(err: tokio::task::JoinError) -> Self {
        HeliartError::Runtime(format!("background task did not complete: {err}"))
    }
}
