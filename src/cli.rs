use std::{
    env, fs,
    path::{Path, PathBuf},
    result,
    time::Duration,
};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use super::{
    api::{self, ApiKey},
    art::ArtSource,
    cache::CoordinateCache,
    domain,
    errors::{ConfigErrorKind, HeliartError},
};

type Result<T, E = HeliartError> = result::Result<T, E>;

/// Environment variable holding the geocoding API key.
pub const API_KEY_VAR: &str = "GEOCODEKEY";

#[derive(Parser)]
#[clap(version, about)]
pub struct Cli {
    /// Set the latitude in decimal degrees. Positive values to the north; negative values to the south. Skips the
    /// coordinate cache and the geocoding service entirely
    #[clap(short = 'l', long = "latitude", requires = "longitude", allow_hyphen_values = true, value_parser = domain::Latitude::parse)]
    latitude: Option<domain::Latitude>,

    /// Set the longitude in decimal degrees. Positive values to the east; negative values to the west
    #[clap(short = 'o', long = "longitude", requires = "latitude", allow_hyphen_values = true, value_parser = domain::Longitude::parse)]
    longitude: Option<domain::Longitude>,

    /// Look up this place with the geocoding service, e.g. 'Malaga, Spain', and replace any cached coordinates
    #[clap(short = 'p', long = "place", conflicts_with = "latitude", value_parser)]
    place: Option<String>,

    /// Set the file the resolved coordinates are cached in. Defaults to 'heliart/coords.txt' in the user's cache directory
    #[clap(long = "cache-file", value_parser)]
    cache_file: Option<PathBuf>,

    /// Set the configuration file. Defaults to 'heliart.toml' in the user's config directory
    #[clap(long = "config", value_parser)]
    config: Option<PathBuf>,

    /// Read the artwork from this directory instead of using the built-in set. It must contain the 16 files '0.txt',
    /// '22.txt', ... '337.txt'
    #[clap(long = "art-dir", value_parser)]
    art_dir: Option<PathBuf>,

    /// Give up on a web request after this many seconds
    #[clap(long = "timeout", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Log what the program is doing to stderr
    #[clap(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[clap(subcommand)]
    subcommand: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show where the Sun is in its day/night cycle as a piece of ASCII art. This is the default
    Show {
        /// Set the output format to machine-readable JSON. If this flag is not present, the sunrise and sunset times
        /// are displayed above the artwork
        #[clap(long = "json")]
        json: bool,

        /// Run the program constantly, redrawing the artwork every minute
        #[clap(long = "watch")]
        watch: bool,
    },

    /// Resolve the coordinates that would be used, caching them if they had to be looked up
    Locate {
        /// Set the output format to machine-readable JSON
        #[clap(long = "json")]
        json: bool,
    },

    /// Delete the cached coordinates, so the next run looks the location up again
    Forget,
}

#[derive(Debug, Default, Deserialize)]
struct RawFileConfig {
    geocode_key: Option<String>,
    place: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    art_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
    geocode_url: Option<String>,
    sun_times_url: Option<String>,
}

/// How the location should be worked out.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    /// Given on the command line; nothing is looked up or cached.
    Arguments(domain::Coordinates),
    /// Geocode this place and overwrite the cache.
    Place(String),
    /// Use the cache, then the config file, then ask the user for a place to geocode.
    Cached {
        coordinates: Option<domain::Coordinates>,
        place: Option<String>,
    },
}

/// Container for all necessary runtime configuration.
#[derive(Debug)]
pub struct Config {
    pub location: LocationSource,
    pub cache: CoordinateCache,
    pub art: ArtSource,
    pub geocode_key: Option<ApiKey>,
    pub timeout: Duration,
    pub geocode_url: String,
    pub sun_times_url: String,
    pub action: domain::Action,
}

impl Cli {
    /// Merge the command line, the environment and the config file into one runtime configuration. Arguments
    /// passed over the command line take precedence over the environment, which takes precedence over values
    /// found in the configuration file, which, in turn, take precedence over hard coded defaults.
    pub fn into_config(self) -> Result<Config> {
        let file_config = load_file_config(self.config.as_deref())?;
        let geocode_key = resolve_api_key(env::var(API_KEY_VAR).ok(), file_config.geocode_key.clone());
        self.merge(file_config, geocode_key)
    }

    fn merge(self, file_config: RawFileConfig, geocode_key: Option<ApiKey>) -> Result<Config> {
        let location = if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            LocationSource::Arguments(domain::Coordinates::new(lat, lon))
        } else if let Some(place) = self.place {
            LocationSource::Place(place)
        } else {
            let coordinates = match file_coordinates(&file_config) {
                Ok(coords) => coords,
                Err(e) => {
                    tracing::warn!("ignoring coordinates in the config file: {e}");
                    None
                }
            };
            LocationSource::Cached {
                coordinates,
                place: file_config.place,
            }
        };

        let timeout = match self.timeout.or(file_config.timeout_secs) {
            Some(0) => return Err(ConfigErrorKind::InvalidTimeout.into()),
            Some(secs) => Duration::from_secs(secs),
            None => api::DEFAULT_TIMEOUT,
        };

        let action = match self.subcommand {
            Some(Command::Show { json, watch }) => domain::Action::Show { json, watch },
            Some(Command::Locate { json }) => domain::Action::Locate { json },
            Some(Command::Forget) => domain::Action::Forget,
            None => domain::Action::Show {
                json: false,
                watch: false,
            },
        };

        Ok(Config {
            location,
            cache: CoordinateCache::new(self.cache_file.unwrap_or_else(CoordinateCache::default_path)),
            art: ArtSource::from_dir(self.art_dir.or(file_config.art_dir)),
            geocode_key,
            timeout,
            geocode_url: file_config.geocode_url.unwrap_or_else(|| api::GEOCODE_URL.to_string()),
            sun_times_url: file_config
                .sun_times_url
                .unwrap_or_else(|| api::SUN_TIMES_URL.to_string()),
            action,
        })
    }
}

/// The environment wins over the config file. Blank values count as missing.
fn resolve_api_key(from_env: Option<String>, from_file: Option<String>) -> Option<ApiKey> {
    from_env
        .and_then(ApiKey::new)
        .or_else(|| from_file.and_then(ApiKey::new))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|path| path.join("heliart.toml"))
}

/// An explicitly requested config file must exist. A broken file is reported and skipped.
fn load_file_config(explicit: Option<&Path>) -> Result<RawFileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => path,
            None => return Ok(RawFileConfig::default()),
        },
    };

    let config_file = fs::read(&path).map_err(|e| HeliartError::file("read config file", &path, e))?;
    match parse_local_config(&config_file) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                "couldn't parse configuration file due to the following reason: {e}. Proceeding without it."
            );
            Ok(RawFileConfig::default())
        }
    }
}

fn parse_local_config(config_file: &[u8]) -> Result<RawFileConfig, String> {
    toml::from_slice::<RawFileConfig>(config_file).map_err(|e| e.to_string())
}

fn file_coordinates(config: &RawFileConfig) -> Result<Option<domain::Coordinates>, String> {
    let (lat, lon) = match (config.latitude, config.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        (Some(_lat), None) => return Err("Missing longitude".to_string()),
        (None, Some(_lon)) => return Err("Missing latitude".to_string()),
        (None, None) => return Ok(None),
    };

    let lat = domain::Latitude::new(lat)?;
    let lon = domain::Longitude::new(lon)?;

    Ok(Some(domain::Coordinates::new(lat, lon)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn config_from(args: &[&str], file: &str) -> Result<Config> {
        let cli = Cli::try_parse_from(std::iter::once("heliart").chain(args.iter().copied()))
            .map_err(|e| HeliartError::Runtime(e.to_string()))?;
        let file_config = parse_local_config(file.as_bytes()).unwrap();
        let key = resolve_api_key(None, file_config.geocode_key.clone());
        cli.merge(file_config, key)
    }

    fn coords(lat: f64, lon: f64) -> domain::Coordinates {
        domain::Coordinates::new(
            domain::Latitude::new(lat).unwrap(),
            domain::Longitude::new(lon).unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[], "").unwrap();
        assert_eq!(
            config.location,
            LocationSource::Cached {
                coordinates: None,
                place: None
            }
        );
        assert_eq!(config.art, ArtSource::Embedded);
        assert_eq!(config.timeout, api::DEFAULT_TIMEOUT);
        assert_eq!(config.geocode_url, api::GEOCODE_URL);
        assert!(config.geocode_key.is_none());
        assert!(matches!(
            config.action,
            domain::Action::Show {
                json: false,
                watch: false
            }
        ));
    }

    #[test]
    fn test_command_line_coordinates_win() {
        let config = config_from(
            &["-l", "-33.9", "-o", "18.4", "show", "--json"],
            "latitude = 51.5\nlongitude = -0.1\n",
        )
        .unwrap();
        assert_eq!(config.location, LocationSource::Arguments(coords(-33.9, 18.4)));
        assert!(matches!(config.action, domain::Action::Show { json: true, watch: false }));
    }

    #[test]
    fn test_latitude_requires_longitude() {
        assert!(config_from(&["-l", "10.0"], "").is_err());
        assert!(config_from(&["-l", "100.0", "-o", "0.0"], "").is_err());
    }

    #[test]
    fn test_place_forces_lookup() {
        let config = config_from(&["--place", "Malaga, Spain", "locate"], "").unwrap();
        assert_eq!(config.location, LocationSource::Place("Malaga, Spain".to_string()));
        assert!(matches!(config.action, domain::Action::Locate { json: false }));
    }

    #[test]
    fn test_file_config() {
        let file = r#"
            geocode_key = "abc"
            place = "Oslo"
            latitude = 59.9
            longitude = 10.7
            art_dir = "/tmp/art"
            timeout_secs = 3
            sun_times_url = "http://localhost:1234"
        "#;
        let config = config_from(&["forget"], file).unwrap();
        assert_eq!(
            config.location,
            LocationSource::Cached {
                coordinates: Some(coords(59.9, 10.7)),
                place: Some("Oslo".to_string())
            }
        );
        assert!(config.geocode_key.is_some());
        assert_eq!(config.art, ArtSource::Directory(PathBuf::from("/tmp/art")));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.sun_times_url, "http://localhost:1234");
        assert!(matches!(config.action, domain::Action::Forget));
    }

    #[test]
    fn test_half_coordinates_in_file_are_ignored() {
        let config = config_from(&[], "latitude = 59.9\n").unwrap();
        assert_eq!(
            config.location,
            LocationSource::Cached {
                coordinates: None,
                place: None
            }
        );
    }

    #[test]
    fn test_timeout() {
        assert!(config_from(&["--timeout", "0"], "").is_err());
        assert!(matches!(
            config_from(&[], "timeout_secs = 0"),
            Err(HeliartError::Config(ConfigErrorKind::InvalidTimeout))
        ));
        let config = config_from(&["--timeout", "30"], "timeout_secs = 3").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_key_precedence() {
        let key = |env: Option<&str>, file: Option<&str>| {
            resolve_api_key(env.map(String::from), file.map(String::from))
                .map(|key| format!("{key:?}"))
        };
        assert!(key(Some("env"), Some("file")).is_some());
        assert!(key(Some("  "), Some("file")).is_some());
        assert!(key(Some(""), None).is_none());
        assert!(key(None, None).is_none());
    }

    #[test]
    fn test_broken_file_is_rejected_by_parser() {
        assert!(parse_local_config(b"latitude = 'north").is_err());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_file_config(Some(&missing)),
            Err(HeliartError::Io { .. })
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "latitude = ").unwrap();
        assert!(load_file_config(Some(&broken)).unwrap().latitude.is_none());
    }
}
