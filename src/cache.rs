//! Persists the last resolved coordinates so the geocoding service is only asked once.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    domain::{Coordinates, Latitude, Longitude},
    errors::{HeliartError, ValidationErrorKind},
};

type Result<T> = std::result::Result<T, HeliartError>;

static COORDINATES_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^",
        // latitude, -90 to 90
        r"([-+]?(?:[0-8]?[0-9](?:\.[0-9]{1,8})?|90(?:\.0{1,8})?))",
        r",",
        // longitude, -180 to 180
        r"([-+]?(?:(?:1[0-7][0-9]|[0-9]{1,2})(?:\.[0-9]{1,8})?|180(?:\.0{1,8})?))",
        r"$",
    ))
    .unwrap()
});

/// Validate the contents of a cache file and turn them back into coordinates.
pub fn parse_cached(content: &str) -> Result<Coordinates> {
    let content = content.trim();
    let invalid = || ValidationErrorKind::InvalidCachedCoordinates(content.to_string());

    let captures = COORDINATES_REGEX.captures(content).ok_or_else(invalid)?;
    let latitude = Latitude::parse(&captures[1]).map_err(|_| invalid())?;
    let longitude = Longitude::parse(&captures[2]).map_err(|_| invalid())?;

    Ok(Coordinates::new(latitude, longitude))
}

#[derive(Debug, Clone)]
pub struct CoordinateCache {
    path: PathBuf,
}

impl CoordinateCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<cache dir>/heliart/coords.txt`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join("heliart"))
            .unwrap_or_default()
            .join("coords.txt")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached coordinates. Anything other than a valid pair is a cache miss.
    pub fn load(&self) -> Option<Coordinates> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no cached coordinates");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "couldn't read coordinate cache");
                return None;
            }
        };

        match parse_cached(&content) {
            Ok(coords) => {
                tracing::debug!(%coords, "using cached coordinates");
                Some(coords)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring coordinate cache: {e}");
                None
            }
        }
    }

    pub fn store(&self, coords: &Coordinates) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| HeliartError::file("create", parent, e))?;
        }
        fs::write(&self.path, coords.to_string())
            .map_err(|e| HeliartError::file("write", &self.path, e))?;
        tracing::debug!(%coords, path = %self.path.display(), "cached coordinates");
        Ok(())
    }

    /// Delete the cache file. Returns whether there was anything to delete.
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HeliartError::file("delete", &self.path, e)),
        }
    }
}
