//! Clients for the geocoding and sunrise/sunset web services.

use std::{fmt, time::Duration};

use serde::{de::DeserializeOwned, Deserialize};

use super::{
    clock,
    domain::{ClockFormat, Coordinates, Latitude, Longitude, SunTimes},
    errors::{ConfigErrorKind, HeliartError, Service},
};

type Result<T> = std::result::Result<T, HeliartError>;

pub const GEOCODE_URL: &str = "https://geocode.maps.co";
pub const SUN_TIMES_URL: &str = "https://api.sunrisesunset.io";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest slice of a response body quoted back in an error message.
const BODY_SNIPPET_LEN: usize = 200;

#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Blank keys count as missing.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// The best match the geocoding service found for a place name.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct RawSunData {
    results: RawSunResults,
    status: String,
}

#[derive(Debug, Deserialize)]
struct RawSunResults {
    sunrise: Option<String>,
    sunset: Option<String>,
    utc_offset: Option<i32>,
    timezone: Option<String>,
}

fn http_client(service: Service, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("heliart/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| HeliartError::fetch(service, format!("couldn't create HTTP client: {e}")))
}

/// The request URL is dropped from the message, since the geocoding one carries the API key.
fn describe(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("couldn't connect: {}", e.without_url())
    } else {
        e.without_url().to_string()
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    service: Service,
    url: &str,
) -> Result<T> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| HeliartError::fetch(service, describe(e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| HeliartError::fetch(service, describe(e)))?;

    if !status.is_success() {
        return Err(HeliartError::fetch(
            service,
            format!("HTTP status {status}, body: '{}'", snippet(&body)),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        HeliartError::fetch(
            service,
            format!("malformed response ({e}), body: '{}'", snippet(&body)),
        )
    })
}

/// Trim a free-text place name and turn spaces and commas into `+`, percent-encoding anything
/// else that isn't safe in a query string.
pub fn format_query(place: &str) -> String {
    let mut query = String::with_capacity(place.len());
    for c in place.trim().chars() {
        match c {
            ' ' | ',' => query.push('+'),
            c if c.is_ascii_alphanumeric() || "-._~".contains(c) => query.push(c),
            c => {
                let mut buf = [0; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    query.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    query
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: reqwest::Client,
    base_url: String,
    key: ApiKey,
}

impl GeocodeClient {
    /// Fails straight away, before any request is made, if no API key is available.
    pub fn new(key: Option<ApiKey>, timeout: Duration) -> Result<Self> {
        let key = key.ok_or(ConfigErrorKind::MissingApiKey)?;
        Ok(Self {
            http: http_client(Service::Geocoding, timeout)?,
            base_url: GEOCODE_URL.to_string(),
            key,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Look up a place name, taking the first candidate the service returns.
    pub async fn search(&self, place: &str) -> Result<Place> {
        let query = format_query(place);
        if query.is_empty() {
            return Err(ConfigErrorKind::EmptyPlace.into());
        }

        tracing::debug!(%query, "geocoding");
        let url = format!(
            "{}/search?q={}&api_key={}",
            self.base_url.trim_end_matches('/'),
            query,
            self.key.0
        );
        let candidates: Vec<RawPlace> = get_json(&self.http, Service::Geocoding, &url).await?;

        let first = candidates.into_iter().next().ok_or_else(|| {
            HeliartError::fetch(Service::Geocoding, format!("no results for '{}'", place.trim()))
        })?;
        tracing::debug!(name = %first.display_name, lat = %first.lat, lon = %first.lon, "geocoded");

        let bad_field = |field: &str, e: String| {
            HeliartError::fetch(Service::Geocoding, format!("bad {field} in response: {e}"))
        };
        let latitude = Latitude::parse(&first.lat).map_err(|e| bad_field("latitude", e))?;
        let longitude = Longitude::parse(&first.lon).map_err(|e| bad_field("longitude", e))?;

        Ok(Place {
            name: first.display_name,
            coordinates: Coordinates::new(latitude, longitude),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SunTimesClient {
    http: reqwest::Client,
    base_url: String,
    format: ClockFormat,
}

impl SunTimesClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(Service::SunTimes, timeout)?,
            base_url: SUN_TIMES_URL.to_string(),
            format: ClockFormat::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_clock_format(mut self, format: ClockFormat) -> Self {
        self.format = format;
        self
    }

    /// Today's sunrise and sunset at `coords`, in local time.
    pub async fn fetch(&self, coords: &Coordinates) -> Result<SunTimes> {
        let url = format!(
            "{}/json?lat={:.6}&lng={:.6}&time_format={}",
            self.base_url.trim_end_matches('/'),
            coords.latitude.degrees(),
            coords.longitude.degrees(),
            self.format.query_value()
        );
        tracing::debug!(%url, "fetching sun times");
        let data: RawSunData = get_json(&self.http, Service::SunTimes, &url).await?;

        if data.status != "OK" {
            return Err(HeliartError::fetch(
                Service::SunTimes,
                format!("service answered with status '{}'", data.status),
            ));
        }

        let results = data.results;
        let missing = |field: &str| {
            HeliartError::fetch(
                Service::SunTimes,
                format!("response has no {field} for {coords}"),
            )
        };
        let sunrise = results.sunrise.ok_or_else(|| missing("sunrise"))?;
        let sunset = results.sunset.ok_or_else(|| missing("sunset"))?;
        let utc_offset = results.utc_offset.ok_or_else(|| missing("utc_offset"))?;
        tracing::debug!(%sunrise, %sunset, utc_offset, timezone = ?results.timezone, "sun times");

        SunTimes::new(
            clock::parse_clock_time(&sunrise, self.format)?,
            clock::parse_clock_time(&sunset, self.format)?,
            utc_offset,
        )
    }
}
