use std::io::{self, BufRead, Write};
use std::result;

use chrono::{DateTime, NaiveDate, Utc};
use crossterm::{cursor, terminal, ExecutableCommand, QueueableCommand};

use super::{
    api::{GeocodeClient, Place, SunTimesClient},
    cli::{Config, LocationSource},
    domain::{Coordinates, SunTimes},
    errors::{ConfigErrorKind, HeliartError},
    report::{LocateReport, Origin, Report},
    utils,
};

type Result<T> = result::Result<T, HeliartError>;

fn geocoder(config: &Config) -> Result<GeocodeClient> {
    Ok(GeocodeClient::new(config.geocode_key.clone(), config.timeout)?
        .with_base_url(&config.geocode_url))
}

fn sun_times_client(config: &Config) -> Result<SunTimesClient> {
    Ok(SunTimesClient::new(config.timeout)?.with_base_url(&config.sun_times_url))
}

/// Look `place` up on its own task and wait for the outcome.
async fn geocode(client: GeocodeClient, place: String) -> Result<Place> {
    tokio::spawn(async move { client.search(&place).await }).await?
}

async fn fetch_sun_times(client: &SunTimesClient, location: Coordinates) -> Result<SunTimes> {
    let client = client.clone();
    tokio::spawn(async move { client.fetch(&location).await }).await?
}

async fn prompt_for_place() -> Result<String> {
    tokio::task::spawn_blocking(|| {
        let mut stderr = io::stderr();
        write!(stderr, "human readable location: ")
            .and_then(|_| stderr.flush())
            .map_err(|e| HeliartError::io("Failed to prompt for a location", e))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| HeliartError::io("Failed to read a location from stdin", e))?;

        let place = line.trim().to_string();
        if place.is_empty() {
            return Err(ConfigErrorKind::EmptyPlace.into());
        }
        Ok(place)
    })
    .await?
}

/// Geocode a place and remember the answer. Failing to write the cache only costs a lookup next time.
async fn locate_place(config: &Config, client: GeocodeClient, place: String) -> Result<(Coordinates, Origin)> {
    let found = geocode(client, place).await?;
    if let Err(e) = config.cache.store(&found.coordinates) {
        tracing::warn!("couldn't cache coordinates: {e}");
    }
    Ok((found.coordinates, Origin::Geocoded(found.name)))
}

/// Work out where the user is, only asking the geocoding service when nothing closer to hand is known.
pub async fn resolve_location(config: &Config) -> Result<(Coordinates, Origin)> {
    match &config.location {
        LocationSource::Arguments(coords) => Ok((*coords, Origin::Arguments)),
        LocationSource::Place(place) => {
            let client = geocoder(config)?;
            locate_place(config, client, place.clone()).await
        }
        LocationSource::Cached { coordinates, place } => {
            if let Some(coords) = coordinates {
                return Ok((*coords, Origin::ConfigFile));
            }
            if let Some(coords) = config.cache.load() {
                return Ok((coords, Origin::Cache));
            }

            // Without a key there is no point asking the user anything.
            let client = geocoder(config)?;
            let place = match place {
                Some(place) => place.clone(),
                None => prompt_for_place().await?,
            };
            locate_place(config, client, place).await
        }
    }
}

pub async fn show(config: &Config, json: bool, watch: bool) -> Result<()> {
    let (location, origin) = resolve_location(config).await?;
    tracing::info!(%location, %origin, "resolved location");

    let client = sun_times_client(config)?;
    let sun_times = fetch_sun_times(&client, location).await?;
    let report = Report::new(location, &sun_times, Utc::now(), &config.art)?;

    if !watch {
        if json {
            println!("{}", report.to_json());
        } else {
            println!("{report}");
        }
        return Ok(());
    }

    watch_sun(config, &client, location, sun_times, report, json).await
}

fn local_date(sun_times: &SunTimes, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&sun_times.utc_offset).date_naive()
}

/// Refetch the sun times once `now` falls on a later local date than `day`. If the service can't
/// be reached the previous times are kept and `day` is left alone, so the next call retries.
async fn refresh_on_new_day(
    client: &SunTimesClient,
    location: Coordinates,
    now: DateTime<Utc>,
    sun_times: &mut SunTimes,
    day: &mut NaiveDate,
) {
    if local_date(sun_times, now) == *day {
        return;
    }
    match fetch_sun_times(client, location).await {
        Ok(fresh) => {
            *day = local_date(&fresh, now);
            *sun_times = fresh;
        }
        Err(e) => tracing::warn!("keeping previous sun times: {e}"),
    }
}

fn terminal_error(e: io::Error) -> HeliartError {
    HeliartError::io("Failed to draw to the terminal", e)
}

async fn watch_sun(
    config: &Config,
    client: &SunTimesClient,
    location: Coordinates,
    mut sun_times: SunTimes,
    mut report: Report,
    json: bool,
) -> Result<()> {
    let mut day = local_date(&sun_times, Utc::now());
    let mut stdout = io::stdout();
    if !json {
        println!("Displaying the Sun's position in real time. Press ctrl+C to cancel.\n");
        stdout.queue(cursor::SavePosition).map_err(terminal_error)?;
        stdout.execute(cursor::Hide).map_err(terminal_error)?;
    }

    loop {
        if json {
            println!("{}", report.to_json());
        } else {
            stdout.queue(cursor::RestorePosition).map_err(terminal_error)?;
            stdout
                .queue(terminal::Clear(terminal::ClearType::FromCursorDown))
                .map_err(terminal_error)?;
            stdout
                .write_all(format!("{report}\n").as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(terminal_error)?;
        }

        tokio::select! {
            _ = utils::wait_until_next_minute() => {}
            _ = tokio::signal::ctrl_c() => {
                if !json {
                    stdout.execute(cursor::Show).map_err(terminal_error)?;
                }
                return Ok(());
            }
        }

        let now = Utc::now();
        refresh_on_new_day(client, location, now, &mut sun_times, &mut day).await;
        report = Report::new(location, &sun_times, now, &config.art)?;
    }
}

pub async fn locate(config: &Config, json: bool) -> Result<()> {
    let (location, origin) = resolve_location(config).await?;
    let report = LocateReport { location, origin };
    if json {
        println!("{}", serde_json::json!(report));
    } else {
        println!("{report}");
    }
    Ok(())
}

pub fn forget(config: &Config) -> Result<()> {
    let path = config.cache.path().display();
    if config.cache.clear()? {
        println!("Removed cached coordinates from '{path}'");
    } else {
        println!("No cached coordinates at '{path}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{
        api::ApiKey,
        art::ArtSource,
        cache::CoordinateCache,
        domain::{Action, Latitude, Longitude},
    };

    fn coords(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(Latitude::new(lat).unwrap(), Longitude::new(lon).unwrap())
    }

    fn config(dir: &TempDir, server: &MockServer, location: LocationSource, key: Option<&str>) -> Config {
        Config {
            location,
            cache: CoordinateCache::new(dir.path().join("coords.txt")),
            art: ArtSource::Embedded,
            geocode_key: key.and_then(ApiKey::new),
            timeout: crate::api::DEFAULT_TIMEOUT,
            geocode_url: server.uri(),
            sun_times_url: server.uri(),
            action: Action::Forget,
        }
    }

    async fn mount_geocoder(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"lat": "59.9133301", "lon": "10.7389701", "display_name": "Oslo, Norway"}
            ])))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_place_is_geocoded_and_cached() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_geocoder(&server, 1).await;

        let config = config(&dir, &server, LocationSource::Place("Oslo".into()), Some("key"));
        let (location, origin) = resolve_location(&config).await.unwrap();

        assert_eq!(location, coords(59.9133301, 10.7389701));
        assert_eq!(origin, Origin::Geocoded("Oslo, Norway".to_string()));
        assert_eq!(config.cache.load(), Some(coords(59.913330, 10.738970)));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_geocoding() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_geocoder(&server, 0).await;

        let source = LocationSource::Cached {
            coordinates: None,
            place: Some("Oslo".into()),
        };
        let config = config(&dir, &server, source, None);
        config.cache.store(&coords(36.72016, -4.42034)).unwrap();

        let (location, origin) = resolve_location(&config).await.unwrap();
        assert_eq!(location, coords(36.72016, -4.42034));
        assert_eq!(origin, Origin::Cache);
    }

    #[tokio::test]
    async fn test_invalid_cache_falls_back_to_configured_place() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_geocoder(&server, 1).await;

        let source = LocationSource::Cached {
            coordinates: None,
            place: Some("Oslo".into()),
        };
        let config = config(&dir, &server, source, Some("key"));
        std::fs::write(config.cache.path(), "not,coords").unwrap();

        let (_, origin) = resolve_location(&config).await.unwrap();
        assert_eq!(origin, Origin::Geocoded("Oslo, Norway".to_string()));
        assert_eq!(config.cache.load(), Some(coords(59.913330, 10.738970)));
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_before_lookup() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_geocoder(&server, 0).await;

        let source = LocationSource::Cached {
            coordinates: None,
            place: Some("Oslo".into()),
        };
        let config = config(&dir, &server, source, None);

        let err = resolve_location(&config).await.unwrap_err();
        assert!(matches!(err, HeliartError::Config(ConfigErrorKind::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_config_file_coordinates_beat_cache() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;

        let source = LocationSource::Cached {
            coordinates: Some(coords(1.0, 2.0)),
            place: None,
        };
        let config = config(&dir, &server, source, None);
        config.cache.store(&coords(3.0, 4.0)).unwrap();

        let (location, origin) = resolve_location(&config).await.unwrap();
        assert_eq!(location, coords(1.0, 2.0));
        assert_eq!(origin, Origin::ConfigFile);
    }

    #[tokio::test]
    async fn test_failed_geocoding_leaves_cache_alone() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = config(&dir, &server, LocationSource::Place("Oslo".into()), Some("key"));
        let err = resolve_location(&config).await.unwrap_err();

        assert!(err.to_string().contains("503"), "{err}");
        assert_eq!(config.cache.load(), None);
    }

    #[tokio::test]
    async fn test_failed_refetch_is_retried() {
        let server = MockServer::start().await;
        let client = SunTimesClient::new(crate::api::DEFAULT_TIMEOUT)
            .unwrap()
            .with_base_url(server.uri());
        let location = coords(59.91, 10.74);

        let mut sun_times = SunTimes::new(
            crate::domain::MinuteOfDay::new(360).unwrap(),
            crate::domain::MinuteOfDay::new(1080).unwrap(),
            0,
        )
        .unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut day = yesterday;
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 1, 0).unwrap();

        {
            let _outage = Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(503))
                .expect(1)
                .mount_as_scoped(&server)
                .await;
            refresh_on_new_day(&client, location, now, &mut sun_times, &mut day).await;
        }
        assert_eq!(day, yesterday);
        assert_eq!(sun_times.sunrise.get(), 360);

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {"sunrise": "05:00:00", "sunset": "21:00:00", "utc_offset": 0},
                "status": "OK"
            })))
            .expect(1)
            .mount(&server)
            .await;
        refresh_on_new_day(&client, location, now, &mut sun_times, &mut day).await;
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(sun_times.sunrise.get(), 300);

        // Same day again: no further request.
        refresh_on_new_day(&client, location, now, &mut sun_times, &mut day).await;
    }

    #[test]
    fn test_forget() {
        let dir = TempDir::new().unwrap();
        let cache = CoordinateCache::new(dir.path().join("coords.txt"));
        cache.store(&coords(1.0, 2.0)).unwrap();

        let config = Config {
            location: LocationSource::Arguments(coords(1.0, 2.0)),
            cache,
            art: ArtSource::Embedded,
            geocode_key: None,
            timeout: crate::api::DEFAULT_TIMEOUT,
            geocode_url: String::new(),
            sun_times_url: String::new(),
            action: Action::Forget,
        };
        forget(&config).unwrap();
        assert_eq!(config.cache.load(), None);
        forget(&config).unwrap();
    }
}
