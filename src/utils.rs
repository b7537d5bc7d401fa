use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tracing_subscriber::EnvFilter;

/// Send logs to stderr, leaving stdout for the artwork. `RUST_LOG` is honoured unless `verbose` is set.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("heliart=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Time left until the start of the next whole minute.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute =
        Duration::from_secs(now.second().into()) + Duration::from_nanos(now.nanosecond().into());
    Duration::from_secs(60).saturating_sub(into_minute)
}

pub async fn wait_until_next_minute() {
    tokio::time::sleep(until_next_minute(Utc::now())).await;
}
