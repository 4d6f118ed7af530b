//! Gathers everything one refresh needs from the network.
//!
//! Neither source is allowed to abort the refresh: a failed forecast becomes
//! "no reading" and a failed tide feed becomes an empty list, each with a
//! warning in the log.

use crate::cache::ContentCache;
use crate::config::{Config, WeatherConfig};
use crate::{tides, weather, TideEvent, WeatherReading};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

/// Result of one acquisition pass.
#[derive(Debug, Default)]
pub struct Acquisition {
    pub reading: Option<WeatherReading>,
    /// Upcoming events, corrected and sorted
    pub tides: Vec<TideEvent>,
}

/// HTTP client shared by the forecast and tide requests.
pub fn build_client(config: &WeatherConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub async fn acquire(
    client: &Client,
    config: &Config,
    cache: &mut dyn ContentCache,
    now: DateTime<Utc>,
) -> Acquisition {
    let reading = match weather::fetch(client, config, cache).await {
        Ok(reading) => {
            log::info!(
                "{}: {}°, {}, {}",
                config.location_string(),
                reading.temperature,
                reading.wind,
                reading.summary
            );
            Some(reading)
        }
        Err(e) => {
            log::warn!("Weather unavailable: {}", e);
            None
        }
    };

    let tides = match tides::fetch(client, &config.tides, now).await {
        Ok(events) => {
            log::info!("Fetched {} upcoming tide events", events.len());
            events
        }
        Err(e) => {
            log::warn!("Tides unavailable: {}", e);
            Vec::new()
        }
    };

    Acquisition { reading, tides }
}
