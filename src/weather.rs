//! # Forecast Fetching and Scraping
//!
//! Current conditions come from a forecast web page rather than an API:
//!
//! 1. **Geocode**: "City, CC" → latitude/longitude via the ArcGIS
//!    `findAddressCandidates` service
//! 2. **Fetch**: GET `<forecast_url>/<lat>,<lng>/<units>/<language>`
//! 3. **Cache**: store the raw page under the location string
//! 4. **Scrape**: pull the summary token, temperature and wind out of the HTML
//!
//! ## Page Structure
//! ```html
//! <span class="currently">
//!   <img class="skycon" alt="partly-cloudy-day icon">
//!   <span class="summary">14˚ Partly Cloudy.</span>
//! </span>
//! <div class="wind">
//!   <span class="num">9</span><span class="unit">mph</span>
//!   <span class="direction" title="SW">...</span>
//! </div>
//! ```
//!
//! Only the first match of each element is used. Any missing element or
//! unparseable number fails the whole scrape; the caller treats that as "no
//! reading".

use crate::cache::ContentCache;
use crate::config::{Config, WeatherConfig};
use crate::WeatherReading;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use thiserror::Error;

/// Errors from geocoding, fetching or scraping the forecast.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// HTTP request failed (network, TLS or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("geocoder response: {0}")]
    Json(#[from] serde_json::Error),

    /// The geocoder knows no such place
    #[error("no location found for '{0}'")]
    NotFound(String),

    /// The page did not have the expected structure
    #[error("scrape failed: {0}")]
    Scrape(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    location: GeoPoint,
}

/// ArcGIS reports x = longitude, y = latitude.
#[derive(Debug, Deserialize)]
struct GeoPoint {
    x: f64,
    y: f64,
}

/// Fetch and scrape the current conditions.
///
/// Unless `use_cache` is set, any cached page for this location is dropped
/// first so the page is always fresh. A page is only geocoded and downloaded
/// when the cache has no entry. Failure to write the cache is logged and
/// otherwise ignored.
pub async fn fetch(
    client: &Client,
    config: &Config,
    cache: &mut dyn ContentCache,
) -> Result<WeatherReading, WeatherError> {
    let key = config.location_string();

    if !config.weather.use_cache {
        if let Err(e) = cache.remove(&key) {
            log::warn!("Could not clear cached forecast for {}: {}", key, e);
        }
    }

    let html = match cache.get(&key) {
        Some(html) => {
            log::debug!("Using cached forecast page for {}", key);
            html
        }
        None => {
            let coords = geocode(client, &config.weather, &key).await?;
            log::debug!("{} is at {}, {}", key, coords.lat, coords.lng);

            let url = forecast_url(&config.weather, coords);
            let html = fetch_text(client, &url).await?;
            if let Err(e) = cache.put(&key, &html) {
                log::warn!("Could not cache forecast page: {}", e);
            }
            html
        }
    };

    parse_forecast(&html)
}

/// Resolve "City, CC" to coordinates.
pub async fn geocode(
    client: &Client,
    config: &WeatherConfig,
    address: &str,
) -> Result<Coordinates, WeatherError> {
    let response = client
        .get(&config.geocoder_url)
        .query(&[("SingleLine", address), ("f", "json"), ("maxLocations", "1")])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(WeatherError::Status {
            url: config.geocoder_url.clone(),
            status: response.status().as_u16(),
        });
    }

    let body = response.text().await?;
    parse_geocode(&body, address)
}

/// First candidate of a `findAddressCandidates` JSON response.
pub fn parse_geocode(body: &str, address: &str) -> Result<Coordinates, WeatherError> {
    let response: GeocodeResponse = serde_json::from_str(body)?;
    response
        .candidates
        .first()
        .map(|c| Coordinates {
            lat: c.location.y,
            lng: c.location.x,
        })
        .ok_or_else(|| WeatherError::NotFound(address.to_string()))
}

/// Forecast page URL for a location.
pub fn forecast_url(config: &WeatherConfig, coords: Coordinates) -> String {
    format!(
        "{}/{},{}/{}/{}",
        config.forecast_url.trim_end_matches('/'),
        coords.lat,
        coords.lng,
        config.units,
        config.language
    )
}

async fn fetch_text(client: &Client, url: &str) -> Result<String, WeatherError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(WeatherError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response.text().await?)
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("CSS selector should be valid")
}

fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    scope.select(&selector(css)).next()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// "14˚ Partly Cloudy." → 14. The last character of the first word is the
/// degree sign.
fn parse_temperature(text: &str) -> Option<i32> {
    let token = text.split_whitespace().next()?;
    let mut chars = token.chars();
    chars.next_back()?;
    chars.as_str().parse().ok()
}

/// Scrape a forecast page.
pub fn parse_forecast(html: &str) -> Result<WeatherReading, WeatherError> {
    let doc = Html::parse_document(html);

    let currently = doc
        .select(&selector("span.currently"))
        .next()
        .ok_or(WeatherError::Scrape("no current conditions"))?;

    let summary = first(currently, "img")
        .and_then(|img| img.value().attr("alt"))
        .and_then(|alt| alt.split_whitespace().next())
        .ok_or(WeatherError::Scrape("no summary icon"))?
        .to_string();

    let temperature = first(currently, "span.summary")
        .map(text_of)
        .and_then(|text| parse_temperature(&text))
        .ok_or(WeatherError::Scrape("unreadable temperature"))?;

    let wind = doc
        .select(&selector("div.wind"))
        .next()
        .ok_or(WeatherError::Scrape("no wind block"))?;

    let speed: i32 = first(wind, "span.num")
        .map(text_of)
        .and_then(|text| text.trim().parse().ok())
        .ok_or(WeatherError::Scrape("unreadable wind speed"))?;

    let unit = first(wind, "span.unit")
        .map(text_of)
        .ok_or(WeatherError::Scrape("no wind unit"))?;

    let direction = first(wind, "span.direction")
        .and_then(|d| d.value().attr("title"))
        .ok_or(WeatherError::Scrape("no wind direction"))?;

    Ok(WeatherReading {
        temperature,
        wind: format!("{} {} {}", speed, unit.trim(), direction),
        summary,
    })
}
