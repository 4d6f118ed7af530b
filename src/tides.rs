//! # Admiralty Tide Events
//!
//! Tide times come from the UK Hydrographic Office "UK Tidal API"
//! (`/Stations/{id}/TidalEvents`). The feed is optional: without an API key
//! no request is made and the panel simply omits the tide line.
//!
//! ## Processing
//! 1. **Fetch**: GET with the `Ocp-Apim-Subscription-Key` header
//! 2. **Parse**: JSON array of `{ "EventType": "HighWater", "DateTime": "..." }`
//! 3. **Correct**: add the configured high/low offset in minutes, for sites a
//!    little way from the reference station
//! 4. **Filter**: keep events strictly after "now", sorted by time
//!
//! `DateTime` values are UTC, with or without fractional seconds or an
//! explicit offset.

use crate::config::TideConfig;
use crate::{TideEvent, TideKind};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TideError {
    /// HTTP request failed (network, TLS or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status, e.g. 401 for a bad key
    #[error("tide API returned HTTP {0}")]
    Status(u16),

    /// Body was not the expected JSON array
    #[error("tide API response: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of the TidalEvents response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdmiraltyEvent {
    pub event_type: String,
    pub date_time: String,
}

/// Fetch upcoming tide events.
///
/// Returns an empty list without touching the network when no API key is
/// configured.
pub async fn fetch(
    client: &Client,
    config: &TideConfig,
    now: DateTime<Utc>,
) -> Result<Vec<TideEvent>, TideError> {
    if config.api_key.is_empty() {
        log::info!("No Admiralty API key configured, skipping tides");
        return Ok(Vec::new());
    }

    let response = client
        .get(events_url(config))
        .header("Ocp-Apim-Subscription-Key", config.api_key.as_str())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(TideError::Status(response.status().as_u16()));
    }

    let body = response.text().await?;
    parse_events(&body, now, config)
}

/// TidalEvents endpoint for the configured station.
pub fn events_url(config: &TideConfig) -> String {
    format!(
        "{}/Stations/{}/TidalEvents?duration={}",
        config.api_url.trim_end_matches('/'),
        config.station_id,
        config.duration_days
    )
}

/// Parse a TidalEvents body into corrected, future, time-ordered events.
pub fn parse_events(
    body: &str,
    now: DateTime<Utc>,
    config: &TideConfig,
) -> Result<Vec<TideEvent>, TideError> {
    let raw: Vec<AdmiraltyEvent> = serde_json::from_str(body)?;
    Ok(upcoming(&raw, now, config))
}

/// Apply corrections, drop past events and sort.
///
/// Entries with an unknown event type or unreadable timestamp are skipped with
/// a warning.
pub fn upcoming(raw: &[AdmiraltyEvent], now: DateTime<Utc>, config: &TideConfig) -> Vec<TideEvent> {
    let mut events: Vec<TideEvent> = raw
        .iter()
        .filter_map(|entry| {
            let Some(kind) = TideKind::from_event_type(&entry.event_type) else {
                log::warn!("Skipping tide event of type {:?}", entry.event_type);
                return None;
            };
            let Some(at) = parse_timestamp(&entry.date_time) else {
                log::warn!("Skipping tide event at {:?}", entry.date_time);
                return None;
            };
            Some(TideEvent {
                kind,
                at: at + correction(kind, config),
            })
        })
        .filter(|event| event.at > now)
        .collect();

    events.sort_by_key(|event| event.at);
    events
}

fn correction(kind: TideKind, config: &TideConfig) -> Duration {
    match kind {
        TideKind::High => Duration::minutes(config.high_correction_minutes),
        TideKind::Low => Duration::minutes(config.low_correction_minutes),
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BODY: &str = r#"[
        {"EventType":"LowWater","DateTime":"2024-03-01T03:12:00","IsApproximateTime":false,"Height":0.41},
        {"EventType":"HighWater","DateTime":"2024-03-01T09:41:00","IsApproximateTime":false,"Height":6.32},
        {"EventType":"LowWater","DateTime":"2024-03-01T15:58:30.5","IsApproximateTime":false,"Height":0.62},
        {"EventType":"HighWater","DateTime":"2024-03-01T22:05:00Z","IsApproximateTime":false,"Height":6.11}
    ]"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_keeps_only_future_events() {
        let events = parse_events(BODY, now(), &TideConfig::default()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, TideKind::High);
        assert_eq!(events[0].label(&Utc), "H09:41");
        assert_eq!(events[1].label(&Utc), "L15:58");
        assert_eq!(events[2].label(&Utc), "H22:05");
    }

    #[test]
    fn test_corrections_apply_before_filtering() {
        let config = TideConfig {
            high_correction_minutes: -15,
            low_correction_minutes: 20,
            ..TideConfig::default()
        };
        let events = parse_events(BODY, now(), &config).unwrap();
        // 09:41 - 15 min = 09:26, now in the past
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].label(&Utc), "L16:18");
        assert_eq!(events[1].label(&Utc), "H21:50");
    }

    #[test]
    fn test_events_are_sorted() {
        let raw = vec![
            AdmiraltyEvent {
                event_type: "HighWater".to_string(),
                date_time: "2024-03-01T20:00:00".to_string(),
            },
            AdmiraltyEvent {
                event_type: "LowWater".to_string(),
                date_time: "2024-03-01T14:00:00".to_string(),
            },
        ];
        let events = upcoming(&raw, now(), &TideConfig::default());
        assert_eq!(events[0].kind, TideKind::Low);
        assert_eq!(events[1].kind, TideKind::High);
    }

    #[test]
    fn test_unknown_entries_are_skipped() {
        let raw = vec![
            AdmiraltyEvent {
                event_type: "SlackWater".to_string(),
                date_time: "2024-03-01T12:00:00".to_string(),
            },
            AdmiraltyEvent {
                event_type: "HighWater".to_string(),
                date_time: "tomorrow".to_string(),
            },
        ];
        assert!(upcoming(&raw, now(), &TideConfig::default()).is_empty());
    }

    #[test]
    fn test_event_exactly_now_is_not_future() {
        let raw = vec![AdmiraltyEvent {
            event_type: "HighWater".to_string(),
            date_time: "2024-03-01T09:30:00".to_string(),
        }];
        assert!(upcoming(&raw, now(), &TideConfig::default()).is_empty());
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_events("{\"message\":\"Access denied\"}", now(), &TideConfig::default()),
            Err(TideError::Json(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 41, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T09:41:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:41"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:41:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("01/03/2024"), None);
    }

    #[test]
    fn test_events_url() {
        assert_eq!(
            events_url(&TideConfig::default()),
            "https://admiraltyapi.azure-api.net/uktidalapi/api/V1/Stations/0113/TidalEvents?duration=2"
        );
    }

    #[tokio::test]
    async fn test_fetch_without_key_skips_network() {
        let client = Client::new();
        let events = fetch(&client, &TideConfig::default(), now()).await.unwrap();
        assert!(events.is_empty());
    }
}
