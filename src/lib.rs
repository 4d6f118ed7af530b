//! # Inky Weather Core Library
//!
//! This library holds the data model and the rendering pipeline for a small
//! three-colour e-ink weather panel (212x104 or 250x122 pixels, white/black/red).
//!
//! ## Data Flow
//! 1. **Acquire**: geocode the configured place, scrape the forecast page and
//!    optionally fetch tide events ([`acquisition`])
//! 2. **Classify**: turn the forecast summary token into an
//!    [`icons::IconCategory`]
//! 3. **Lay out**: resolve every text, colour and icon choice into a
//!    [`render::Frame`]
//! 4. **Draw**: paint the frame onto a palette-indexed [`canvas::Canvas`]
//! 5. **Show**: hand the canvas to a [`display::DisplayDriver`]
//!
//! Every step after acquisition is pure and runs once per process. A failed
//! acquisition never aborts the run: the reading becomes `None`, the tide list
//! becomes empty and the panel shows placeholders.
//!
//! ## Core Types
//! - [`WeatherReading`]: the three scalar fields scraped from the forecast page
//! - [`TideEvent`]: a single high or low water event

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod acquisition;
pub mod cache;
pub mod canvas;
pub mod config;
pub mod display;
#[cfg(all(target_os = "linux", feature = "hardware"))]
pub mod hardware;
pub mod icons;
pub mod mask;
pub mod render;
pub mod tides;
pub mod weather;

/// Current conditions scraped from the forecast page.
///
/// Exactly one reading (or none) exists per run. When acquisition fails the
/// caller holds `None` rather than a zeroed value.
///
/// # Example
/// ```
/// use inky_weather_lib::WeatherReading;
///
/// let reading = WeatherReading {
///     temperature: 14,
///     wind: "9 mph SW".to_string(),
///     summary: "partly-cloudy-day".to_string(),
/// };
/// assert_eq!(reading.temperature, 14);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Whole degrees as shown on the forecast page
    pub temperature: i32,
    /// Pre-formatted wind description, e.g. "9 mph SW"
    pub wind: String,
    /// Icon token such as "rain" or "clear-day"
    pub summary: String,
}

/// High or low water.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
}

impl TideKind {
    /// Single-letter prefix used on the panel.
    pub fn prefix(self) -> char {
        match self {
            TideKind::High => 'H',
            TideKind::Low => 'L',
        }
    }

    /// Parse the leading letter of an event type such as "HighWater".
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type.chars().next()? {
            'H' => Some(TideKind::High),
            'L' => Some(TideKind::Low),
            _ => None,
        }
    }
}

impl fmt::Display for TideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A single tide event, already corrected for the local offset.
///
/// Times are kept in UTC and only converted to wall-clock time when a label is
/// formatted, so the same event renders consistently in any time zone.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use inky_weather_lib::{TideEvent, TideKind};
///
/// let event = TideEvent {
///     kind: TideKind::High,
///     at: Utc.with_ymd_and_hms(2024, 3, 1, 6, 5, 0).unwrap(),
/// };
/// assert_eq!(event.label(&Utc), "H06:05");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TideEvent {
    pub kind: TideKind,
    pub at: DateTime<Utc>,
}

impl TideEvent {
    /// Format as `<H|L><HH:MM>` in the given time zone.
    pub fn label<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        format!(
            "{}{}",
            self.kind.prefix(),
            self.at.with_timezone(tz).format("%H:%M")
        )
    }
}
