//! # Panel Layout
//!
//! Rendering happens in two steps. [`Frame::build`] resolves every string,
//! colour and icon choice from the acquired data; [`draw`] paints a frame onto
//! a [`Canvas`] at fixed coordinates.
//!
//! ## Layout
//! The geometry is fixed and shared by both panel sizes:
//!
//! ```text
//!          (42,12) dd/mm HH:MM
//!   (31,35) ──────────────────────────── (184,35)
//!    icon   │ (72,34) temperature
//!   (28,36) ├──────────────────────·── (174,58)   · = red accent (169,58)
//!           │ (72,58) wind
//!   (31,81) ──────────────────────────── (184,81)
//!          (32,80) H06:12 / L12:40
//! ```
//!
//! Text is drawn with the ISO-8859-1 10x20 mono font, top-left anchored, so
//! the degree sign is available.

use crate::canvas::{Canvas, InkyColor};
use crate::icons::{IconCategory, IconSet};
use crate::{TideEvent, WeatherReading};
use chrono::{DateTime, TimeZone, Utc};
use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_10X20, MonoTextStyle},
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
    Pixel,
};
use std::fmt;

/// Format of the timestamp line.
pub const TIMESTAMP_FORMAT: &str = "%d/%m %H:%M";

/// Number of tide events shown.
pub const MAX_TIDES: usize = 2;

/// Dividers as (start, end) pairs, drawn in this order.
const DIVIDERS: [(Point, Point); 4] = [
    (Point::new(69, 36), Point::new(69, 81)),
    (Point::new(31, 35), Point::new(184, 35)),
    (Point::new(69, 58), Point::new(174, 58)),
    (Point::new(31, 81), Point::new(184, 81)),
];
const ACCENT: Point = Point::new(169, 58);

const TIMESTAMP_AT: Point = Point::new(42, 12);
const TEMPERATURE_AT: Point = Point::new(72, 34);
const WIND_AT: Point = Point::new(72, 58);
const TIDES_AT: Point = Point::new(32, 80);
/// Top-left corner of the weather icon or its placeholder.
pub const ICON_AT: Point = Point::new(28, 36);

const PLACEHOLDER: &str = "?";
const TEXT_COLOR: InkyColor = InkyColor::White;
const WARNING_COLOR: InkyColor = InkyColor::Red;

/// What goes in the icon slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IconChoice {
    /// Paste the loaded artwork for this category
    Icon(IconCategory),
    /// Draw a red "?" instead
    Placeholder,
}

/// Everything the panel will show, resolved but not yet drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub timestamp: String,
    pub temperature_text: String,
    pub temperature_color: InkyColor,
    pub wind_text: String,
    /// `None` when no future tide events are known
    pub tide_text: Option<String>,
    pub icon: IconChoice,
}

impl Frame {
    /// Resolve a frame.
    ///
    /// A missing reading shows as `0°` with an empty wind line; the gap is
    /// reported through the log. Tide labels use the time zone of `now`.
    pub fn build<Tz: TimeZone>(
        now: &DateTime<Tz>,
        reading: Option<&WeatherReading>,
        tides: &[TideEvent],
        category: IconCategory,
        icons: &IconSet,
        warning_temp: f64,
    ) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        let (temperature, wind) = match reading {
            Some(r) => (r.temperature, r.wind.clone()),
            None => {
                log::warn!("No weather information found, showing placeholders");
                (0, String::new())
            }
        };

        let icon = if icons.for_category(category).is_some() {
            IconChoice::Icon(category)
        } else {
            if category != IconCategory::Unknown {
                log::warn!("No icon loaded for '{}', using placeholder", category);
            }
            IconChoice::Placeholder
        };

        Frame {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            temperature_text: format!("{}°", temperature),
            temperature_color: temperature_color(temperature, warning_temp),
            wind_text: wind,
            tide_text: tide_line(now, tides),
            icon,
        }
    }
}

/// Warning colour at or above the threshold, normal text colour below it.
pub fn temperature_color(temperature: i32, warning_temp: f64) -> InkyColor {
    if f64::from(temperature) >= warning_temp {
        WARNING_COLOR
    } else {
        TEXT_COLOR
    }
}

/// The next [`MAX_TIDES`] events after `now`, e.g. `"H06:12 / L12:40"`.
pub fn tide_line<Tz: TimeZone>(now: &DateTime<Tz>, tides: &[TideEvent]) -> Option<String>
where
    Tz::Offset: fmt::Display,
{
    let now_utc = now.with_timezone(&Utc);
    let mut upcoming: Vec<&TideEvent> = tides.iter().filter(|t| t.at > now_utc).collect();
    if upcoming.is_empty() {
        return None;
    }
    upcoming.sort_by_key(|t| t.at);

    let tz = now.timezone();
    let labels: Vec<String> = upcoming
        .into_iter()
        .take(MAX_TIDES)
        .map(|t| t.label(&tz))
        .collect();
    Some(labels.join(" / "))
}

fn draw_text(canvas: &mut Canvas, text: &str, at: Point, color: InkyColor) {
    let style = MonoTextStyle::new(&FONT_10X20, color);
    Text::with_baseline(text, at, style, Baseline::Top)
        .draw(canvas)
        .ok();
}

/// Paint `frame` onto `canvas`.
///
/// The canvas should already hold the background. Icons are pasted through
/// their masks, so background shows through transparent icon pixels.
pub fn draw(canvas: &mut Canvas, frame: &Frame, icons: &IconSet) {
    let stroke = PrimitiveStyle::with_stroke(TEXT_COLOR, 1);
    for (start, end) in DIVIDERS {
        Line::new(start, end).into_styled(stroke).draw(canvas).ok();
    }
    Pixel(ACCENT, WARNING_COLOR).draw(canvas).ok();

    draw_text(canvas, &frame.timestamp, TIMESTAMP_AT, TEXT_COLOR);
    draw_text(
        canvas,
        &frame.temperature_text,
        TEMPERATURE_AT,
        frame.temperature_color,
    );
    draw_text(canvas, &frame.wind_text, WIND_AT, TEXT_COLOR);

    if let Some(tides) = &frame.tide_text {
        draw_text(canvas, tides, TIDES_AT, TEXT_COLOR);
    }

    match frame.icon {
        IconChoice::Icon(category) => match icons.for_category(category) {
            Some(asset) => canvas.paste_masked(&asset.image, &asset.mask, ICON_AT),
            None => draw_text(canvas, PLACEHOLDER, ICON_AT, WARNING_COLOR),
        },
        IconChoice::Placeholder => draw_text(canvas, PLACEHOLDER, ICON_AT, WARNING_COLOR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Resolution;
    use crate::icons::IconAsset;
    use crate::mask::{PaletteImage, UNMAPPED};
    use crate::TideKind;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn reading(temperature: i32) -> WeatherReading {
        WeatherReading {
            temperature,
            wind: "9 mph SW".to_string(),
            summary: "rain".to_string(),
        }
    }

    fn tide(kind: TideKind, minutes_from_now: i64) -> TideEvent {
        TideEvent {
            kind,
            at: now() + Duration::minutes(minutes_from_now),
        }
    }

    /// Count pixels with `color` inside the half-open box.
    fn count(canvas: &Canvas, x: (u32, u32), y: (u32, u32), color: InkyColor) -> usize {
        (y.0..y.1)
            .flat_map(|py| (x.0..x.1).map(move |px| (px, py)))
            .filter(|&(px, py)| canvas.index_at(px, py) == Some(color as u8))
            .count()
    }

    fn render(frame: &Frame, icons: &IconSet) -> Canvas {
        let mut canvas = Canvas::new(Resolution::Phat212x104, InkyColor::Black);
        draw(&mut canvas, frame, icons);
        canvas
    }

    #[test]
    fn test_temperature_color_threshold_is_inclusive() {
        assert_eq!(temperature_color(30, 25.0), InkyColor::Red);
        assert_eq!(temperature_color(25, 25.0), InkyColor::Red);
        assert_eq!(temperature_color(24, 25.0), InkyColor::White);
        assert_eq!(temperature_color(10, 25.0), InkyColor::White);
        assert_eq!(temperature_color(25, 25.5), InkyColor::White);
        assert_eq!(temperature_color(-3, -5.0), InkyColor::Red);
    }

    #[test]
    fn test_warning_temperature_is_drawn_red() {
        let icons = IconSet::new();
        let temp_box = ((72, 110), (36, 54));

        let hot = Frame::build(&now(), Some(&reading(30)), &[], IconCategory::Rain, &icons, 25.0);
        let canvas = render(&hot, &icons);
        assert!(count(&canvas, temp_box.0, temp_box.1, InkyColor::Red) > 0);

        let mild = Frame::build(&now(), Some(&reading(10)), &[], IconCategory::Rain, &icons, 25.0);
        let canvas = render(&mild, &icons);
        assert_eq!(count(&canvas, temp_box.0, temp_box.1, InkyColor::Red), 0);
        assert!(count(&canvas, temp_box.0, temp_box.1, InkyColor::White) > 0);

        let boundary = Frame::build(
            &now(),
            Some(&reading(25)),
            &[],
            IconCategory::Rain,
            &icons,
            25.0,
        );
        assert_eq!(boundary.temperature_color, InkyColor::Red);
    }

    #[test]
    fn test_no_tides_draws_no_tide_line() {
        let icons = IconSet::new();
        let frame = Frame::build(&now(), Some(&reading(12)), &[], IconCategory::Rain, &icons, 25.0);
        assert_eq!(frame.tide_text, None);

        let canvas = render(&frame, &icons);
        assert_eq!(count(&canvas, (0, 212), (82, 104), InkyColor::White), 0);
    }

    #[test]
    fn test_tide_line_shows_first_two_in_order() {
        let tides = [
            tide(TideKind::Low, 400),
            tide(TideKind::High, 30),
            tide(TideKind::High, 800),
            tide(TideKind::Low, -60),
        ];
        assert_eq!(
            tide_line(&now(), &tides),
            Some("H10:00 / L16:10".to_string())
        );
        assert_eq!(
            tide_line(&now(), &tides[..1]),
            Some("L16:10".to_string())
        );
        // Only past events
        assert_eq!(tide_line(&now(), &tides[3..]), None);

        let icons = IconSet::new();
        let frame = Frame::build(&now(), None, &tides, IconCategory::Unknown, &icons, 25.0);
        let canvas = render(&frame, &icons);
        assert!(count(&canvas, (32, 212), (82, 100), InkyColor::White) > 0);
    }

    #[test]
    fn test_missing_reading_uses_placeholders() {
        let icons = IconSet::new();
        let frame = Frame::build(&now(), None, &[], IconCategory::Unknown, &icons, 25.0);
        assert_eq!(frame.temperature_text, "0°");
        assert_eq!(frame.wind_text, "");
        assert_eq!(frame.temperature_color, InkyColor::White);
        assert_eq!(frame.icon, IconChoice::Placeholder);
        assert_eq!(frame.timestamp, "01/03 09:30");

        let canvas = render(&frame, &icons);
        assert!(count(&canvas, (28, 38), (36, 56), InkyColor::Red) > 0);
    }

    #[test]
    fn test_missing_asset_falls_back_to_placeholder() {
        let icons = IconSet::new();
        let frame = Frame::build(&now(), Some(&reading(12)), &[], IconCategory::Rain, &icons, 25.0);
        assert_eq!(frame.icon, IconChoice::Placeholder);
    }

    #[test]
    fn test_icon_is_pasted_through_mask() {
        // Left half white ink, right half background
        let mut image = PaletteImage::filled(8, 8, UNMAPPED);
        for y in 0..8 {
            for x in 0..4 {
                image.set_index(x, y, InkyColor::White as u8);
            }
        }
        let mut icons = IconSet::new();
        icons.insert("rain", IconAsset::new(image));

        let frame = Frame::build(&now(), Some(&reading(12)), &[], IconCategory::Rain, &icons, 25.0);
        assert_eq!(frame.icon, IconChoice::Icon(IconCategory::Rain));

        let canvas = render(&frame, &icons);
        assert_eq!(count(&canvas, (28, 32), (36, 44), InkyColor::White), 32);
        assert_eq!(count(&canvas, (32, 36), (36, 44), InkyColor::Black), 32);
        // No placeholder glyph
        assert_eq!(count(&canvas, (28, 40), (36, 56), InkyColor::Red), 0);
    }

    #[test]
    fn test_fixed_geometry() {
        let icons = IconSet::new();
        let frame = Frame::build(&now(), None, &[], IconCategory::Unknown, &icons, 25.0);
        let canvas = render(&frame, &icons);

        let white = Some(InkyColor::White as u8);
        assert_eq!(canvas.index_at(69, 70), white);
        assert_eq!(canvas.index_at(184, 35), white);
        assert_eq!(canvas.index_at(174, 58), white);
        assert_eq!(canvas.index_at(31, 81), white);
        assert_eq!(canvas.index_at(169, 58), Some(InkyColor::Red as u8));
        assert_eq!(canvas.index_at(185, 35), Some(InkyColor::Black as u8));
    }
}
