//! # Weather Icons
//!
//! Maps forecast summary tokens onto a closed set of icon categories and loads
//! the matching icon artwork from disk.
//!
//! ## Classification
//! [`ICON_TABLE`] is walked in order and the first category whose token list
//! contains the summary wins. Matching is exact and case-sensitive. Anything
//! unmatched is [`IconCategory::Unknown`].
//!
//! Storm has no tokens: the forecast source never reports a storm token, so
//! nothing classifies as Storm. The category and its artwork are kept so the
//! table can grow without touching the renderer.
//!
//! ## Assets
//! Icons live in the resources directory as `icon-<key>.png`, where `<key>`
//! is [`IconCategory::key`]. Each one is decoded, mapped onto the panel
//! palette and given a mask so only its foreground is composited.

use crate::canvas::InkyColor;
use crate::mask::{build_mask, Mask, PaletteImage, DEFAULT_ALLOWED};
use crate::WeatherReading;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name prefix of icon assets.
pub const ICON_PREFIX: &str = "icon-";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconCategory {
    Snow,
    Rain,
    Cloud,
    Sun,
    Storm,
    Wind,
    Unknown,
}

impl IconCategory {
    /// Asset key, or `None` for `Unknown`.
    pub fn key(self) -> Option<&'static str> {
        match self {
            IconCategory::Snow => Some("snow"),
            IconCategory::Rain => Some("rain"),
            IconCategory::Cloud => Some("cloud"),
            IconCategory::Sun => Some("sun"),
            IconCategory::Storm => Some("storm"),
            IconCategory::Wind => Some("wind"),
            IconCategory::Unknown => None,
        }
    }
}

impl fmt::Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key().unwrap_or("unknown"))
    }
}

/// Category priority and accepted summary tokens, in match order.
pub const ICON_TABLE: &[(IconCategory, &[&str])] = &[
    (IconCategory::Snow, &["snow", "sleet"]),
    (IconCategory::Rain, &["rain"]),
    (
        IconCategory::Cloud,
        &["fog", "cloudy", "partly-cloudy-day", "partly-cloudy-night"],
    ),
    (IconCategory::Sun, &["clear-day", "clear-night"]),
    (IconCategory::Storm, &[]),
    (IconCategory::Wind, &["wind"]),
];

/// First category in `table` whose tokens contain `summary`.
pub fn classify_with(table: &[(IconCategory, &[&str])], summary: &str) -> IconCategory {
    table
        .iter()
        .find(|(_, tokens)| tokens.contains(&summary))
        .map(|(category, _)| *category)
        .unwrap_or(IconCategory::Unknown)
}

/// Classify a summary token with [`ICON_TABLE`].
pub fn classify(summary: &str) -> IconCategory {
    classify_with(ICON_TABLE, summary)
}

/// Classify an optional reading; no reading means `Unknown`.
pub fn classify_reading(reading: Option<&WeatherReading>) -> IconCategory {
    reading
        .map(|r| classify(&r.summary))
        .unwrap_or(IconCategory::Unknown)
}

#[derive(Error, Debug)]
pub enum IconError {
    #[error("icon IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("icon {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Icon artwork and its foreground mask.
#[derive(Clone, Debug)]
pub struct IconAsset {
    pub image: PaletteImage,
    pub mask: Mask,
}

impl IconAsset {
    /// Derive the mask from the default panel colours.
    pub fn new(image: PaletteImage) -> Self {
        let mask = build_mask(&image, &DEFAULT_ALLOWED);
        Self { image, mask }
    }

    /// Decode a PNG icon.
    ///
    /// Indexed PNGs keep their raw palette indices. Truecolour files are
    /// mapped onto the panel palette by exact RGB match.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IconError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        if let Ok(Some(image)) = decode_indexed(&bytes) {
            return Ok(Self::new(image));
        }
        let decoded = image::load_from_memory(&bytes).map_err(|source| IconError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let image = PaletteImage::from_rgba(&decoded.to_rgba8(), &InkyColor::PALETTE);
        Ok(Self::new(image))
    }
}

/// Raw indices of a palette PNG, or `None` for any other colour type.
fn decode_indexed(bytes: &[u8]) -> Result<Option<PaletteImage>, png::DecodingError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    if reader.info().color_type != png::ColorType::Indexed {
        return Ok(None);
    }

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    let indices = unpack_indices(
        &buf,
        frame.width,
        frame.height,
        frame.bit_depth as u8,
        frame.line_size,
    );
    Ok(PaletteImage::from_indices(frame.width, frame.height, indices))
}

/// Expand packed rows of 1, 2, 4 or 8 bit indices, leftmost pixel in the
/// high bits.
fn unpack_indices(buf: &[u8], width: u32, height: u32, bits: u8, line_size: usize) -> Vec<u8> {
    let per_byte = u32::from(8 / bits);
    let mask = ((1u16 << bits) - 1) as u8;
    let mut indices = Vec::with_capacity((width * height) as usize);
    for row in buf.chunks(line_size).take(height as usize) {
        for x in 0..width {
            let byte = row[(x / per_byte) as usize];
            let shift = 8 - u32::from(bits) * (x % per_byte + 1);
            indices.push((byte >> shift) & mask);
        }
    }
    indices
}

/// Icons keyed by category key, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct IconSet {
    icons: HashMap<String, IconAsset>,
}

impl IconSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, asset: IconAsset) {
        self.icons.insert(key.into(), asset);
    }

    pub fn get(&self, key: &str) -> Option<&IconAsset> {
        self.icons.get(key)
    }

    /// Asset for a category, if one was loaded.
    pub fn for_category(&self, category: IconCategory) -> Option<&IconAsset> {
        category.key().and_then(|key| self.get(key))
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// Load every `icon-<key>.png` in `dir`.
    ///
    /// Files that fail to decode are skipped with a warning; the directory
    /// itself must be readable.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, IconError> {
        let mut set = Self::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let Some(key) = icon_key(&path) else {
                continue;
            };
            match IconAsset::load(&path) {
                Ok(asset) => {
                    log::debug!("Loaded icon '{}' from {}", key, path.display());
                    set.insert(key, asset);
                }
                Err(e) => log::warn!("Skipping icon: {}", e),
            }
        }
        Ok(set)
    }
}

/// `icon-rain.png` → `rain`.
fn icon_key(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(ICON_PREFIX)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}
