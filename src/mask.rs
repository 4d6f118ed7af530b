//! # Palette Images and Opacity Masks
//!
//! Icons are stored as palette-indexed rasters: every pixel holds a small
//! integer selecting one of the panel's colours. Pixels that do not belong to
//! the panel palette (the icon background) carry [`UNMAPPED`].
//!
//! A [`Mask`] marks which pixels of an icon are foreground. It is packed one
//! bit per pixel, rows padded to whole bytes with the most significant bit
//! leftmost, the same layout the e-ink frame planes use.

use crate::canvas::InkyColor;
use image::RgbaImage;

/// Palette index given to pixels that match no palette entry.
pub const UNMAPPED: u8 = 0xFF;

/// Indices treated as foreground when building icon masks: the panel's
/// white, black and red.
pub const DEFAULT_ALLOWED: [u8; 3] = [
    InkyColor::White as u8,
    InkyColor::Black as u8,
    InkyColor::Red as u8,
];

/// A raster of palette indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteImage {
    width: u32,
    height: u32,
    indices: Vec<u8>,
}

impl PaletteImage {
    /// Create an image filled with a single index.
    pub fn filled(width: u32, height: u32, index: u8) -> Self {
        Self {
            width,
            height,
            indices: vec![index; (width * height) as usize],
        }
    }

    /// Wrap row-major indices. Returns `None` when the length does not match.
    pub fn from_indices(width: u32, height: u32, indices: Vec<u8>) -> Option<Self> {
        if indices.len() != (width * height) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            indices,
        })
    }

    /// Map a decoded RGBA image onto `palette`.
    ///
    /// A pixel takes the position of the palette entry whose RGB value it
    /// matches exactly. Fully transparent pixels and colours outside the
    /// palette become [`UNMAPPED`].
    pub fn from_rgba(source: &RgbaImage, palette: &[[u8; 3]]) -> Self {
        let (width, height) = source.dimensions();
        let indices = source
            .pixels()
            .map(|px| {
                let [r, g, b, a] = px.0;
                if a == 0 {
                    return UNMAPPED;
                }
                palette
                    .iter()
                    .position(|entry| *entry == [r, g, b])
                    .map(|i| i as u8)
                    .unwrap_or(UNMAPPED)
            })
            .collect();
        Self {
            width,
            height,
            indices,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Palette index at `(x, y)`, or `None` outside the image.
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices.get((y * self.width + x) as usize).copied()
    }

    pub fn set_index(&mut self, x: u32, y: u32, index: u8) {
        if x < self.width && y < self.height {
            self.indices[(y * self.width + x) as usize] = index;
        }
    }
}

/// One-bit opacity mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl Mask {
    /// A fully transparent mask.
    pub fn new(width: u32, height: u32) -> Self {
        let bytes_per_row = width.div_ceil(8);
        Self {
            width,
            height,
            bits: vec![0x00; (bytes_per_row * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn locate(&self, x: u32, y: u32) -> (usize, u8) {
        let bytes_per_row = self.width.div_ceil(8);
        let byte_index = (y * bytes_per_row + x / 8) as usize;
        (byte_index, 0x80 >> (x % 8))
    }

    /// True when the pixel at `(x, y)` should replace the background.
    /// Out-of-range coordinates are transparent.
    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (byte_index, bit) = self.locate(x, y);
        self.bits[byte_index] & bit != 0
    }

    pub fn set_opaque(&mut self, x: u32, y: u32, opaque: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (byte_index, bit) = self.locate(x, y);
        if opaque {
            self.bits[byte_index] |= bit;
        } else {
            self.bits[byte_index] &= !bit;
        }
    }

    /// Number of opaque pixels.
    pub fn opaque_count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }
}

/// Build a mask that is opaque exactly where `source` holds an index listed in
/// `allowed`.
///
/// An allow-list that shares no index with the image gives an all-transparent
/// mask; that is not an error.
pub fn build_mask(source: &PaletteImage, allowed: &[u8]) -> Mask {
    let mut mask = Mask::new(source.width, source.height);
    for y in 0..source.height {
        for x in 0..source.width {
            let index = source.indices[(y * source.width + x) as usize];
            if allowed.contains(&index) {
                mask.set_opaque(x, y, true);
            }
        }
    }
    mask
}
