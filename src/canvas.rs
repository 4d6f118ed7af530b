//! Palette-indexed drawing surface for the e-ink panel.
//!
//! The canvas stores one palette index per pixel. It implements the
//! `embedded-graphics` [`DrawTarget`] trait so text and primitives draw
//! straight onto it, and supports masked pastes for icons.

use crate::display::Resolution;
use crate::mask::{Mask, PaletteImage};
use embedded_graphics::{pixelcolor::PixelColor, prelude::*, Pixel};

/// The panel palette. Discriminants are the palette indices stored in the
/// canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InkyColor {
    White = 0,
    Black = 1,
    Red = 2,
}

impl InkyColor {
    /// RGB values used when decoding icons and writing previews.
    pub const PALETTE: [[u8; 3]; 3] = [[255, 255, 255], [0, 0, 0], [255, 0, 0]];

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(InkyColor::White),
            1 => Some(InkyColor::Black),
            2 => Some(InkyColor::Red),
            _ => None,
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        Self::PALETTE[self as usize]
    }
}

impl PixelColor for InkyColor {
    type Raw = ();
}

/// Fixed-size raster of palette indices.
#[derive(Clone, Debug)]
pub struct Canvas {
    resolution: Resolution,
    pixels: Vec<u8>,
}

impl Canvas {
    /// New canvas filled with `background`.
    pub fn new(resolution: Resolution, background: InkyColor) -> Self {
        let (width, height) = resolution.dimensions();
        Self {
            resolution,
            pixels: vec![background as u8; (width * height) as usize],
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width()
    }

    pub fn height(&self) -> u32 {
        self.resolution.height()
    }

    /// Palette index at `(x, y)`, or `None` outside the canvas.
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.pixels[(y * self.width() + x) as usize])
    }

    /// Set a raw palette index; out-of-range writes are clipped.
    pub fn set_index(&mut self, x: u32, y: u32, index: u8) {
        if x < self.width() && y < self.height() {
            let width = self.width();
            self.pixels[(y * width + x) as usize] = index;
        }
    }

    /// Row-major palette indices.
    pub fn indices(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy `image` to `origin`, but only where `mask` is opaque.
    ///
    /// Transparent pixels leave whatever is already on the canvas. Parts of
    /// the image that fall outside the canvas are clipped.
    pub fn paste_masked(&mut self, image: &PaletteImage, mask: &Mask, origin: Point) {
        for y in 0..image.height() {
            for x in 0..image.width() {
                if !mask.is_opaque(x, y) {
                    continue;
                }
                let cx = origin.x + x as i32;
                let cy = origin.y + y as i32;
                if cx < 0 || cy < 0 {
                    continue;
                }
                if let Some(index) = image.index_at(x, y) {
                    self.set_index(cx as u32, cy as u32, index);
                }
            }
        }
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl DrawTarget for Canvas {
    type Color = InkyColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_index(point.x as u32, point.y as u32, color as u8);
            }
        }
        Ok(())
    }
}
