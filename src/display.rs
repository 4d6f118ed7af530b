//! # Display Drivers
//!
//! A driver advertises one of the two supported panel resolutions and accepts
//! a finished [`Canvas`] of exactly that size. Three drivers exist:
//!
//! - [`AsciiDisplay`]: one character per pixel to any writer (development)
//! - [`PngDisplay`]: an RGB PNG preview with the border drawn around it
//! - `hardware::Epd2in13bcDisplay`: the Waveshare 2.13" B/C panel
//!   (Linux, `hardware` feature)
//!
//! [`ColorPlanes`] converts a canvas into the black and red bit planes that
//! three-colour e-ink controllers expect.

use crate::canvas::{Canvas, InkyColor};
use image::{ImageFormat, RgbImage};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while opening a panel or pushing a frame.
#[derive(Error, Debug)]
pub enum DisplayError {
    /// Only 212x104 and 250x122 panels are supported
    #[error("unsupported display resolution {width}x{height}")]
    UnsupportedResolution { width: u32, height: u32 },

    /// The canvas was created for a different panel
    #[error("canvas is {actual:?} but the display expects {expected:?}")]
    ResolutionMismatch {
        expected: Resolution,
        actual: Resolution,
    },

    #[error("display IO: {0}")]
    Io(#[from] io::Error),

    #[error("preview encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// SPI/GPIO failure on the physical panel
    #[error("hardware: {0}")]
    Hardware(String),
}

/// The two panel sizes the layout is designed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// 212x104 pHAT
    Phat212x104,
    /// 250x122 pHAT
    Phat250x122,
}

impl Resolution {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Phat212x104 => (212, 104),
            Resolution::Phat250x122 => (250, 122),
        }
    }

    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    pub fn height(self) -> u32 {
        self.dimensions().1
    }
}

impl TryFrom<(u32, u32)> for Resolution {
    type Error = DisplayError;

    fn try_from((width, height): (u32, u32)) -> Result<Self, Self::Error> {
        match (width, height) {
            (212, 104) => Ok(Resolution::Phat212x104),
            (250, 122) => Ok(Resolution::Phat250x122),
            _ => Err(DisplayError::UnsupportedResolution { width, height }),
        }
    }
}

/// A panel that can show one finished frame.
pub trait DisplayDriver {
    /// The exact canvas size this driver accepts.
    fn resolution(&self) -> Resolution;

    /// Colour of the area around the active pixels.
    fn set_border(&mut self, color: InkyColor);

    /// Push the frame. Called once per run.
    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError>;
}

pub(crate) fn check_resolution(expected: Resolution, canvas: &Canvas) -> Result<(), DisplayError> {
    if canvas.resolution() != expected {
        return Err(DisplayError::ResolutionMismatch {
            expected,
            actual: canvas.resolution(),
        });
    }
    Ok(())
}

/// How the canvas maps onto the controller's native orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    None,
    /// Landscape canvas onto a portrait controller
    Clockwise90,
}

/// Black and red bit planes for a three-colour controller.
///
/// Rows are `width.div_ceil(8)` bytes, most significant bit leftmost. In the
/// black plane a set bit is white; in the red plane a set bit is red.
pub struct ColorPlanes {
    width: u32,
    height: u32,
    black: Vec<u8>,
    red: Vec<u8>,
}

impl ColorPlanes {
    /// Blank (white) planes.
    pub fn new(width: u32, height: u32) -> Self {
        let bytes_per_row = width.div_ceil(8);
        let buffer_size = (bytes_per_row * height) as usize;
        Self {
            width,
            height,
            black: vec![0xFF; buffer_size],
            red: vec![0x00; buffer_size],
        }
    }

    /// Convert a canvas. Indices outside the palette render as white.
    pub fn from_canvas(canvas: &Canvas, rotation: Rotation) -> Self {
        let (width, height) = match rotation {
            Rotation::None => (canvas.width(), canvas.height()),
            Rotation::Clockwise90 => (canvas.height(), canvas.width()),
        };
        let mut planes = Self::new(width, height);
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                let color = canvas
                    .index_at(x, y)
                    .and_then(InkyColor::from_index)
                    .unwrap_or(InkyColor::White);
                let (px, py) = match rotation {
                    Rotation::None => (x, y),
                    Rotation::Clockwise90 => (canvas.height() - 1 - y, x),
                };
                planes.set_pixel(px, py, color);
            }
        }
        planes
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: InkyColor) {
        if x >= self.width || y >= self.height {
            return;
        }

        let bytes_per_row = self.width.div_ceil(8);
        let byte_index = (y * bytes_per_row + x / 8) as usize;
        let bit_mask = 0x80 >> (x % 8);

        match color {
            InkyColor::White => {
                self.black[byte_index] |= bit_mask;
                self.red[byte_index] &= !bit_mask;
            }
            InkyColor::Black => {
                self.black[byte_index] &= !bit_mask;
                self.red[byte_index] &= !bit_mask;
            }
            InkyColor::Red => {
                self.black[byte_index] |= bit_mask;
                self.red[byte_index] |= bit_mask;
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn black(&self) -> &[u8] {
        &self.black
    }

    pub fn red(&self) -> &[u8] {
        &self.red
    }

    /// Red plane with the polarity flipped, for controllers where a cleared
    /// bit means "coloured".
    pub fn red_inverted(&self) -> Vec<u8> {
        self.red.iter().map(|b| !b).collect()
    }
}

/// Character-per-pixel preview for terminals and logs.
pub struct AsciiDisplay<W: Write> {
    resolution: Resolution,
    border: InkyColor,
    out: W,
}

impl AsciiDisplay<io::Stdout> {
    pub fn stdout(resolution: Resolution) -> Self {
        Self::new(resolution, io::stdout())
    }
}

impl<W: Write> AsciiDisplay<W> {
    pub fn new(resolution: Resolution, out: W) -> Self {
        Self {
            resolution,
            border: InkyColor::Black,
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn glyph(index: Option<u8>) -> char {
        match index.and_then(InkyColor::from_index) {
            Some(InkyColor::White) => '#',
            Some(InkyColor::Black) => ' ',
            Some(InkyColor::Red) => 'o',
            None => '?',
        }
    }
}

impl<W: Write> DisplayDriver for AsciiDisplay<W> {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn set_border(&mut self, color: InkyColor) {
        self.border = color;
    }

    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        check_resolution(self.resolution, canvas)?;
        let frame = Self::glyph(Some(self.border as u8));
        let edge: String = std::iter::repeat(frame)
            .take(canvas.width() as usize + 2)
            .collect();

        writeln!(self.out, "{edge}")?;
        for y in 0..canvas.height() {
            let row: String = (0..canvas.width())
                .map(|x| Self::glyph(canvas.index_at(x, y)))
                .collect();
            writeln!(self.out, "{frame}{row}{frame}")?;
        }
        writeln!(self.out, "{edge}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Writes the frame as a PNG, framed by the border colour.
pub struct PngDisplay {
    resolution: Resolution,
    border: InkyColor,
    path: PathBuf,
}

impl PngDisplay {
    /// Width of the border drawn around the active area.
    pub const BORDER_PX: u32 = 2;

    pub fn new<P: AsRef<Path>>(resolution: Resolution, path: P) -> Self {
        Self {
            resolution,
            border: InkyColor::Black,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Render the framed preview without writing it.
    pub fn to_image(&self, canvas: &Canvas) -> RgbImage {
        let b = Self::BORDER_PX;
        let border = image::Rgb(self.border.rgb());
        RgbImage::from_fn(canvas.width() + 2 * b, canvas.height() + 2 * b, |x, y| {
            if x < b || y < b {
                return border;
            }
            match canvas.index_at(x - b, y - b) {
                Some(index) => {
                    let color = InkyColor::from_index(index).unwrap_or(InkyColor::White);
                    image::Rgb(color.rgb())
                }
                None => border,
            }
        })
    }
}

impl DisplayDriver for PngDisplay {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn set_border(&mut self, color: InkyColor) {
        self.border = color;
    }

    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        check_resolution(self.resolution, canvas)?;
        self.to_image(canvas)
            .save_with_format(&self.path, ImageFormat::Png)?;
        log::info!("Wrote preview to {}", self.path.display());
        Ok(())
    }
}
