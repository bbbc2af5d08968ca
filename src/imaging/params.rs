//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the pipeline (which decides what the output should look
//! like) and the [`codec`](super::backend) (which does the actual pixel work).
//! Keeping them plain data lets tests swap in a mock codec without touching
//! any decision logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`Opacity`]: Watermark opacity in `[0, 1]`, default 0.7. Clamped on construction.
//! - [`DimensionSpec`]: Requested width/height/percent scale plus encode quality.
//! - [`WatermarkSpec`]: Watermark text, opacity, tiling, color and font.
//! - [`TextParams`]: What the codec needs to rasterize a line of text.
//! - [`EncodeParams`]: Output format and quality for the final encode.

use image::{ImageFormat, Rgb};
use std::path::PathBuf;

/// Resolution at which watermark text is rasterized.
pub const WATERMARK_DPI: u32 = 300;

/// Margin added around the watermark mask on every side, in pixels.
pub const WATERMARK_MARGIN: u32 = 25;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Watermark opacity, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opacity(f64);

impl Opacity {
    /// Clamp `value` into `[0, 1]`. NaN collapses to fully transparent.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Parse user input, keeping `self` when the input is not a number.
    ///
    /// Returns the (possibly unchanged) opacity and whether the input was accepted.
    pub fn parse_or_keep(self, input: &str) -> (Self, bool) {
        match input.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => (Self::new(v), true),
            _ => (self, false),
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(0.7)
    }
}

/// Requested output geometry and encode quality.
///
/// `pct_scale` is a fraction (`0.5` = half size); `0` means unset. A width or
/// height of `0` means "infer from the other dimension".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DimensionSpec {
    pub width: u32,
    pub height: u32,
    pub pct_scale: f64,
    pub quality: Quality,
}

/// Everything needed to stamp a text watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub text: String,
    pub opacity: Opacity,
    pub replicate: bool,
    pub color: Rgb<u8>,
    pub font_family: String,
    /// Font size in points; rendered at [`WATERMARK_DPI`].
    pub font_size: f32,
    pub font_file: Option<PathBuf>,
}

impl WatermarkSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            opacity: Opacity::default(),
            replicate: false,
            color: Rgb([255, 255, 255]),
            font_family: "sans-serif".to_string(),
            font_size: 12.0,
            font_file: None,
        }
    }

    /// Parameters for rasterizing this watermark's text.
    pub fn text_params(&self) -> TextParams {
        TextParams {
            text: self.text.clone(),
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            font_file: self.font_file.clone(),
            dpi: WATERMARK_DPI,
        }
    }
}

/// Parameters for rasterizing a single line of text into a coverage mask.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub text: String,
    pub font_family: String,
    /// Size in points.
    pub font_size: f32,
    pub font_file: Option<PathBuf>,
    pub dpi: u32,
}

impl TextParams {
    /// Font size converted from points to pixels at `dpi`.
    pub fn pixel_size(&self) -> f32 {
        self.font_size * self.dpi as f32 / 72.0
    }
}

/// Parameters for the final encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub format: ImageFormat,
    pub quality: Quality,
}
