//! Text watermark compositing.
//!
//! A watermark is stamped in four steps:
//!
//! ```text
//! text ──rasterize──▶ coverage mask ──× opacity──▶ ──pad 25px──▶ ──tile/place──▶ alpha (W×H)
//!                                                                                  │
//! source ─────────────────────────────── blend(alpha, foreground, source) ◀────────┘
//! ```
//!
//! Rasterization is delegated to the [`ImageCodec`]; everything after that is
//! plain buffer arithmetic done here.
//!
//! The blend is a true alpha blend (`a·fg + (1−a)·src`), so anti-aliased glyph
//! edges come out smooth. It always runs, even at opacity 0, where it is an
//! identity up to rounding.

use super::backend::{CodecError, ImageCodec};
use super::calculations::tile_count;
use super::params::{Opacity, WATERMARK_MARGIN, WatermarkSpec};
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, Rgb};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("Watermark text could not be rasterized: {0}")]
    Rasterize(#[from] CodecError),
    #[error("Watermark layer is {actual:?}, expected {expected:?}")]
    LayerMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Unsupported color model for watermarking: {0:?}")]
    UnsupportedColor(image::ColorType),
}

/// Multiply every mask value by `opacity`, truncating back to 8 bits.
pub fn scale_mask(mask: &GrayImage, opacity: Opacity) -> GrayImage {
    let factor = opacity.value();
    let mut out = mask.clone();
    for p in out.pixels_mut() {
        p.0[0] = (p.0[0] as f64 * factor) as u8;
    }
    out
}

/// Surround the mask with `margin` blank pixels on every side.
pub fn pad_mask(mask: &GrayImage, margin: u32) -> GrayImage {
    let mut out = GrayImage::new(mask.width() + 2 * margin, mask.height() + 2 * margin);
    image::imageops::replace(&mut out, mask, i64::from(margin), i64::from(margin));
    out
}

/// Repeat the mask across a canvas that fully covers `width` x `height`,
/// then crop to exactly that size.
pub fn tile_mask(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (mw, mh) = mask.dimensions();
    let across = tile_count(width, mw);
    let down = tile_count(height, mh);
    debug!(across, down, tile_w = mw, tile_h = mh, "tiling watermark");

    let mut canvas = GrayImage::new(across * mw, down * mh);
    for row in 0..down {
        for col in 0..across {
            image::imageops::replace(
                &mut canvas,
                mask,
                i64::from(col * mw),
                i64::from(row * mh),
            );
        }
    }
    image::imageops::crop_imm(&canvas, 0, 0, width, height).to_image()
}

/// Place a single copy of the mask at the origin of a `width` x `height`
/// canvas. Anything outside the mask has zero coverage; anything beyond the
/// canvas is cut off.
pub fn place_mask(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut canvas = GrayImage::new(width, height);
    image::imageops::replace(&mut canvas, mask, 0, 0);
    canvas
}

/// Rasterize, scale and pad the watermark mask for `spec`.
pub fn build_mask(
    codec: &impl ImageCodec,
    spec: &WatermarkSpec,
) -> Result<GrayImage, CompositeError> {
    let raw = codec.rasterize_text(&spec.text_params())?;
    let scaled = scale_mask(&raw, spec.opacity);
    Ok(pad_mask(&scaled, WATERMARK_MARGIN))
}

/// A solid color covering the whole frame.
///
/// Stored as a single pixel and extended to every coordinate on demand, so a
/// full-frame layer costs nothing to build.
#[derive(Debug, Clone, Copy)]
pub struct ForegroundLayer {
    color: [f32; 3],
    width: u32,
    height: u32,
}

impl ForegroundLayer {
    pub fn new(color: Rgb<u8>, width: u32, height: u32) -> Self {
        let [r, g, b] = color.0;
        Self {
            color: [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0],
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Normalized color channels, reduced to luminance for gray images.
    fn channels(&self, color_channels: usize) -> [f32; 3] {
        if color_channels == 1 {
            let [r, g, b] = self.color;
            let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            [luma, luma, luma]
        } else {
            self.color
        }
    }
}

/// Blend the color channels of every pixel towards the foreground by the
/// matching alpha value. Alpha channels, if any, are left untouched.
///
/// Subpixels are normalized to `[0, 1]` through `to_unit`/`from_unit`.
fn blend_buffer<P>(
    buf: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    color_channels: usize,
    alpha: &GrayImage,
    foreground: &ForegroundLayer,
    to_unit: fn(P::Subpixel) -> f32,
    from_unit: fn(f32) -> P::Subpixel,
) where
    P: Pixel,
{
    let fg = foreground.channels(color_channels);
    for (x, y, px) in buf.enumerate_pixels_mut() {
        let a = alpha.get_pixel(x, y).0[0] as f32 / 255.0;
        for (c, ch) in px.channels_mut().iter_mut().take(color_channels).enumerate() {
            let src = to_unit(*ch);
            *ch = from_unit(a * fg[c] + (1.0 - a) * src);
        }
    }
}

fn u8_to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

fn unit_to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn u16_to_unit(v: u16) -> f32 {
    v as f32 / 65535.0
}

fn unit_to_u16(v: f32) -> u16 {
    (v * 65535.0).round().clamp(0.0, 65535.0) as u16
}

fn f32_identity(v: f32) -> f32 {
    v
}

/// Composite `foreground` over `source` through `alpha`.
///
/// The output keeps the source's dimensions and color model.
pub fn blend(
    source: DynamicImage,
    alpha: &GrayImage,
    foreground: &ForegroundLayer,
) -> Result<DynamicImage, CompositeError> {
    let expected = (source.width(), source.height());
    for actual in [alpha.dimensions(), foreground.dimensions()] {
        if actual != expected {
            return Err(CompositeError::LayerMismatch { expected, actual });
        }
    }

    let fg = foreground;
    Ok(match source {
        DynamicImage::ImageLuma8(mut b) => {
            blend_buffer(&mut b, 1, alpha, fg, u8_to_unit, unit_to_u8);
            DynamicImage::ImageLuma8(b)
        }
        DynamicImage::ImageLumaA8(mut b) => {
            blend_buffer(&mut b, 1, alpha, fg, u8_to_unit, unit_to_u8);
            DynamicImage::ImageLumaA8(b)
        }
        DynamicImage::ImageRgb8(mut b) => {
            blend_buffer(&mut b, 3, alpha, fg, u8_to_unit, unit_to_u8);
            DynamicImage::ImageRgb8(b)
        }
        DynamicImage::ImageRgba8(mut b) => {
            blend_buffer(&mut b, 3, alpha, fg, u8_to_unit, unit_to_u8);
            DynamicImage::ImageRgba8(b)
        }
        DynamicImage::ImageLuma16(mut b) => {
            blend_buffer(&mut b, 1, alpha, fg, u16_to_unit, unit_to_u16);
            DynamicImage::ImageLuma16(b)
        }
        DynamicImage::ImageLumaA16(mut b) => {
            blend_buffer(&mut b, 1, alpha, fg, u16_to_unit, unit_to_u16);
            DynamicImage::ImageLumaA16(b)
        }
        DynamicImage::ImageRgb16(mut b) => {
            blend_buffer(&mut b, 3, alpha, fg, u16_to_unit, unit_to_u16);
            DynamicImage::ImageRgb16(b)
        }
        DynamicImage::ImageRgba16(mut b) => {
            blend_buffer(&mut b, 3, alpha, fg, u16_to_unit, unit_to_u16);
            DynamicImage::ImageRgba16(b)
        }
        DynamicImage::ImageRgb32F(mut b) => {
            blend_buffer(&mut b, 3, alpha, fg, f32_identity, f32_identity);
            DynamicImage::ImageRgb32F(b)
        }
        DynamicImage::ImageRgba32F(mut b) => {
            blend_buffer(&mut b, 3, alpha, fg, f32_identity, f32_identity);
            DynamicImage::ImageRgba32F(b)
        }
        other => return Err(CompositeError::UnsupportedColor(other.color())),
    })
}

/// Stamp the watermark described by `spec` onto `source`.
pub fn apply_watermark(
    codec: &impl ImageCodec,
    source: DynamicImage,
    spec: &WatermarkSpec,
) -> Result<DynamicImage, CompositeError> {
    let (width, height) = (source.width(), source.height());
    let mask = build_mask(codec, spec)?;
    debug!(
        mask_w = mask.width(),
        mask_h = mask.height(),
        replicate = spec.replicate,
        "watermark mask ready"
    );

    let alpha = if spec.replicate {
        tile_mask(&mask, width, height)
    } else {
        place_mask(&mask, width, height)
    };
    drop(mask);

    let foreground = ForegroundLayer::new(spec.color, width, height);
    blend(source, &alpha, &foreground)
}
