//! Pure Rust codec: everything statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image::load_from_memory` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Text → coverage mask | `usvg` (text layout, system fonts) + `resvg` (raster) |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → everything else | `DynamicImage::write_to` with the format's default settings |

use super::backend::{CodecError, ImageCodec};
use super::params::{EncodeParams, TextParams};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GrayImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on either side of the text raster, to avoid pathological allocations.
const MAX_TEXT_RASTER: u32 = 16_384;

/// Upper bound on the buffers a single resize may allocate, in bytes.
const MAX_RESIZE_ALLOC: u128 = 4 << 30;

/// Bytes a Lanczos resize of `image` to `width`x`height` allocates: the
/// `Rgba32F` intermediate from the vertical pass plus the output buffer.
fn resize_alloc(image: &DynamicImage, width: u32, height: u32) -> u128 {
    let intermediate = u128::from(image.width()) * u128::from(height) * 16;
    let output =
        u128::from(width) * u128::from(height) * u128::from(image.color().bytes_per_pixel());
    intermediate + output
}

/// Codec backed by the `image` crate, with `resvg` for text.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape text for use inside an SVG element or attribute.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn build_fontdb(params: &TextParams) -> Result<Arc<usvg::fontdb::Database>, CodecError> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    if let Some(path) = &params.font_file {
        db.load_font_file(path).map_err(|e| {
            CodecError::Rasterize(format!("Failed to load font {}: {}", path.display(), e))
        })?;
    }
    // fontdb maps the generic families to Windows/macOS names by default,
    // which are often missing on Linux; point sans-serif at any loaded face.
    let sans = usvg::fontdb::Query {
        families: &[usvg::fontdb::Family::SansSerif],
        ..Default::default()
    };
    if db.query(&sans).is_none() {
        let first_family = db
            .faces()
            .next()
            .and_then(|face| face.families.first().map(|(name, _)| name.clone()));
        if let Some(name) = first_family {
            debug!(family = %name, "substituting sans-serif family");
            db.set_sans_serif_family(name);
        }
    }
    debug!(faces = db.len(), "font database ready");
    Ok(Arc::new(db))
}

/// Lay the text out on a canvas large enough for any glyphs it could contain.
fn text_svg(params: &TextParams) -> Result<(String, u32, u32), CodecError> {
    let px = params.pixel_size();
    if !px.is_finite() || px <= 0.0 {
        return Err(CodecError::Rasterize(format!(
            "invalid font size: {}pt",
            params.font_size
        )));
    }

    let chars = params.text.chars().count() as f32;
    let width = (px * (chars * 1.2 + 1.0)).ceil() as u32;
    let height = (px * 2.0).ceil() as u32;
    if width > MAX_TEXT_RASTER || height > MAX_TEXT_RASTER {
        return Err(CodecError::Rasterize(format!(
            "text raster too large: {width}x{height} (max {MAX_TEXT_RASTER}x{MAX_TEXT_RASTER})"
        )));
    }

    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="{x}" y="{y}" font-family="{family}, sans-serif" font-size="{px}" fill="#ffffff" xml:space="preserve">{text}</text></svg>"##,
        x = px * 0.5,
        y = px * 1.3,
        family = escape_xml(&params.font_family),
        text = escape_xml(&params.text),
    );
    Ok((svg, width, height))
}

/// Alpha channel of a premultiplied RGBA buffer, cropped to its inked area.
///
/// A buffer with no ink at all becomes a 1x1 blank mask.
fn coverage_mask(rgba: &[u8], width: u32, height: u32) -> GrayImage {
    let alpha = GrayImage::from_fn(width, height, |x, y| {
        image::Luma([rgba[((y * width + x) * 4 + 3) as usize]])
    });

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in alpha.enumerate_pixels() {
        if p.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => {
            image::imageops::crop_imm(&alpha, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
        None => GrayImage::new(1, 1),
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, CodecError> {
        if width == 0 || height == 0 {
            return Err(CodecError::Resize(format!(
                "target dimensions must be nonzero, got {width}x{height}"
            )));
        }
        let needed = resize_alloc(&image, width, height);
        if needed > MAX_RESIZE_ALLOC {
            return Err(CodecError::Resize(format!(
                "cannot allocate {width}x{height}: needs {needed} bytes (max {MAX_RESIZE_ALLOC})"
            )));
        }
        Ok(image.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn rasterize_text(&self, params: &TextParams) -> Result<GrayImage, CodecError> {
        if params.text.trim().is_empty() {
            return Ok(GrayImage::new(1, 1));
        }

        let (svg, width, height) = text_svg(params)?;
        let opts = usvg::Options {
            fontdb: build_fontdb(params)?,
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&svg, &opts)
            .map_err(|e| CodecError::Rasterize(format!("Failed to lay out text: {e}")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| CodecError::Rasterize("failed to allocate text pixmap".into()))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );

        let mask = coverage_mask(pixmap.data(), width, height);
        debug!(
            width = mask.width(),
            height = mask.height(),
            "rasterized watermark text"
        );
        Ok(mask)
    }

    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, CodecError> {
        let mut buf = Cursor::new(Vec::new());
        let quality = params.quality.value();

        let result = match params.format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                match image.color() {
                    ColorType::L8 | ColorType::Rgb8 => image.write_with_encoder(encoder),
                    // JPEG has no alpha and no 16-bit mode
                    _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder),
                }
            }
            ImageFormat::Avif => {
                let encoder = AvifEncoder::new_with_speed_quality(&mut buf, 6, quality);
                image.write_with_encoder(encoder)
            }
            other => image.write_to(&mut buf, other),
        };

        result.map_err(|e| CodecError::Encode(format!("{:?}: {}", params.format, e)))?;
        Ok(buf.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{Quality, WatermarkSpec};
    use crate::test_helpers::{encode_test_image, gradient_image};

    #[test]
    fn decode_synthetic_png() {
        let bytes = encode_test_image(&gradient_image(64, 48), ImageFormat::Png);

        let img = RustCodec::new().decode(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn decode_garbage_errors() {
        let result = RustCodec::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn resize_exact_dimensions() {
        let resized = RustCodec::new()
            .resize(gradient_image(200, 100), 50, 70)
            .unwrap();
        assert_eq!((resized.width(), resized.height()), (50, 70));
    }

    #[test]
    fn resize_to_zero_errors() {
        let result = RustCodec::new().resize(gradient_image(20, 20), 0, 10);
        assert!(matches!(result, Err(CodecError::Resize(_))));
    }

    #[test]
    fn resize_beyond_allocation_limit_errors() {
        let codec = RustCodec::new();
        for (w, h) in [(400_000_000, 400_000_000), (4_000_000_000, 4_000_000_000), (1, 300_000_000)] {
            let result = codec.resize(gradient_image(4, 4), w, h);
            assert!(matches!(result, Err(CodecError::Resize(_))), "{w}x{h}");
        }
    }

    #[test]
    fn resize_alloc_counts_intermediate_and_output() {
        // 100 source columns x 50 rows of Rgba32F, plus 20x50 RGB8
        assert_eq!(resize_alloc(&gradient_image(100, 10), 20, 50), 100 * 50 * 16 + 20 * 50 * 3);
    }

    #[test]
    fn encode_jpeg_roundtrips_dimensions() {
        let codec = RustCodec::new();
        let bytes = codec
            .encode(
                &gradient_image(120, 80),
                &EncodeParams {
                    format: ImageFormat::Jpeg,
                    quality: Quality::new(85),
                },
            )
            .unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let back = codec.decode(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (120, 80));
    }

    #[test]
    fn encode_jpeg_flattens_alpha() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(16, 16));
        let bytes = RustCodec::new()
            .encode(
                &rgba,
                &EncodeParams {
                    format: ImageFormat::Jpeg,
                    quality: Quality::default(),
                },
            )
            .unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn lower_jpeg_quality_is_smaller() {
        let codec = RustCodec::new();
        let img = gradient_image(256, 256);
        let encode = |q| {
            codec
                .encode(
                    &img,
                    &EncodeParams {
                        format: ImageFormat::Jpeg,
                        quality: Quality::new(q),
                    },
                )
                .unwrap()
                .len()
        };
        assert!(encode(10) < encode(95));
    }

    #[test]
    fn encode_png() {
        let bytes = RustCodec::new()
            .encode(
                &gradient_image(10, 10),
                &EncodeParams {
                    format: ImageFormat::Png,
                    quality: Quality::default(),
                },
            )
            .unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn rasterize_empty_text_is_blank() {
        let mask = RustCodec::new()
            .rasterize_text(&WatermarkSpec::new("").text_params())
            .unwrap();
        assert_eq!(mask.dimensions(), (1, 1));
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn rasterize_text_produces_ink_when_fonts_exist() {
        let params = WatermarkSpec::new("Sample").text_params();
        let mask = RustCodec::new().rasterize_text(&params).unwrap();

        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if db.len() == 0 {
            // No fonts on this machine: text is dropped, mask stays blank
            assert_eq!(mask.dimensions(), (1, 1));
            return;
        }
        assert!(mask.pixels().any(|p| p.0[0] > 0));
        // Cropped tightly: no taller than the layout canvas
        assert!(mask.height() <= (params.pixel_size() * 2.0).ceil() as u32);
    }

    #[test]
    fn rasterize_rejects_nonpositive_font_size() {
        let mut spec = WatermarkSpec::new("x");
        spec.font_size = 0.0;
        let result = RustCodec::new().rasterize_text(&spec.text_params());
        assert!(matches!(result, Err(CodecError::Rasterize(_))));
    }

    #[test]
    fn escape_xml_handles_markup() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn coverage_mask_crops_to_ink() {
        // 4x3 buffer with ink at (1,1) and (2,1)
        let mut rgba = vec![0u8; 4 * 3 * 4];
        rgba[(4 + 1) * 4 + 3] = 200;
        rgba[(4 + 2) * 4 + 3] = 100;

        let mask = coverage_mask(&rgba, 4, 3);
        assert_eq!(mask.dimensions(), (2, 1));
        assert_eq!(mask.get_pixel(0, 0).0[0], 200);
        assert_eq!(mask.get_pixel(1, 0).0[0], 100);
    }
}
