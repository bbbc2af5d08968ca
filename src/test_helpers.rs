//! Shared test utilities for the imgtool test suite.
//!
//! Synthetic images are generated on the fly, so the tests need no fixture
//! files on disk.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// An RGB image with a horizontal/vertical gradient, so resampling and
/// compression have real content to work with.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Encode `img` in `format` with the format's default settings.
pub fn encode_test_image(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}
