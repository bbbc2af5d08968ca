//! Image codec trait and shared error type.
//!
//! The [`ImageCodec`] trait is the capability surface the pipeline calls into
//! for anything that touches pixels in a format-specific way: decode, resize,
//! text rasterization and encode. The decision logic (which size, which mask,
//! how to blend) lives outside of it.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), pure Rust, statically
//! linked. Tests use the recording `MockCodec` in this module.

use super::params::{EncodeParams, TextParams};
use image::{DynamicImage, GrayImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Resize failed: {0}")]
    Resize(String),
    #[error("Text rasterization failed: {0}")]
    Rasterize(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Trait for image codecs.
///
/// Operations that produce a new image take their input by value, so every
/// stage owns exactly one image at a time and the previous one is dropped
/// as soon as the next exists.
pub trait ImageCodec {
    /// Decode an in-memory encoded image, sniffing the format from its bytes.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Resample to exactly `width` x `height`.
    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, CodecError>;

    /// Rasterize a line of text into a single-channel coverage mask.
    ///
    /// Empty text yields a blank mask, never an error.
    fn rasterize_text(&self, params: &TextParams) -> Result<GrayImage, CodecError>;

    /// Encode to an in-memory buffer.
    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, CodecError>;
}
