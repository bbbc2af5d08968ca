//! # imgtool
//!
//! Finish a single image from the command line: optionally resize it, stamp
//! a semi-transparent text watermark on it, and re-encode it under a new
//! name, reporting how the file size changed.
//!
//! # Architecture: One Linear Pipeline
//!
//! ```text
//! load → resize? → watermark? → encode → write | dry run
//! ```
//!
//! All decisions (target dimensions, output name, mask geometry) are pure
//! functions over plain parameter types. Pixel work goes through the
//! [`imaging::ImageCodec`] trait, so every stage can be tested against a
//! recording mock codec without decoding or encoding real images.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Builder, stage sequencing, error taxonomy and the run [`pipeline::Report`] |
//! | [`imaging`] | Dimension math, codec trait, pure-Rust codec, watermark compositing |
//! | [`naming`] | Derives `photo_edited.jpg` from `photo.jpg` |
//! | [`config`] | Optional `imgtool.toml` defaults: loading, merging, validation |
//! | [`output`] | Human-readable sizes and the end-of-run report |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate, and watermark text is laid
//! out and rasterized with `usvg`/`resvg`. No system image library is
//! needed; the binary is self-contained apart from the fonts it finds on the
//! machine.
//!
//! ## Always Blend
//!
//! A watermark with opacity 0 still runs the full compositing pass. The
//! output is then visually identical to the input but has been through the
//! same code path as any other watermark, which keeps the stage list and
//! timing predictable.
//!
//! ## Encode Before Write
//!
//! The whole output is encoded into memory before the destination is
//! touched. A failed encode never leaves a truncated file behind, and a dry
//! run can still report the exact output size.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
