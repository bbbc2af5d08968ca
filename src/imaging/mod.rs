//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` crate codecs |
//! | **Resize** | `resize_exact` with Lanczos3 |
//! | **Text raster** | `usvg` + `resvg` |
//! | **Watermark blend** | custom alpha compositing over `image` buffers |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Watermark**: mask building, tiling and blending on top of the codec

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
pub mod watermark;

pub use backend::{CodecError, ImageCodec};
pub use calculations::{plan_resize, resolve_dimensions, tile_count};
pub use params::{
    DimensionSpec, EncodeParams, Opacity, Quality, TextParams, WATERMARK_DPI, WATERMARK_MARGIN,
    WatermarkSpec,
};
pub use rust_backend::RustCodec;
pub use watermark::{CompositeError, apply_watermark};
