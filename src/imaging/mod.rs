//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize → staged PNG** | Lanczos3 `resize_exact` |
//! | **Encode → JPEG / WebP** | `JpegEncoder` / `webp::Encoder`, both at the configured quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::calculate_scaled_height;
pub use operations::{encode_rendition, encoded_path, resize_to_width};
pub use params::{EncodeParams, Quality, ResizeParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
