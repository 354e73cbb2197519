//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what files to create) and the [`backend`](super::backend)
//! (which does the actual pixel work). Swapping the backend for a mock in
//! tests leaves the operation logic untouched.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`ResizeParams`]: source, staged output path and exact target dimensions.
//! - [`EncodeParams`]: staged input, final output path, format and quality.

use crate::naming::Format;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Resize a source to exact dimensions and write a lossless intermediate.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Encode a staged intermediate into a delivery format.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: Format,
    pub quality: Quality,
}
