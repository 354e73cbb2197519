//! High-level image operations.
//!
//! These functions combine naming and dimension calculations with backend
//! execution. They take a planned rendition, compute parameters, and call
//! the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_scaled_height;
use super::params::{EncodeParams, Quality, ResizeParams};
use crate::naming::{Rendition, staged_file_name};
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Plan a resize of `source` to `width` without executing it.
///
/// The output lands in `staged_dir` under the staged name for
/// `(slug, width)`, shared by every format encoded from it.
pub fn plan_resize(
    source: &Path,
    source_dims: (u32, u32),
    staged_dir: &Path,
    slug: &str,
    width: u32,
) -> ResizeParams {
    ResizeParams {
        source: source.to_path_buf(),
        output: staged_dir.join(staged_file_name(slug, width)),
        width,
        height: calculate_scaled_height(source_dims, width),
    }
}

/// Resize a source to one width. Returns the staged file path.
pub fn resize_to_width(
    backend: &impl ImageBackend,
    source: &Path,
    source_dims: (u32, u32),
    staged_dir: &Path,
    slug: &str,
    width: u32,
) -> Result<PathBuf> {
    let params = plan_resize(source, source_dims, staged_dir, slug, width);
    backend.resize(&params)?;
    Ok(params.output)
}

/// Plan the encode of one rendition from its staged intermediate.
///
/// Encoded files are grouped by format: `<encoded_root>/<ext>/<file>`.
pub fn plan_encode(
    staged_dir: &Path,
    encoded_root: &Path,
    rendition: &Rendition,
    quality: Quality,
) -> EncodeParams {
    EncodeParams {
        source: staged_dir.join(staged_file_name(&rendition.slug, rendition.width)),
        output: encoded_path(encoded_root, rendition),
        format: rendition.format,
        quality,
    }
}

/// Where the encode stage leaves a rendition before relocation.
pub fn encoded_path(encoded_root: &Path, rendition: &Rendition) -> PathBuf {
    encoded_root
        .join(rendition.format.extension())
        .join(rendition.file_name())
}

/// Encode one rendition. Returns the encoded file path.
pub fn encode_rendition(
    backend: &impl ImageBackend,
    staged_dir: &Path,
    encoded_root: &Path,
    rendition: &Rendition,
    quality: Quality,
) -> Result<PathBuf> {
    let params = plan_encode(staged_dir, encoded_root, rendition, quality);
    backend.encode(&params)?;
    Ok(params.output)
}
