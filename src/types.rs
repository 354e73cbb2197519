//! Image records passed between pipeline stages.

use serde::Serialize;
use std::path::PathBuf;

/// A source file found by the scan, before any configuration is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceImage {
    /// File stem as written on disk (`"Sunset Beach"` for `Sunset Beach.jpg`).
    /// This is the key used for config and alt-text lookups.
    pub basename: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// One logical image with everything needed to plan and render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    pub basename: String,
    /// URL-safe identifier used in every generated path.
    pub slug: String,
    pub source: PathBuf,
    pub source_width: u32,
    pub source_height: u32,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}
