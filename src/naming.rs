//! Rendition naming: the one place output file names are formatted.
//!
//! Resizing writes files under these names and the renderer links to them, so
//! the two must never disagree. Every path and URL in the crate is derived
//! from [`Rendition::file_name`]:
//!
//! ```text
//! basename "Sunset Beach" → slug "sunset-beach"
//!
//! staged   <temp>/staged/sunset-beach-400w.png
//! output   <output>/sunset-beach/sunset-beach-400w.jpg
//! url      /images/sunset-beach/sunset-beach-400w.jpg
//! fragment <output>/sunset-beach/index.html
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Encoded output format of a rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpg,
    Webp,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpg => "jpg",
            Format::Webp => "webp",
        }
    }

    /// Largest width or height the encoder accepts, in pixels.
    pub fn max_dimension(self) -> u32 {
        match self {
            Format::Jpg => 65_535,
            Format::Webp => 16_383,
        }
    }

    /// MIME type for the `type` attribute of `<source>`.
    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Jpg => "image/jpeg",
            Format::Webp => "image/webp",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Turn a display basename into a filesystem- and URL-safe slug.
///
/// - `"Sunset Beach"` → `"sunset-beach"`
/// - `"Café_Terrace"` → `"cafe-terrace"`
/// - `"IMG 0042 (edit)"` → `"img-0042-edit"`
///
/// Returns an empty string when nothing usable remains (e.g. `"!!!"`);
/// callers treat that as a configuration error.
pub fn slugify(basename: &str) -> String {
    slug::slugify(basename)
}

/// `<slug>-<width>w`, shared by staged and encoded files.
fn stem(slug: &str, width: u32) -> String {
    format!("{}-{}w", slug, width)
}

/// File name of the lossless intermediate for one (slug, width).
///
/// Resizing writes one of these per distinct width; encoding reads it once
/// per output format.
pub fn staged_file_name(slug: &str, width: u32) -> String {
    format!("{}.png", stem(slug, width))
}

/// Path of the markup fragment for one image.
pub fn fragment_path(root: &Path, slug: &str) -> PathBuf {
    root.join(slug).join("index.html")
}

/// One encoded output file: an image slug at a width in a format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Rendition {
    pub slug: String,
    pub width: u32,
    pub format: Format,
}

impl Rendition {
    pub fn new(slug: &str, width: u32, format: Format) -> Self {
        Self {
            slug: slug.to_string(),
            width,
            format,
        }
    }

    /// `sunset-beach-400w.jpg`
    pub fn file_name(&self) -> String {
        format!("{}.{}", stem(&self.slug, self.width), self.format.extension())
    }

    /// Final location under the output root: `<root>/<slug>/<file_name>`.
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.slug).join(self.file_name())
    }

    /// Public URL: `<prefix>/<slug>/<file_name>`.
    ///
    /// A trailing slash on the prefix is ignored, so `"/images"` and
    /// `"/images/"` produce the same URL. An empty prefix yields a
    /// root-relative URL.
    pub fn url(&self, prefix: &str) -> String {
        format!(
            "{}/{}/{}",
            prefix.trim_end_matches('/'),
            self.slug,
            self.file_name()
        )
    }
}
