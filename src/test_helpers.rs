//! Shared test utilities for the picset test suite.
//!
//! Provides fixture builders for image assets and source directories, plus a
//! couple of assertion helpers for inspecting rendered markup.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let image = asset("Sunset Beach", 3000);
//! assert_eq!(image.slug, "sunset-beach");
//!
//! let tmp = source_dir(&["Sunset Beach.jpg", "harbor.png"], "base_width = 1200");
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::naming::slugify;
use crate::types::ImageAsset;

// =========================================================================
// Fixture setup
// =========================================================================

/// An [`ImageAsset`] with a 3:2 source of the given width.
///
/// Alt text is `"<basename> alt"`; no class name.
pub fn asset(basename: &str, source_width: u32) -> ImageAsset {
    ImageAsset {
        basename: basename.to_string(),
        slug: slugify(basename),
        source: PathBuf::from(format!("src/{basename}.jpg")),
        source_width,
        source_height: source_width * 2 / 3,
        alt: format!("{basename} alt"),
        class_name: None,
    }
}

/// A temp source directory containing empty files with the given names and
/// a `config.toml` with the given content (skipped when empty).
///
/// Pair with `MockBackend::with_dimensions` for pipeline tests that never
/// decode pixels.
pub fn source_dir(files: &[&str], config_toml: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for name in files {
        std::fs::write(tmp.path().join(name), b"").unwrap();
    }
    if !config_toml.is_empty() {
        std::fs::write(tmp.path().join("config.toml"), config_toml).unwrap();
    }
    tmp
}

/// Write a real gradient JPEG for tests that exercise the `image` crate.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    use image::{ImageEncoder, RgbImage};

    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Markup assertions
// =========================================================================

/// Byte offset of `needle` in `haystack`. Panics with context on a miss.
pub fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("'{needle}' not found in:\n{haystack}"))
}

/// Sorted file names directly inside `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot list {}: {e}", dir.display()))
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
