//! Source discovery.
//!
//! Stage 1 of the build pipeline. Lists the images in the source directory
//! and probes their dimensions; nothing is decoded or written.
//!
//! ## Directory Structure
//!
//! ```text
//! src/                     # Source root
//! ├── config.toml          # Build configuration (optional)
//! ├── Sunset Beach.jpg     # basename "Sunset Beach" → slug "sunset-beach"
//! ├── harbor.png
//! ├── .DS_Store            # Hidden: skipped
//! └── drafts/              # Subdirectories: not scanned
//! ```
//!
//! ## Rules
//!
//! - Only the top level is scanned.
//! - Files are matched by extension, case-insensitively, against
//!   [`supported_input_extensions`].
//! - Hidden files (leading `.`) are skipped.
//! - Results are sorted by file name, so builds are reproducible.
//! - Two files with the same stem (`photo.jpg`, `photo.png`) are an error:
//!   the stem is the configuration key.

use crate::imaging::{BackendError, ImageBackend, supported_input_extensions};
use crate::types::SourceImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("source directory not found: {}", .0.display())]
    MissingDir(PathBuf),
    #[error("no images found in {}", .0.display())]
    NoImages(PathBuf),
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("'{basename}' appears twice: {} and {}", .first.display(), .second.display())]
    DuplicateBasename {
        basename: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("cannot read {}: {source}", .path.display())]
    Identify {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// Discover source images in `root` and probe their dimensions.
pub fn scan(root: &Path, backend: &impl ImageBackend) -> Result<Vec<SourceImage>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingDir(root.to_path_buf()));
    }

    let paths = collect_image_paths(root)?;
    if paths.is_empty() {
        return Err(ScanError::NoImages(root.to_path_buf()));
    }

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let basename = basename_of(&path);
        if let Some(first) = seen.get(&basename) {
            return Err(ScanError::DuplicateBasename {
                basename,
                first: first.clone(),
                second: path,
            });
        }
        seen.insert(basename.clone(), path.clone());

        let dims = backend
            .identify(&path)
            .map_err(|source| ScanError::Identify {
                path: path.clone(),
                source,
            })?;

        images.push(SourceImage {
            basename,
            path,
            width: dims.width,
            height: dims.height,
        });
    }

    Ok(images)
}

fn collect_image_paths(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() || is_hidden(entry.path()) {
            continue;
        }
        if is_image(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

/// File stem as written on disk: `Sunset Beach.jpg` → `Sunset Beach`.
fn basename_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
