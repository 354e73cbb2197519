//! Build configuration.
//!
//! Loaded from `config.toml` in the source directory, layered on top of stock
//! defaults, then adjusted by command-line flags. Unknown keys are rejected to
//! catch typos early.
//!
//! ## Two ways to size images
//!
//! One global base width for every image, with alt text in a table:
//!
//! ```toml
//! base_width = 1200
//!
//! [alt]
//! "Sunset Beach" = "Sun setting over the beach"
//! "harbor" = "Fishing boats moored at dawn"
//! ```
//!
//! Or one entry per image (keyed by file stem):
//!
//! ```toml
//! [images."Sunset Beach"]
//! base_width = 900
//! alt = "Sun setting over the beach"
//! class_name = "hero"
//! ```
//!
//! Both shapes can be mixed; a per-image value wins over the global one. The
//! base width is the image's width at the `md` breakpoint. See
//! [`plan`](crate::plan) for how every other width is derived from it.
//!
//! ## All options
//!
//! ```toml
//! url_prefix = "/images"   # Prefix for rendition URLs in markup
//! include_webp = true      # Emit WebP renditions and <source>s
//! lazyload = false         # data-srcset/data-src instead of srcset/src
//! # class_name = "hero"    # Class on every <picture>
//! quality = 80             # JPEG quality (1-100)
//! # base_width = 1200      # Global base width
//!
//! [breakpoints]            # min-width (px) per tier; xs is always 0
//! sm = 600
//! md = 1200
//! lg = 1800
//! xl = 2400
//! max = 3000
//!
//! [processing]
//! # max_processes = 4      # Parallel workers (omit for all cores)
//! ```

use crate::plan::{BaseWidth, Breakpoints, PlanError};
use crate::types::{ImageAsset, SourceImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("alt-text table {}: {source}", .path.display())]
    AltTable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{0}")]
    Plan(#[from] PlanError),
    #[error("no base width for image '{0}': set base_width globally or in [images.\"{0}\"]")]
    MissingBaseWidth(String),
    #[error("no alt text for image '{0}': add it to [alt] or [images.\"{0}\"]")]
    MissingAlt(String),
    #[error("image name '{0}' has no usable characters for a URL slug")]
    EmptySlug(String),
    #[error("images '{first}' and '{second}' both map to slug '{slug}'")]
    DuplicateSlug {
        first: String,
        second: String,
        slug: String,
    },
}

/// Build configuration loaded from `config.toml`.
///
/// All fields have defaults; user files only name what they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// URL prefix for rendition links in generated markup.
    pub url_prefix: String,
    /// Produce WebP renditions alongside JPEG.
    pub include_webp: bool,
    /// Defer loading to a client-side lazy loader.
    pub lazyload: bool,
    /// Class added to every `<picture>` (per-image `class_name` wins).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// JPEG encoding quality (1-100).
    pub quality: u32,
    /// Global base width, used for images without their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_width: Option<f64>,
    /// Breakpoint thresholds.
    pub breakpoints: BreakpointsConfig,
    /// Alt text by image basename.
    pub alt: BTreeMap<String, String>,
    /// Per-image settings by image basename.
    pub images: BTreeMap<String, ImageEntry>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            url_prefix: "/images".to_string(),
            include_webp: true,
            lazyload: false,
            class_name: None,
            quality: 80,
            base_width: None,
            breakpoints: BreakpointsConfig::default(),
            alt: BTreeMap::new(),
            images: BTreeMap::new(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Per-image overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

/// `min-width` thresholds for every tier above `xs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakpointsConfig {
    pub sm: u32,
    pub md: u32,
    pub lg: u32,
    pub xl: u32,
    pub max: u32,
}

impl Default for BreakpointsConfig {
    fn default() -> Self {
        Self {
            sm: 600,
            md: 1200,
            lg: 1800,
            xl: 2400,
            max: 3000,
        }
    }
}

impl BreakpointsConfig {
    pub fn to_breakpoints(&self) -> Result<Breakpoints, PlanError> {
        Breakpoints::from_thresholds(self.sm, self.md, self.lg, self.xl, self.max)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Values given on the command line. `None`/`false` leaves the config as is.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_width: Option<f64>,
    pub class_name: Option<String>,
    pub lazyload: bool,
    pub no_webp: bool,
    /// Alt text loaded from an external table; config `[alt]` entries win.
    pub alt: BTreeMap<String, String>,
}

impl BuildConfig {
    /// Validate config values. Everything checked here is fatal before any
    /// file is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self
            .class_name
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "class_name must not be empty".into(),
            ));
        }
        self.breakpoints.to_breakpoints()?;
        if let Some(base) = self.base_width {
            BaseWidth::new(base)?;
        }
        for (name, entry) in &self.images {
            if let Some(base) = entry.base_width {
                BaseWidth::new(base).map_err(|e| {
                    ConfigError::Validation(format!("images.\"{}\".base_width: {}", name, e))
                })?;
            }
            if entry
                .class_name
                .as_deref()
                .is_some_and(|c| c.trim().is_empty())
            {
                return Err(ConfigError::Validation(format!(
                    "images.\"{}\".class_name must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Apply command-line overrides, then re-validate.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(base) = overrides.base_width {
            self.base_width = Some(base);
        }
        if let Some(class) = overrides.class_name {
            self.class_name = Some(class);
        }
        if overrides.lazyload {
            self.lazyload = true;
        }
        if overrides.no_webp {
            self.include_webp = false;
        }
        for (name, alt) in overrides.alt {
            self.alt.entry(name).or_insert(alt);
        }
        self.validate()?;
        Ok(self)
    }

    /// Combine a scanned source with its configuration.
    ///
    /// Per-image values win over global ones. Missing base width or alt text
    /// is an error: images are never published without alt text.
    pub fn resolve_image(
        &self,
        source: &SourceImage,
    ) -> Result<(ImageAsset, BaseWidth), ConfigError> {
        let entry = self.images.get(&source.basename);

        let base = entry
            .and_then(|e| e.base_width)
            .or(self.base_width)
            .ok_or_else(|| ConfigError::MissingBaseWidth(source.basename.clone()))?;
        let base = BaseWidth::new(base)?;

        let alt = entry
            .and_then(|e| e.alt.as_ref())
            .or_else(|| self.alt.get(&source.basename))
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ConfigError::MissingAlt(source.basename.clone()))?;

        let class_name = entry
            .and_then(|e| e.class_name.clone())
            .or_else(|| self.class_name.clone());

        let slug = crate::naming::slugify(&source.basename);
        if slug.is_empty() {
            return Err(ConfigError::EmptySlug(source.basename.clone()));
        }

        let asset = ImageAsset {
            basename: source.basename.clone(),
            slug,
            source: source.path.clone(),
            source_width: source.width,
            source_height: source.height,
            alt: alt.to_string(),
            class_name,
        };
        Ok((asset, base))
    }
}

// =============================================================================
// Config loading, merging
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BuildConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Load an alt-text table: a JSON object mapping basename to alt text.
///
/// ```json
/// { "Sunset Beach": "Sun setting over the beach" }
/// ```
pub fn load_alt_table(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::AltTable {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# picset configuration
# ====================
# Place this file in the source image directory. All settings are optional
# except that every image needs a base width and alt text, either globally
# or per image. Values shown are the defaults. Unknown keys are an error.

# Prefix for rendition URLs in generated markup.
url_prefix = "/images"

# Produce WebP renditions and <source> elements alongside JPEG.
include_webp = true

# Use data-srcset/data-src for a client-side lazy loader.
lazyload = false

# Class added to every <picture> element (per-image class_name wins).
# class_name = "hero"

# JPEG quality (1-100).
quality = 80

# Width in pixels of every image at the md breakpoint. All other widths
# are derived from it: xs = base/3, sm = 2*xs, lg = 4*xs, xl = 5*xs, plus
# 2x/3x density variants.
# base_width = 1200

# ---------------------------------------------------------------------------
# Breakpoints: min-width (px) at which each tier applies. xs is always 0.
# ---------------------------------------------------------------------------
[breakpoints]
sm = 600
md = 1200
lg = 1800
xl = 2400
max = 3000

# ---------------------------------------------------------------------------
# Alt text by image file stem (required for every image)
# ---------------------------------------------------------------------------
[alt]
# "Sunset Beach" = "Sun setting over the beach"

# ---------------------------------------------------------------------------
# Per-image settings by file stem
# ---------------------------------------------------------------------------
[images]
# [images."Sunset Beach"]
# base_width = 900
# alt = "Sun setting over the beach"
# class_name = "wide"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
