//! Build orchestration.
//!
//! Turns a source directory into renditions and fragments in strictly ordered
//! stages. Every stage finishes before the next one starts:
//!
//! ```text
//! plan      scan + config + size planning     (no filesystem writes)
//! clean     remove <output> and <temp>, create staging dirs
//! resize    one job per (image, distinct width)         → <temp>/staged/
//! encode    one job per (image, width, format)          → <temp>/encoded/<ext>/
//! relocate  one job per rendition                       → <output>/<slug>/
//! manifest  <output>/manifest.json
//! render    one fragment per image                      → <output>/<slug>/index.html
//! ```
//!
//! Every configuration problem surfaces from [`plan_build`], before anything is
//! deleted. Within the resize, encode and relocate stages jobs run on the rayon
//! pool; the first error aborts the stage and the build. Fragment failures are
//! collected instead (see [`RenderReport`]).
//!
//! ## Output Structure
//!
//! ```text
//! build/
//! ├── manifest.json
//! └── sunset-beach/
//!     ├── index.html
//!     ├── sunset-beach-400w.jpg
//!     ├── sunset-beach-400w.webp
//!     ├── ...
//!     └── sunset-beach-4000w.webp
//! ```
//!
//! ## Progress
//!
//! Progress is reported as [`BuildEvent`]s over an optional channel; the
//! caller decides how to display them (see [`crate::output`]).

use crate::config::{BuildConfig, ConfigError};
use crate::imaging::{
    BackendError, ImageBackend, Quality, RustBackend, encode_rendition, encoded_path,
    resize_to_width,
};
use crate::naming::Rendition;
use crate::plan::{
    Breakpoint, Breakpoints, PlanError, PlannedImage, SizeSet, UpscaleWarning, plan_image,
};
use crate::render::{RenderOptions, RenderReport, render_all};
use crate::scan::{ScanError, scan};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("cannot move {} to {}: {source}", .from.display(), .to.display())]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} would be deleted by the build; it contains the source directory", .0.display())]
    UnsafeCleanTarget(PathBuf),
    #[error(
        "output {} and temp {} overlap; the temp directory is deleted after every build",
        .output.display(),
        .temp.display()
    )]
    OverlappingDirs { output: PathBuf, temp: PathBuf },
}

// ============================================================================
// Context
// ============================================================================

/// Where a build reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub source: PathBuf,
    pub output: PathBuf,
    pub temp: PathBuf,
}

impl BuildPaths {
    pub fn new(
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        temp: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            temp: temp.into(),
        }
    }

    /// Resized lossless intermediates, one per (slug, width).
    pub fn staged_dir(&self) -> PathBuf {
        self.temp.join("staged")
    }

    /// Encoded renditions grouped by format, before relocation.
    pub fn encoded_dir(&self) -> PathBuf {
        self.temp.join("encoded")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output.join("manifest.json")
    }

    /// Reject layouts where cleaning would delete the source, or where
    /// removing the temp directory would take the output with it.
    pub fn check(&self) -> Result<(), ProcessError> {
        let source = resolve(&self.source)?;
        let output = resolve(&self.output)?;
        let temp = resolve(&self.temp)?;

        for (target, given) in [(&output, &self.output), (&temp, &self.temp)] {
            if source.starts_with(target) {
                return Err(ProcessError::UnsafeCleanTarget(given.clone()));
            }
        }
        if output.starts_with(&temp) || temp.starts_with(&output) {
            return Err(ProcessError::OverlappingDirs {
                output: self.output.clone(),
                temp: self.temp.clone(),
            });
        }
        Ok(())
    }
}

/// Absolute path with symlinks resolved where it exists, and `.`/`..`
/// folded lexically where it does not.
fn resolve(path: &Path) -> Result<PathBuf, ProcessError> {
    if let Ok(real) = fs::canonicalize(path) {
        return Ok(real);
    }
    let mut resolved = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            other => resolved.push(other),
        }
    }
    // The nearest existing ancestor may itself be a symlink.
    let mut existing = resolved.as_path();
    let mut rest = Vec::new();
    while let Some(parent) = existing.parent() {
        if let Ok(real) = fs::canonicalize(existing) {
            return Ok(rest.iter().rev().fold(real, |acc: PathBuf, part| acc.join(part)));
        }
        if let Some(name) = existing.file_name() {
            rest.push(name.to_os_string());
        }
        existing = parent;
    }
    Ok(resolved)
}

/// Everything a build needs, resolved up front and shared read-only by all
/// stages.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub paths: BuildPaths,
    pub config: BuildConfig,
    pub breakpoints: Breakpoints,
    pub options: RenderOptions,
    pub quality: Quality,
    /// In source-file order.
    pub images: Vec<PlannedImage>,
}

impl BuildContext {
    pub fn rendition_count(&self) -> usize {
        self.images.iter().map(|i| i.renditions.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.images.iter().map(|i| i.warnings.len()).sum()
    }
}

/// Scan the source directory and plan every image.
///
/// Reads only: nothing is created or deleted, so every configuration error
/// is reported while previous build output is still intact.
pub fn plan_build(
    backend: &impl ImageBackend,
    paths: BuildPaths,
    config: BuildConfig,
) -> Result<BuildContext, ProcessError> {
    paths.check()?;
    config.validate()?;
    let breakpoints = config.breakpoints.to_breakpoints()?;
    let options = RenderOptions::from_config(&config);
    let formats = options.formats();

    let sources = scan(&paths.source, backend)?;

    let mut slugs: HashMap<String, String> = HashMap::new();
    let mut images = Vec::with_capacity(sources.len());
    for source in &sources {
        let (asset, base) = config.resolve_image(source)?;
        if let Some(first) = slugs.get(&asset.slug) {
            return Err(ConfigError::DuplicateSlug {
                first: first.clone(),
                second: asset.basename.clone(),
                slug: asset.slug.clone(),
            }
            .into());
        }
        slugs.insert(asset.slug.clone(), asset.basename.clone());
        images.push(plan_image(asset, base, &formats)?);
    }

    Ok(BuildContext {
        quality: Quality::new(config.quality),
        paths,
        config,
        breakpoints,
        options,
        images,
    })
}

// ============================================================================
// Events
// ============================================================================

/// A parallel pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resize,
    Encode,
    Relocate,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resize => "resize",
            Stage::Encode => "encode",
            Stage::Relocate => "relocate",
            Stage::Render => "render",
        })
    }
}

/// Progress reported while a build runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    ImagePlanned {
        /// 1-based position in source order.
        index: usize,
        basename: String,
        slug: String,
        source_width: u32,
        widths: Vec<u32>,
    },
    UpscaleWarning {
        basename: String,
        warning: UpscaleWarning,
    },
    StageCompleted {
        stage: Stage,
        jobs: usize,
    },
    FragmentWritten {
        slug: String,
        path: PathBuf,
    },
    FragmentFailed {
        slug: String,
        error: String,
    },
}

fn emit(events: &Option<Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        tx.send(event).ok();
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// The resolved build, written to `<output>/manifest.json` for downstream
/// tooling.
#[derive(Debug, Serialize)]
pub struct BuildManifest {
    pub url_prefix: String,
    pub breakpoints: Vec<Breakpoint>,
    pub images: Vec<ManifestImage>,
}

#[derive(Debug, Serialize)]
pub struct ManifestImage {
    pub basename: String,
    pub slug: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub source_width: u32,
    pub source_height: u32,
    pub sizes: SizeSet,
    pub widths: Vec<u32>,
    /// Rendition file names, relative to the image directory.
    pub renditions: Vec<String>,
    /// Fragment path relative to the output root.
    pub fragment: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UpscaleWarning>,
}

impl BuildManifest {
    pub fn from_context(ctx: &BuildContext) -> Self {
        Self {
            url_prefix: ctx.options.url_prefix.clone(),
            breakpoints: ctx.breakpoints.ascending().to_vec(),
            images: ctx
                .images
                .iter()
                .map(|planned| {
                    let asset = &planned.asset;
                    ManifestImage {
                        basename: asset.basename.clone(),
                        slug: asset.slug.clone(),
                        alt: asset.alt.clone(),
                        class_name: asset
                            .class_name
                            .clone()
                            .or_else(|| ctx.options.class_name.clone()),
                        source_width: asset.source_width,
                        source_height: asset.source_height,
                        sizes: planned.sizes,
                        widths: planned.widths.clone(),
                        renditions: planned.renditions.iter().map(Rendition::file_name).collect(),
                        fragment: format!("{}/index.html", asset.slug),
                        warnings: planned.warnings.clone(),
                    }
                })
                .collect(),
        }
    }
}

// ============================================================================
// Build
// ============================================================================

/// Result of a completed build.
#[derive(Debug)]
pub struct BuildReport {
    pub images: usize,
    pub resized: usize,
    pub renditions: usize,
    pub fragments: RenderReport,
}

/// Run every stage with the production backend.
pub fn build(
    ctx: &BuildContext,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, ProcessError> {
    build_with_backend(&RustBackend::new(), ctx, events)
}

/// Run every stage using a specific backend (allows testing with mock).
pub fn build_with_backend(
    backend: &impl ImageBackend,
    ctx: &BuildContext,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, ProcessError> {
    for (i, planned) in ctx.images.iter().enumerate() {
        emit(
            &events,
            BuildEvent::ImagePlanned {
                index: i + 1,
                basename: planned.asset.basename.clone(),
                slug: planned.asset.slug.clone(),
                source_width: planned.asset.source_width,
                widths: planned.widths.clone(),
            },
        );
        for warning in &planned.warnings {
            emit(
                &events,
                BuildEvent::UpscaleWarning {
                    basename: planned.asset.basename.clone(),
                    warning: *warning,
                },
            );
        }
    }

    clean(&ctx.paths, &ctx.options)?;

    let resized = resize_stage(backend, ctx)?;
    emit(
        &events,
        BuildEvent::StageCompleted {
            stage: Stage::Resize,
            jobs: resized,
        },
    );

    let encoded = encode_stage(backend, ctx)?;
    emit(
        &events,
        BuildEvent::StageCompleted {
            stage: Stage::Encode,
            jobs: encoded,
        },
    );

    let relocated = relocate_stage(ctx)?;
    emit(
        &events,
        BuildEvent::StageCompleted {
            stage: Stage::Relocate,
            jobs: relocated,
        },
    );
    fs::remove_dir_all(&ctx.paths.temp)?;

    let manifest = BuildManifest::from_context(ctx);
    fs::write(
        ctx.paths.manifest_path(),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    let fragments = render_all(
        &ctx.images,
        &ctx.breakpoints,
        &ctx.options,
        &ctx.paths.output,
    );
    for (slug, path) in &fragments.written {
        emit(
            &events,
            BuildEvent::FragmentWritten {
                slug: slug.clone(),
                path: path.clone(),
            },
        );
    }
    for (slug, error) in &fragments.failed {
        emit(
            &events,
            BuildEvent::FragmentFailed {
                slug: slug.clone(),
                error: error.to_string(),
            },
        );
    }
    emit(
        &events,
        BuildEvent::StageCompleted {
            stage: Stage::Render,
            jobs: ctx.images.len(),
        },
    );

    Ok(BuildReport {
        images: ctx.images.len(),
        resized,
        renditions: relocated,
        fragments,
    })
}

/// Remove previous output and temp directories, then create the staging tree.
fn clean(paths: &BuildPaths, options: &RenderOptions) -> Result<(), ProcessError> {
    paths.check()?;
    for target in [&paths.output, &paths.temp] {
        if target.exists() {
            fs::remove_dir_all(target)?;
        }
    }

    fs::create_dir_all(&paths.output)?;
    fs::create_dir_all(paths.staged_dir())?;
    for format in options.formats() {
        fs::create_dir_all(paths.encoded_dir().join(format.extension()))?;
    }
    Ok(())
}

fn resize_stage(backend: &impl ImageBackend, ctx: &BuildContext) -> Result<usize, ProcessError> {
    let staged_dir = ctx.paths.staged_dir();
    let jobs: Vec<(&PlannedImage, u32)> = ctx
        .images
        .iter()
        .flat_map(|planned| planned.widths.iter().map(move |&w| (planned, w)))
        .collect();

    jobs.par_iter().try_for_each(|(planned, width)| {
        let asset = &planned.asset;
        resize_to_width(
            backend,
            &asset.source,
            (asset.source_width, asset.source_height),
            &staged_dir,
            &asset.slug,
            *width,
        )
        .map(|_| ())
    })?;

    Ok(jobs.len())
}

fn encode_stage(backend: &impl ImageBackend, ctx: &BuildContext) -> Result<usize, ProcessError> {
    let staged_dir = ctx.paths.staged_dir();
    let encoded_dir = ctx.paths.encoded_dir();
    let jobs: Vec<&Rendition> = ctx.images.iter().flat_map(|p| &p.renditions).collect();

    jobs.par_iter().try_for_each(|rendition| {
        encode_rendition(backend, &staged_dir, &encoded_dir, rendition, ctx.quality).map(|_| ())
    })?;

    Ok(jobs.len())
}

fn relocate_stage(ctx: &BuildContext) -> Result<usize, ProcessError> {
    let encoded_dir = ctx.paths.encoded_dir();
    for planned in &ctx.images {
        fs::create_dir_all(ctx.paths.output.join(&planned.asset.slug))?;
    }

    let jobs: Vec<&Rendition> = ctx.images.iter().flat_map(|p| &p.renditions).collect();
    jobs.par_iter().try_for_each(|rendition| {
        let from = encoded_path(&encoded_dir, rendition);
        let to = rendition.path_in(&ctx.paths.output);
        move_file(&from, &to).map_err(|source| ProcessError::Relocate { from, to, source })
    })?;

    Ok(jobs.len())
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
