//! `<picture>` fragment rendering.
//!
//! Final stage of the build pipeline. Each image becomes one self-contained
//! HTML fragment at `<output>/<slug>/index.html`, ready to be included by
//! whatever templating the site uses.
//!
//! ## Source order
//!
//! Browsers take the first `<source>` whose media query matches, so sources
//! are emitted most-specific first:
//!
//! ```text
//! for format in [webp (optional), jpg]:
//!     max   (min-width: 3000px)                          → xl2x
//!     xl    (min-width: 2400px) and 2x density            → xl2x
//!           (min-width: 2400px)                          → xl
//!     lg, md, sm: same pair as xl
//!     xs    (min-resolution: 384dpi)                     → xs3x
//!           (-webkit-min-device-pixel-ratio: 3)          → xs3x
//!           (min-resolution: 192dpi)                     → xs2x
//!           (-webkit-min-device-pixel-ratio: 2)          → xs2x
//!           no media                                     → xs
//! <img> → xl2x JPEG
//! ```
//!
//! ## Lazy loading
//!
//! With `lazyload` the URLs move to `data-srcset` / `data-src` for a
//! client-side loader and the `<picture>` gets `img--lazyload`; otherwise
//! plain `srcset` / `src` and `img--no-lazyload`.
//!
//! Uses [maud](https://maud.lambda.xyz/); attribute values are escaped.

use crate::config::BuildConfig;
use crate::naming::{Format, Rendition, fragment_path};
use crate::plan::{Breakpoints, Density, PlannedImage, SizeSet, Tier};
use crate::types::ImageAsset;
use maud::{Markup, html};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image '{0}' has no alt text")]
    MissingAlt(String),
    #[error("cannot write fragment {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub const LAZYLOAD_CLASS: &str = "img--lazyload";
pub const NO_LAZYLOAD_CLASS: &str = "img--no-lazyload";

/// Everything about markup that is configured rather than planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub include_webp: bool,
    pub lazyload: bool,
    /// Fallback class for images without their own.
    pub class_name: Option<String>,
    pub url_prefix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_webp: true,
            lazyload: false,
            class_name: None,
            url_prefix: "/images".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            include_webp: config.include_webp,
            lazyload: config.lazyload,
            class_name: config.class_name.clone(),
            url_prefix: config.url_prefix.clone(),
        }
    }

    /// Formats in `<source>` order: WebP first when enabled, JPEG always.
    pub fn formats(&self) -> Vec<Format> {
        if self.include_webp {
            vec![Format::Webp, Format::Jpg]
        } else {
            vec![Format::Jpg]
        }
    }
}

/// One `<source>` element before it becomes markup.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceSpec {
    media: Option<String>,
    mime: &'static str,
    url: String,
}

fn min_width(px: u32) -> String {
    format!("(min-width: {}px)", px)
}

/// 2x query for a tier with a threshold; both spellings in one list.
fn min_width_2x(px: u32) -> String {
    format!(
        "(min-width: {px}px) and (min-resolution: 192dpi), \
         (min-width: {px}px) and (-webkit-min-device-pixel-ratio: 2)"
    )
}

const XS_DENSITY_QUERIES: [(&str, Density); 4] = [
    ("(min-resolution: 384dpi)", Density::X3),
    ("(-webkit-min-device-pixel-ratio: 3)", Density::X3),
    ("(min-resolution: 192dpi)", Density::X2),
    ("(-webkit-min-device-pixel-ratio: 2)", Density::X2),
];

/// Every `<source>` for one format, widest tier first.
fn sources_for(
    image: &ImageAsset,
    sizes: &SizeSet,
    breakpoints: &Breakpoints,
    format: Format,
    url_prefix: &str,
) -> Vec<SourceSpec> {
    let url = |tier: Tier, density: Density| {
        sizes
            .width(tier, density)
            .map(|w| Rendition::new(&image.slug, w, format).url(url_prefix))
    };
    let spec = |media: Option<String>, url: Option<String>| {
        url.map(|url| SourceSpec {
            media,
            mime: format.mime_type(),
            url,
        })
    };

    let mut sources = Vec::new();
    for bp in breakpoints.descending() {
        match bp.tier {
            Tier::Max => {
                sources.extend(spec(Some(min_width(bp.min_width)), url(Tier::Max, Density::X1)));
            }
            Tier::Xs => {
                for (query, density) in XS_DENSITY_QUERIES {
                    sources.extend(spec(Some(query.to_string()), url(Tier::Xs, density)));
                }
                sources.extend(spec(None, url(Tier::Xs, Density::X1)));
            }
            tier => {
                sources.extend(spec(
                    Some(min_width_2x(bp.min_width)),
                    url(tier, Density::X2),
                ));
                sources.extend(spec(Some(min_width(bp.min_width)), url(tier, Density::X1)));
            }
        }
    }
    sources
}

/// Render the `<picture>` fragment for one image.
///
/// Deterministic: the same inputs always produce byte-identical markup.
pub fn render(
    image: &ImageAsset,
    sizes: &SizeSet,
    breakpoints: &Breakpoints,
    options: &RenderOptions,
) -> Result<Markup, RenderError> {
    let alt = image.alt.trim();
    if alt.is_empty() {
        return Err(RenderError::MissingAlt(image.basename.clone()));
    }

    let sources: Vec<SourceSpec> = options
        .formats()
        .into_iter()
        .flat_map(|format| sources_for(image, sizes, breakpoints, format, &options.url_prefix))
        .collect();
    let fallback = Rendition::new(&image.slug, sizes.largest(), Format::Jpg).url(&options.url_prefix);

    let marker = if options.lazyload {
        LAZYLOAD_CLASS
    } else {
        NO_LAZYLOAD_CLASS
    };
    let picture_class = match image.class_name.as_ref().or(options.class_name.as_ref()) {
        Some(class) => format!("{} {}", class, marker),
        None => marker.to_string(),
    };

    Ok(html! {
        picture class=(picture_class) {
            @for spec in &sources {
                @if options.lazyload {
                    source media=[spec.media.as_deref()] type=(spec.mime) data-srcset=(spec.url);
                } @else {
                    source media=[spec.media.as_deref()] type=(spec.mime) srcset=(spec.url);
                }
            }
            @if options.lazyload {
                img data-src=(fallback) alt=(alt);
            } @else {
                img src=(fallback) alt=(alt);
            }
        }
    })
}

/// Write a rendered fragment to `<root>/<slug>/index.html`.
pub fn write_fragment(root: &Path, image: &ImageAsset, markup: &Markup) -> Result<PathBuf, RenderError> {
    let path = fragment_path(root, &image.slug);
    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, markup.0.as_bytes())
    };
    write(&path).map_err(|source| RenderError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Outcome of rendering a batch. Failures do not stop other images.
#[derive(Debug, Default)]
pub struct RenderReport {
    /// `(slug, fragment path)` in input order.
    pub written: Vec<(String, PathBuf)>,
    /// `(slug, error)` in input order.
    pub failed: Vec<(String, RenderError)>,
}

impl RenderReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Render and write fragments for every planned image, in parallel.
pub fn render_all(
    images: &[PlannedImage],
    breakpoints: &Breakpoints,
    options: &RenderOptions,
    root: &Path,
) -> RenderReport {
    let results: Vec<(String, Result<PathBuf, RenderError>)> = images
        .par_iter()
        .map(|planned| {
            let result = render(&planned.asset, &planned.sizes, breakpoints, options)
                .and_then(|markup| write_fragment(root, &planned.asset, &markup));
            (planned.asset.slug.clone(), result)
        })
        .collect();

    let mut report = RenderReport::default();
    for (slug, result) in results {
        match result {
            Ok(path) => report.written.push((slug, path)),
            Err(e) => report.failed.push((slug, e)),
        }
    }
    report
}
