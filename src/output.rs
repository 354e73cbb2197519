//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every image leads with its positional index and basename, with the slug it
//! publishes under and its filesystem source as indented context. The output
//! reads as an inventory of what will be (or was) published.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! 001 Sunset Beach → sunset-beach/
//!     Source: Sunset Beach.jpg (5000x3000)
//!     Widths: 400 800 1200 1600 2000 2400 3200 4000
//!     Renditions: 16 (webp, jpg)
//! 002 harbor → harbor/
//!     Source: harbor.png (2500x1250)
//!     Widths: 400 800 1200 1600 2000 2400 3200 4000
//!     Renditions: 16 (webp, jpg)
//!     Warning: target width 3200px is larger than the source (2500px)
//!
//! Planned 2 images, 32 renditions, 1 warning
//! ```
//!
//! ## Build events
//!
//! ```text
//! 001 Sunset Beach → sunset-beach/
//!     Widths: 400 800 1200 1600 2000 2400 3200 4000
//! resize: 16 files
//! encode: 32 files
//! relocate: 32 files
//!     sunset-beach → build/sunset-beach/index.html
//! render: 2 fragments
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::process::{BuildContext, BuildEvent, BuildReport, Stage};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `001 Sunset Beach → sunset-beach/`
fn image_header(index: usize, basename: &str, slug: &str) -> String {
    format!("{} {} → {}/", format_index(index), basename, slug)
}

fn widths_line(widths: &[u32]) -> String {
    let list: Vec<String> = widths.iter().map(|w| w.to_string()).collect();
    format!("{}Widths: {}", indent(1), list.join(" "))
}

/// `1 warning`, `2 warnings`
fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Plan output
// ============================================================================

/// Format the resolved plan: one block per image, then a summary line.
pub fn format_plan(ctx: &BuildContext) -> Vec<String> {
    let mut lines = Vec::new();
    let formats: Vec<String> = ctx
        .options
        .formats()
        .iter()
        .map(|f| f.to_string())
        .collect();

    for (i, planned) in ctx.images.iter().enumerate() {
        let asset = &planned.asset;
        lines.push(image_header(i + 1, &asset.basename, &asset.slug));

        let file = asset
            .source
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| asset.source.display().to_string());
        lines.push(format!(
            "{}Source: {} ({}x{})",
            indent(1),
            file,
            asset.source_width,
            asset.source_height
        ));
        lines.push(widths_line(&planned.widths));
        lines.push(format!(
            "{}Renditions: {} ({})",
            indent(1),
            planned.renditions.len(),
            formats.join(", ")
        ));
        for warning in &planned.warnings {
            lines.push(format!("{}Warning: {}", indent(1), warning));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Planned {}, {}, {}",
        plural(ctx.images.len(), "image"),
        plural(ctx.rendition_count(), "rendition"),
        plural(ctx.warning_count(), "warning")
    ));
    lines
}

/// Print plan output to stdout.
pub fn print_plan(ctx: &BuildContext) {
    for line in format_plan(ctx) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::ImagePlanned {
            index,
            basename,
            slug,
            widths,
            ..
        } => vec![image_header(*index, basename, slug), widths_line(widths)],
        BuildEvent::UpscaleWarning { basename, warning } => {
            vec![format!("{}Warning: {}: {}", indent(1), basename, warning)]
        }
        BuildEvent::StageCompleted { stage, jobs } => {
            let unit = match stage {
                Stage::Render => "fragment",
                _ => "file",
            };
            vec![format!("{}: {}", stage, plural(*jobs, unit))]
        }
        BuildEvent::FragmentWritten { slug, path } => {
            vec![format!("{}{} → {}", indent(1), slug, path.display())]
        }
        BuildEvent::FragmentFailed { slug, error } => {
            vec![format!("{}{}: FAILED ({})", indent(1), slug, error)]
        }
    }
}

/// Events that belong on stderr rather than stdout.
pub fn is_diagnostic(event: &BuildEvent) -> bool {
    matches!(
        event,
        BuildEvent::UpscaleWarning { .. } | BuildEvent::FragmentFailed { .. }
    )
}

/// Format the closing summary of a build.
pub fn format_build_summary(report: &BuildReport, output: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Built {}, {}, {} → {}",
        plural(report.images, "image"),
        plural(report.renditions, "rendition"),
        plural(report.fragments.written.len(), "fragment"),
        output.display()
    )];
    if !report.fragments.failed.is_empty() {
        lines.push(format!(
            "{} failed: {}",
            plural(report.fragments.failed.len(), "fragment"),
            report
                .fragments
                .failed
                .iter()
                .map(|(slug, _)| slug.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    lines
}

/// Print build summary to stdout.
pub fn print_build_summary(report: &BuildReport, output: &Path) {
    for line in format_build_summary(report, output) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::naming::Format;
    use crate::plan::{BaseWidth, Breakpoints, UpscaleWarning, plan_image};
    use crate::process::BuildPaths;
    use crate::imaging::Quality;
    use crate::render::{RenderError, RenderOptions, RenderReport};
    use crate::test_helpers::asset;
    use std::path::PathBuf;

    fn context(source_widths: &[(&str, u32)]) -> BuildContext {
        let options = RenderOptions::default();
        let images = source_widths
            .iter()
            .map(|&(name, w)| {
                plan_image(asset(name, w), BaseWidth::new(1200.0).unwrap(), &options.formats())
                    .unwrap()
            })
            .collect();
        BuildContext {
            paths: BuildPaths::new("src", "build", ".picset-temp"),
            config: BuildConfig::default(),
            breakpoints: Breakpoints::standard(),
            options,
            quality: Quality::default(),
            images,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "image"), "1 image");
        assert_eq!(plural(0, "image"), "0 images");
        assert_eq!(plural(3, "warning"), "3 warnings");
    }

    // =========================================================================
    // Plan
    // =========================================================================

    #[test]
    fn format_plan_lists_each_image() {
        let lines = format_plan(&context(&[("Sunset Beach", 5000), ("harbor", 2500)]));
        assert_eq!(
            lines,
            vec![
                "001 Sunset Beach → sunset-beach/",
                "    Source: Sunset Beach.jpg (5000x3333)",
                "    Widths: 400 800 1200 1600 2000 2400 3200 4000",
                "    Renditions: 16 (webp, jpg)",
                "002 harbor → harbor/",
                "    Source: harbor.jpg (2500x1666)",
                "    Widths: 400 800 1200 1600 2000 2400 3200 4000",
                "    Renditions: 16 (webp, jpg)",
                "    Warning: target width 3200px is larger than the source (2500px)",
                "    Warning: target width 4000px is larger than the source (2500px)",
                "",
                "Planned 2 images, 32 renditions, 2 warnings",
            ]
        );
    }

    // =========================================================================
    // Events
    // =========================================================================

    #[test]
    fn format_image_planned() {
        let event = BuildEvent::ImagePlanned {
            index: 3,
            basename: "Sunset Beach".into(),
            slug: "sunset-beach".into(),
            source_width: 5000,
            widths: vec![400, 800],
        };
        assert_eq!(
            format_build_event(&event),
            vec!["003 Sunset Beach → sunset-beach/", "    Widths: 400 800"]
        );
    }

    #[test]
    fn format_upscale_warning() {
        let event = BuildEvent::UpscaleWarning {
            basename: "harbor".into(),
            warning: UpscaleWarning {
                width: 4000,
                source_width: 2500,
            },
        };
        assert_eq!(
            format_build_event(&event),
            vec!["    Warning: harbor: target width 4000px is larger than the source (2500px)"]
        );
        assert!(is_diagnostic(&event));
    }

    #[test]
    fn format_stage_completed() {
        let resize = BuildEvent::StageCompleted {
            stage: Stage::Resize,
            jobs: 16,
        };
        let render = BuildEvent::StageCompleted {
            stage: Stage::Render,
            jobs: 1,
        };
        assert_eq!(format_build_event(&resize), vec!["resize: 16 files"]);
        assert_eq!(format_build_event(&render), vec!["render: 1 fragment"]);
        assert!(!is_diagnostic(&resize));
    }

    #[test]
    fn format_fragment_events() {
        let written = BuildEvent::FragmentWritten {
            slug: "harbor".into(),
            path: PathBuf::from("build/harbor/index.html"),
        };
        let failed = BuildEvent::FragmentFailed {
            slug: "harbor".into(),
            error: "disk full".into(),
        };
        assert_eq!(
            format_build_event(&written),
            vec!["    harbor → build/harbor/index.html"]
        );
        assert_eq!(
            format_build_event(&failed),
            vec!["    harbor: FAILED (disk full)"]
        );
        assert!(is_diagnostic(&failed));
    }

    // =========================================================================
    // Summary
    // =========================================================================

    #[test]
    fn format_summary_success() {
        let report = BuildReport {
            images: 2,
            resized: 16,
            renditions: 32,
            fragments: RenderReport {
                written: vec![
                    ("a".into(), PathBuf::from("build/a/index.html")),
                    ("b".into(), PathBuf::from("build/b/index.html")),
                ],
                failed: vec![],
            },
        };
        assert_eq!(
            format_build_summary(&report, Path::new("build")),
            vec!["Built 2 images, 32 renditions, 2 fragments → build"]
        );
    }

    #[test]
    fn format_summary_lists_failures() {
        let report = BuildReport {
            images: 2,
            resized: 8,
            renditions: 8,
            fragments: RenderReport {
                written: vec![("a".into(), PathBuf::from("build/a/index.html"))],
                failed: vec![("b".into(), RenderError::MissingAlt("b".into()))],
            },
        };
        let lines = format_build_summary(&report, Path::new("build"));
        assert_eq!(lines[0], "Built 2 images, 8 renditions, 1 fragment → build");
        assert_eq!(lines[1], "1 fragment failed: b");
    }

    #[test]
    fn plan_shows_jpeg_only_when_webp_disabled() {
        let mut ctx = context(&[("a", 5000)]);
        ctx.options.include_webp = false;
        ctx.images = vec![
            plan_image(asset("a", 5000), BaseWidth::new(1200.0).unwrap(), &[Format::Jpg]).unwrap(),
        ];
        let lines = format_plan(&ctx);
        assert_eq!(lines[3], "    Renditions: 8 (jpg)");
    }
}
