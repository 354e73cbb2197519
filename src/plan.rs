//! Size planning: from one base width to every rendition width.
//!
//! A build configures a single number per image, the width the image should
//! have at the `md` breakpoint. Everything else is derived from it:
//!
//! ```text
//! xs   = round(B/3)      xs2x = sm     xs3x = md
//! sm   = xs*2            sm2x = lg
//! md   = round(B)        md2x = round(B*2)
//! lg   = xs*4            lg2x = lg*2
//! xl   = xs*5            xl2x = xl*2
//! ```
//!
//! The `max` breakpoint has no width of its own and reuses `xl2x`.
//!
//! Several tiers land on the same pixel count (`xs2x` is always `sm`, `sm2x`
//! is always `lg`), so consumers iterate [`SizeSet::unique_widths`] and produce
//! one rendition per distinct width.
//!
//! Everything here is pure: no I/O, no image decoding.

use crate::imaging::calculate_scaled_height;
use crate::naming::{Format, Rendition};
use crate::types::ImageAsset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Largest base width whose `xl2x` (`10 * round(B/3)`) fits the 65535px JPEG
/// limit. Narrower formats are checked per image by [`plan_image`].
pub const MAX_BASE_WIDTH: f64 = 19_660.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("base width must be a positive number, got {0}")]
    NonPositive(f64),
    #[error("base width {0} is too small: the xs tier would be 0px wide")]
    TooSmall(f64),
    #[error("base width {0} exceeds the maximum of 19660px")]
    TooLarge(f64),
    #[error(
        "'{slug}' needs a {width}x{height}px {format} rendition; {format} is limited to {limit}px (lower base_width)"
    )]
    ExceedsFormatLimit {
        slug: String,
        format: Format,
        width: u32,
        height: u32,
        limit: u32,
    },
    #[error("invalid breakpoint table: {0}")]
    InvalidBreakpoints(String),
    #[error("rendition name collision for '{slug}': {name}")]
    NameCollision { slug: String, name: String },
}

// ============================================================================
// Breakpoints
// ============================================================================

/// Named viewport tier, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
    Max,
}

impl Tier {
    /// Every tier in ascending order.
    pub const ALL: [Tier; 6] = [Tier::Xs, Tier::Sm, Tier::Md, Tier::Lg, Tier::Xl, Tier::Max];

    pub fn name(self) -> &'static str {
        match self {
            Tier::Xs => "xs",
            Tier::Sm => "sm",
            Tier::Md => "md",
            Tier::Lg => "lg",
            Tier::Xl => "xl",
            Tier::Max => "max",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tier and the `min-width` (px) at which it starts to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub tier: Tier,
    pub min_width: u32,
}

/// The full breakpoint table, one entry per [`Tier`], ascending.
///
/// Construction validates the table, so holders can rely on:
/// - every tier present exactly once, in [`Tier::ALL`] order
/// - `xs` starts at 0
/// - thresholds strictly ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoints {
    entries: Vec<Breakpoint>,
}

impl Breakpoints {
    /// Build a table from `(tier, min_width)` pairs in ascending tier order.
    pub fn new(entries: Vec<Breakpoint>) -> Result<Self, PlanError> {
        let tiers: Vec<Tier> = entries.iter().map(|b| b.tier).collect();
        if tiers != Tier::ALL {
            return Err(PlanError::InvalidBreakpoints(format!(
                "expected tiers xs, sm, md, lg, xl, max in order, got {}",
                tiers
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if entries[0].min_width != 0 {
            return Err(PlanError::InvalidBreakpoints(format!(
                "xs must start at 0px, got {}px",
                entries[0].min_width
            )));
        }
        for pair in entries.windows(2) {
            if pair[1].min_width <= pair[0].min_width {
                return Err(PlanError::InvalidBreakpoints(format!(
                    "{} ({}px) must be wider than {} ({}px)",
                    pair[1].tier, pair[1].min_width, pair[0].tier, pair[0].min_width
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Table from the five non-zero thresholds (`sm` through `max`).
    pub fn from_thresholds(sm: u32, md: u32, lg: u32, xl: u32, max: u32) -> Result<Self, PlanError> {
        let widths = [0, sm, md, lg, xl, max];
        Self::new(
            Tier::ALL
                .iter()
                .zip(widths)
                .map(|(&tier, min_width)| Breakpoint { tier, min_width })
                .collect(),
        )
    }

    /// xs=0, sm=600, md=1200, lg=1800, xl=2400, max=3000.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                Breakpoint { tier: Tier::Xs, min_width: 0 },
                Breakpoint { tier: Tier::Sm, min_width: 600 },
                Breakpoint { tier: Tier::Md, min_width: 1200 },
                Breakpoint { tier: Tier::Lg, min_width: 1800 },
                Breakpoint { tier: Tier::Xl, min_width: 2400 },
                Breakpoint { tier: Tier::Max, min_width: 3000 },
            ],
        }
    }

    pub fn ascending(&self) -> &[Breakpoint] {
        &self.entries
    }

    /// Widest tier first: the order `<source>` elements must appear in.
    pub fn descending(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries.iter().rev()
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Base width and size set
// ============================================================================

/// Validated base width (the `md` width), possibly fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseWidth(f64);

impl BaseWidth {
    pub fn new(value: f64) -> Result<Self, PlanError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PlanError::NonPositive(value));
        }
        if value > MAX_BASE_WIDTH {
            return Err(PlanError::TooLarge(value));
        }
        if (value / 3.0).round() < 1.0 {
            return Err(PlanError::TooSmall(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Pixel density of a rendition relative to CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Density {
    X1,
    X2,
    X3,
}

/// Concrete widths for every tier and density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeSet {
    pub xs: u32,
    pub sm: u32,
    pub md: u32,
    pub lg: u32,
    pub xl: u32,
    pub xs2x: u32,
    pub xs3x: u32,
    pub sm2x: u32,
    pub md2x: u32,
    pub lg2x: u32,
    pub xl2x: u32,
}

impl SizeSet {
    /// Labelled widths in declaration order.
    pub fn entries(&self) -> [(&'static str, u32); 11] {
        [
            ("xs", self.xs),
            ("sm", self.sm),
            ("md", self.md),
            ("lg", self.lg),
            ("xl", self.xl),
            ("xs2x", self.xs2x),
            ("xs3x", self.xs3x),
            ("sm2x", self.sm2x),
            ("md2x", self.md2x),
            ("lg2x", self.lg2x),
            ("xl2x", self.xl2x),
        ]
    }

    /// Distinct widths, first occurrence wins, in [`entries`](Self::entries) order.
    pub fn unique_widths(&self) -> Vec<u32> {
        let mut emitted = HashSet::new();
        self.entries()
            .into_iter()
            .map(|(_, w)| w)
            .filter(|w| emitted.insert(*w))
            .collect()
    }

    /// Width rendered for `tier` at `density`, if that combination exists.
    ///
    /// Only `xs` has a 3x variant; `max` only has a 1x variant (`xl2x`).
    pub fn width(&self, tier: Tier, density: Density) -> Option<u32> {
        match (tier, density) {
            (Tier::Xs, Density::X1) => Some(self.xs),
            (Tier::Xs, Density::X2) => Some(self.xs2x),
            (Tier::Xs, Density::X3) => Some(self.xs3x),
            (Tier::Sm, Density::X1) => Some(self.sm),
            (Tier::Sm, Density::X2) => Some(self.sm2x),
            (Tier::Md, Density::X1) => Some(self.md),
            (Tier::Md, Density::X2) => Some(self.md2x),
            (Tier::Lg, Density::X1) => Some(self.lg),
            (Tier::Lg, Density::X2) => Some(self.lg2x),
            (Tier::Xl, Density::X1) => Some(self.xl),
            (Tier::Xl, Density::X2) => Some(self.xl2x),
            (Tier::Max, Density::X1) => Some(self.xl2x),
            _ => None,
        }
    }

    /// The largest width in the set; used for the fallback `<img>`.
    pub fn largest(&self) -> u32 {
        self.xl2x
    }
}

/// Derive every tier width from a base width.
///
/// Each tier is rounded on its own from `B`; `md2x` is `round(B*2)`, not
/// `round(B)*2`.
pub fn plan_sizes(base: BaseWidth) -> SizeSet {
    let b = base.value();
    let xs = (b / 3.0).round() as u32;
    let sm = xs * 2;
    let md = b.round() as u32;
    let lg = xs * 4;
    let xl = xs * 5;

    SizeSet {
        xs,
        sm,
        md,
        lg,
        xl,
        xs2x: sm,
        xs3x: md,
        sm2x: lg,
        md2x: (b * 2.0).round() as u32,
        lg2x: lg * 2,
        xl2x: xl * 2,
    }
}

// ============================================================================
// Source validation
// ============================================================================

/// A planned width that exceeds the source's native width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpscaleWarning {
    pub width: u32,
    pub source_width: u32,
}

impl fmt::Display for UpscaleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target width {}px is larger than the source ({}px)",
            self.width, self.source_width
        )
    }
}

/// One warning per distinct width wider than the source. Never fails.
pub fn validate_against_source(sizes: &SizeSet, source_width: u32) -> Vec<UpscaleWarning> {
    sizes
        .unique_widths()
        .into_iter()
        .filter(|&w| w > source_width)
        .map(|width| UpscaleWarning {
            width,
            source_width,
        })
        .collect()
}

// ============================================================================
// Per-image plan
// ============================================================================

/// Everything the later stages need to know about one image.
#[derive(Debug, Clone)]
pub struct PlannedImage {
    pub asset: ImageAsset,
    pub sizes: SizeSet,
    /// Distinct widths to resize to.
    pub widths: Vec<u32>,
    /// One entry per (width, format) to encode.
    pub renditions: Vec<Rendition>,
    pub warnings: Vec<UpscaleWarning>,
}

/// Plan one image: sizes, distinct widths, rendition names and upscale warnings.
///
/// Fails with [`PlanError::ExceedsFormatLimit`] if the largest rendition is
/// too big for one of `formats`, and with [`PlanError::NameCollision`] if two
/// renditions would share a file name, which would mean the naming function
/// lost information.
pub fn plan_image(
    asset: ImageAsset,
    base: BaseWidth,
    formats: &[Format],
) -> Result<PlannedImage, PlanError> {
    let sizes = plan_sizes(base);
    let widths = sizes.unique_widths();
    let warnings = validate_against_source(&sizes, asset.source_width);

    let width = sizes.largest();
    let height = calculate_scaled_height((asset.source_width, asset.source_height), width);
    for &format in formats {
        let limit = format.max_dimension();
        if width > limit || height > limit {
            return Err(PlanError::ExceedsFormatLimit {
                slug: asset.slug.clone(),
                format,
                width,
                height,
                limit,
            });
        }
    }

    let mut names = HashSet::new();
    let mut renditions = Vec::with_capacity(widths.len() * formats.len());
    for &width in &widths {
        for &format in formats {
            let rendition = Rendition::new(&asset.slug, width, format);
            if !names.insert(rendition.file_name()) {
                return Err(PlanError::NameCollision {
                    slug: asset.slug.clone(),
                    name: rendition.file_name(),
                });
            }
            renditions.push(rendition);
        }
    }

    Ok(PlannedImage {
        asset,
        sizes,
        widths,
        renditions,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::asset;

    fn sizes(b: f64) -> SizeSet {
        plan_sizes(BaseWidth::new(b).unwrap())
    }

    // =========================================================================
    // plan_sizes
    // =========================================================================

    #[test]
    fn base_1200_matches_reference_tiers() {
        let s = sizes(1200.0);
        assert_eq!(s.xs, 400);
        assert_eq!(s.sm, 800);
        assert_eq!(s.md, 1200);
        assert_eq!(s.lg, 1600);
        assert_eq!(s.xl, 2000);
        assert_eq!(s.md2x, 2400);
        assert_eq!(s.lg2x, 3200);
        assert_eq!(s.xl2x, 4000);
    }

    #[test]
    fn tiers_are_ordered_and_md_is_base() {
        for b in 2..=5000u32 {
            let s = sizes(b as f64);
            assert!(s.xs <= s.sm, "B={b}: {s:?}");
            assert!(s.sm <= s.md, "B={b}: {s:?}");
            assert!(s.md <= s.lg, "B={b}: {s:?}");
            assert!(s.lg <= s.xl, "B={b}: {s:?}");
            assert_eq!(s.md, b);
        }
    }

    #[test]
    fn density_aliases_are_exact() {
        for b in 2..=5000u32 {
            let s = sizes(b as f64);
            assert_eq!(s.xs2x, s.sm);
            assert_eq!(s.xs3x, s.md);
            assert_eq!(s.sm2x, s.lg);
        }
    }

    #[test]
    fn fractional_base_rounds_each_tier_independently() {
        // 1000.4 / 3 = 333.47 → 333; 1000.4 → 1000; 2000.8 → 2001
        let s = sizes(1000.4);
        assert_eq!(s.xs, 333);
        assert_eq!(s.md, 1000);
        assert_eq!(s.md2x, 2001);
        assert_eq!(s.lg, 1332);
    }

    #[test]
    fn plan_is_deterministic() {
        assert_eq!(sizes(937.0), sizes(937.0));
    }

    // =========================================================================
    // BaseWidth
    // =========================================================================

    #[test]
    fn zero_and_negative_base_rejected() {
        assert_eq!(BaseWidth::new(0.0), Err(PlanError::NonPositive(0.0)));
        assert_eq!(BaseWidth::new(-100.0), Err(PlanError::NonPositive(-100.0)));
        assert!(matches!(
            BaseWidth::new(f64::NAN),
            Err(PlanError::NonPositive(_))
        ));
        assert!(matches!(
            BaseWidth::new(f64::INFINITY),
            Err(PlanError::NonPositive(_))
        ));
    }

    #[test]
    fn base_that_collapses_xs_to_zero_rejected() {
        assert_eq!(BaseWidth::new(1.0), Err(PlanError::TooSmall(1.0)));
        assert!(BaseWidth::new(1.5).is_ok());
        assert!(BaseWidth::new(2.0).is_ok());
    }

    #[test]
    fn oversized_base_rejected() {
        assert!(matches!(
            BaseWidth::new(MAX_BASE_WIDTH + 1.0),
            Err(PlanError::TooLarge(_))
        ));
        assert!(BaseWidth::new(MAX_BASE_WIDTH).is_ok());
    }

    #[test]
    fn max_base_width_fits_jpeg() {
        let s = sizes(MAX_BASE_WIDTH);
        assert!(s.largest() <= Format::Jpg.max_dimension());
        let next_xs = ((MAX_BASE_WIDTH + 1.0) / 3.0).round() as u32;
        assert!(next_xs * 10 > Format::Jpg.max_dimension());
    }

    // =========================================================================
    // Deduplication
    // =========================================================================

    #[test]
    fn unique_widths_skips_aliases() {
        assert_eq!(
            sizes(1200.0).unique_widths(),
            vec![400, 800, 1200, 1600, 2000, 2400, 3200, 4000]
        );
    }

    #[test]
    fn unique_widths_collapses_small_base() {
        // B=2: xs=1 sm=2 md=2 lg=4 xl=5 md2x=4 lg2x=8 xl2x=10
        assert_eq!(sizes(2.0).unique_widths(), vec![1, 2, 4, 5, 8, 10]);
    }

    #[test]
    fn entries_follow_declaration_order() {
        let labels: Vec<&str> = sizes(900.0).entries().iter().map(|(l, _)| *l).collect();
        assert_eq!(
            labels,
            vec![
                "xs", "sm", "md", "lg", "xl", "xs2x", "xs3x", "sm2x", "md2x", "lg2x", "xl2x"
            ]
        );
    }

    #[test]
    fn width_lookup_by_tier_and_density() {
        let s = sizes(1200.0);
        assert_eq!(s.width(Tier::Xs, Density::X3), Some(1200));
        assert_eq!(s.width(Tier::Sm, Density::X2), Some(1600));
        assert_eq!(s.width(Tier::Max, Density::X1), Some(4000));
        assert_eq!(s.width(Tier::Max, Density::X2), None);
        assert_eq!(s.width(Tier::Md, Density::X3), None);
    }

    // =========================================================================
    // validate_against_source
    // =========================================================================

    #[test]
    fn narrow_source_warns_for_each_wider_width() {
        let warnings = validate_against_source(&sizes(1200.0), 2500);
        let widths: Vec<u32> = warnings.iter().map(|w| w.width).collect();
        assert_eq!(widths, vec![3200, 4000]);
        assert!(warnings.iter().all(|w| w.source_width == 2500));
    }

    #[test]
    fn wide_source_has_no_warnings() {
        assert!(validate_against_source(&sizes(1200.0), 4000).is_empty());
    }

    #[test]
    fn warning_display_mentions_both_widths() {
        let w = UpscaleWarning {
            width: 4000,
            source_width: 3000,
        };
        assert_eq!(
            w.to_string(),
            "target width 4000px is larger than the source (3000px)"
        );
    }

    // =========================================================================
    // Breakpoints
    // =========================================================================

    #[test]
    fn standard_breakpoints_descend_from_max() {
        let bp = Breakpoints::standard();
        let order: Vec<(Tier, u32)> = bp.descending().map(|b| (b.tier, b.min_width)).collect();
        assert_eq!(
            order,
            vec![
                (Tier::Max, 3000),
                (Tier::Xl, 2400),
                (Tier::Lg, 1800),
                (Tier::Md, 1200),
                (Tier::Sm, 600),
                (Tier::Xs, 0),
            ]
        );
    }

    #[test]
    fn from_thresholds_matches_standard() {
        let bp = Breakpoints::from_thresholds(600, 1200, 1800, 2400, 3000).unwrap();
        assert_eq!(bp, Breakpoints::standard());
    }

    #[test]
    fn non_ascending_thresholds_rejected() {
        let err = Breakpoints::from_thresholds(600, 600, 1800, 2400, 3000).unwrap_err();
        assert!(matches!(err, PlanError::InvalidBreakpoints(msg) if msg.contains("md")));
    }

    #[test]
    fn zero_sm_threshold_rejected() {
        assert!(Breakpoints::from_thresholds(0, 1200, 1800, 2400, 3000).is_err());
    }

    #[test]
    fn xs_must_start_at_zero() {
        let mut entries: Vec<Breakpoint> = Breakpoints::standard().ascending().to_vec();
        entries[0].min_width = 10;
        assert!(Breakpoints::new(entries).is_err());
    }

    #[test]
    fn missing_tier_rejected() {
        let mut entries: Vec<Breakpoint> = Breakpoints::standard().ascending().to_vec();
        entries.pop();
        assert!(Breakpoints::new(entries).is_err());
    }

    // =========================================================================
    // plan_image
    // =========================================================================

    #[test]
    fn plan_image_rejects_webp_wider_than_limit() {
        // xs = round(4916/3) = 1639, xl2x = 16390 > 16383
        let err = plan_image(
            asset("wide", 20000),
            BaseWidth::new(4916.0).unwrap(),
            &[Format::Webp, Format::Jpg],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PlanError::ExceedsFormatLimit {
                format: Format::Webp,
                width: 16390,
                limit: 16383,
                ..
            }
        ));
    }

    #[test]
    fn plan_image_accepts_widest_webp_base() {
        // xl2x = 16380
        let planned = plan_image(
            asset("wide", 20000),
            BaseWidth::new(4914.0).unwrap(),
            &[Format::Webp, Format::Jpg],
        )
        .unwrap();
        assert_eq!(planned.sizes.largest(), 16380);
    }

    #[test]
    fn plan_image_jpeg_only_allows_larger_base() {
        assert!(
            plan_image(
                asset("wide", 20000),
                BaseWidth::new(5000.0).unwrap(),
                &[Format::Jpg],
            )
            .is_ok()
        );
    }

    #[test]
    fn plan_image_checks_scaled_height() {
        // 1:10 portrait: 4000px wide rendition is 40000px tall
        let mut tall = asset("tall", 1000);
        tall.source_height = 10_000;
        let err = plan_image(tall, BaseWidth::new(1200.0).unwrap(), &[Format::Webp]).unwrap_err();
        assert!(matches!(
            err,
            PlanError::ExceedsFormatLimit {
                width: 4000,
                height: 40000,
                ..
            }
        ));
    }

    #[test]
    fn plan_image_one_rendition_per_width_and_format() {
        let planned = plan_image(
            asset("Sunset Beach", 5000),
            BaseWidth::new(1200.0).unwrap(),
            &[Format::Webp, Format::Jpg],
        )
        .unwrap();

        assert_eq!(planned.widths.len(), 8);
        assert_eq!(planned.renditions.len(), 16);
        assert!(planned.warnings.is_empty());
        assert!(
            planned
                .renditions
                .iter()
                .all(|r| r.file_name().starts_with("sunset-beach-"))
        );
    }

    #[test]
    fn plan_image_carries_upscale_warnings() {
        let planned = plan_image(
            asset("narrow", 1000),
            BaseWidth::new(1200.0).unwrap(),
            &[Format::Jpg],
        )
        .unwrap();
        // every distinct width above 1000: 1200, 1600, 2000, 2400, 3200, 4000
        assert_eq!(planned.warnings.len(), 6);
        // upscaling is allowed: all renditions are still planned
        assert_eq!(planned.renditions.len(), 8);
    }
}
