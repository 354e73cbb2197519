//! # picset
//!
//! A responsive-image build step. Point it at a directory of source images
//! and it produces, for every image, a set of resized renditions at fixed
//! breakpoint widths and an HTML `<picture>` fragment that lets the browser
//! pick the right one.
//!
//! # Architecture: Plan, Then Build
//!
//! All decisions are made up front by a read-only planning pass; the build
//! then executes the plan in strictly ordered stages:
//!
//! ```text
//! plan      src/ + config.toml  →  BuildContext   (no filesystem writes)
//! resize    BuildContext        →  .picset-temp/staged/
//! encode    staged              →  .picset-temp/encoded/{jpg,webp}/
//! relocate  encoded             →  build/<slug>/
//! render    BuildContext        →  build/<slug>/index.html
//! ```
//!
//! Every configuration error (missing alt text, bad base width, duplicate
//! slugs) is raised by planning, before the previous build is deleted.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`plan`] | Breakpoints, tiers and the size planner: base width → target widths |
//! | [`render`] | `<picture>` fragment rendering with Maud |
//! | [`process`] | Build orchestration: plan, clean, resize, encode, relocate, manifest, render |
//! | [`scan`] | Source directory discovery and dimension probing |
//! | [`config`] | `config.toml` loading, command-line overrides, validation, per-image resolution |
//! | [`naming`] | Slugs, rendition file names, fragment paths and URLs |
//! | [`types`] | Image records passed between stages |
//! | [`imaging`] | Pure-Rust image operations: identify, resize, encode |
//! | [`output`] | CLI output formatting for plans and build progress |
//!
//! # Size Model
//!
//! Every width derives from one base width `B`:
//!
//! ```text
//! xs = round(B/3)   sm = 2·xs   md = round(B)   lg = 4·xs   xl = 5·xs
//! xs2x = sm   xs3x = md   sm2x = lg   md2x = round(2B)   lg2x = 2·lg   xl2x = 2·xl
//! ```
//!
//! With `B = 1200` that is `400 800 1200 1600 2000 2400 3200 4000` after
//! deduplication. Widths larger than the source are still produced; the
//! planner reports them as upscale warnings.
//!
//! # Design Decisions
//!
//! ## Maud Over Template Engines
//!
//! Fragments are generated with [Maud](https://maud.lambda.xyz/), so markup is
//! checked at compile time and every interpolated value, alt text included,
//! is escaped.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! resampling and JPEG/WebP encoding. No ImageMagick, no system libraries.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod plan;
pub mod process;
pub mod render;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
