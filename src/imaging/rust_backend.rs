//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Staged intermediate | PNG (lossless) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → WebP | `webp::Encoder` (libwebp, lossy) at the configured quality |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, ResizeParams};
use crate::naming::Format;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::BufWriter;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders may be compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

fn create_writer(path: &Path) -> Result<BufWriter<std::fs::File>, BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    Ok(BufWriter::new(file))
}

fn save_png(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    let encoder = image::codecs::png::PngEncoder::new(create_writer(path)?);
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {}", e)))
}

/// JPEG has no alpha channel, so the image is flattened to RGB first.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(create_writer(path)?, quality as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

/// `webp::Encoder` only takes 8-bit RGB or RGBA.
fn save_webp(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&img)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {}", e)))?;
    let encoded = encoder.encode(quality as f32);
    std::fs::write(path, &*encoded)?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to read dimensions of {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save_png(&resized, &params.output)
    }

    fn encode(&self, params: &EncodeParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        match params.format {
            Format::Jpg => save_jpeg(&img, &params.output, params.quality.value()),
            Format::Webp => save_webp(&img, &params.output, params.quality.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::create_test_jpeg;

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = super::supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let backend = RustBackend::new();
        let dims = backend.identify(&path).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn resize_writes_png_at_exact_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);

        let output = tmp.path().join("staged-200w.png");
        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 200,
                height: 150,
            })
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 150));
    }

    #[test]
    fn resize_can_upscale() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 50, 25);

        let output = tmp.path().join("big.png");
        RustBackend::new()
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 200,
                height: 100,
            })
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 100));
    }

    #[test]
    fn encode_jpeg_and_webp_from_staged_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 120, 80);
        let staged = tmp.path().join("a-60w.png");
        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: staged.clone(),
                width: 60,
                height: 40,
            })
            .unwrap();

        for format in [Format::Jpg, Format::Webp] {
            let output = tmp.path().join(format!("a-60w.{}", format.extension()));
            backend
                .encode(&EncodeParams {
                    source: staged.clone(),
                    output: output.clone(),
                    format,
                    quality: Quality::new(80),
                })
                .unwrap();

            assert_eq!(image::image_dimensions(&output).unwrap(), (60, 40));
        }
    }

    #[test]
    fn webp_quality_changes_output_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 256, 256);
        let staged = tmp.path().join("a-256w.png");
        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: staged.clone(),
                width: 256,
                height: 256,
            })
            .unwrap();

        let encoded_size = |quality: u32| {
            let output = tmp.path().join(format!("a-256w-q{quality}.webp"));
            backend
                .encode(&EncodeParams {
                    source: staged.clone(),
                    output: output.clone(),
                    format: Format::Webp,
                    quality: Quality::new(quality),
                })
                .unwrap();
            std::fs::metadata(&output).unwrap().len()
        };

        let low = encoded_size(10);
        let high = encoded_size(95);
        assert!(low < high, "q10 = {low} bytes, q95 = {high} bytes");
    }

    #[test]
    fn encode_missing_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = RustBackend::new().encode(&EncodeParams {
            source: tmp.path().join("missing.png"),
            output: tmp.path().join("out.jpg"),
            format: Format::Jpg,
            quality: Quality::default(),
        });
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn decode_garbage_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"not an image").unwrap();

        let result = RustBackend::new().resize(&ResizeParams {
            source,
            output: tmp.path().join("out.png"),
            width: 10,
            height: 10,
        });
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }
}
