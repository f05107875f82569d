//! Image encoder boundary and the default WebP implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::{Error, Result};

/// External collaborator that rewrites an image file into WebP.
///
/// Implementations produce a converted file inside `target_dir` and leave
/// the source untouched; deleting the original afterwards is the caller's
/// decision, not the encoder's.
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    /// Convert `source` into a `.webp` file inside `target_dir`.
    ///
    /// Returns the absolute path of the converted file. Fails with
    /// [`Error::Encode`] on unsupported or corrupt input.
    async fn convert_to_webp(&self, source: &Path, target_dir: &Path) -> Result<PathBuf>;
}

/// Default encoder backed by the `image` crate.
///
/// Decoding and re-encoding are CPU-bound, so the work runs on the blocking
/// thread pool rather than a runtime worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebpEncoder;

impl WebpEncoder {
    /// Create the default encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageEncoder for WebpEncoder {
    async fn convert_to_webp(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
        let source_path = source.display().to_string();
        let source = source.to_path_buf();
        let target_dir = target_dir.to_path_buf();
        tokio::task::spawn_blocking(move || encode_file(&source, &target_dir))
            .await
            .map_err(|e| Error::Encode {
                path: source_path,
                reason: format!("encoder task aborted: {e}"),
            })?
    }
}

fn encode_file(source: &Path, target_dir: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no file stem", source.display())))?;

    let decoded = image::ImageReader::open(source)
        .map_err(|e| Error::Encode {
            path: source.display().to_string(),
            reason: format!("could not open image: {e}"),
        })?
        .decode()
        .map_err(|e| Error::Encode {
            path: source.display().to_string(),
            reason: format!("could not decode image: {e}"),
        })?;

    let target = target_dir.join(format!("{}.webp", stem.to_string_lossy()));
    decoded
        .save_with_format(&target, image::ImageFormat::WebP)
        .map_err(|e| Error::Encode {
            path: source.display().to_string(),
            reason: format!("could not write WebP: {e}"),
        })?;

    debug!("encoded {} as {}", source.display(), target.display());
    Ok(target)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_test_png(path: &Path) {
        let pixels: [u8; 12] = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 0];
        image::save_buffer(path, &pixels, 2, 2, image::ExtendedColorType::Rgb8).unwrap();
    }

    #[tokio::test]
    async fn converts_png_to_webp_in_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page003.png");
        write_test_png(&source);

        let converted = WebpEncoder::new()
            .convert_to_webp(&source, dir.path())
            .await
            .unwrap();

        assert_eq!(converted, dir.path().join("page003.webp"));
        assert!(converted.exists());
        // The encoder never deletes the original.
        assert!(source.exists());
    }

    #[tokio::test]
    async fn corrupt_input_fails_with_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"not an image").unwrap();

        let err = WebpEncoder::new()
            .convert_to_webp(&source, dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "encode");
    }

    #[tokio::test]
    async fn missing_input_fails_with_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WebpEncoder::new()
            .convert_to_webp(&dir.path().join("absent.png"), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "encode");
    }
}
