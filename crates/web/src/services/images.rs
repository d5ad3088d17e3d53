//! Listing image storage.
//!
//! Two backends: files on local disk served under `/uploads`, or an
//! unsigned multipart upload to a hosted media service that answers with a
//! `secure_url`. Every image in a submission is validated before any
//! upload starts; uploads then run concurrently.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use dar_core::UserId;

use crate::config::ImageStoreConfig;

/// Maximum size of a single image.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Maximum number of images per listing.
pub const MAX_IMAGES: usize = 6;

/// URL prefix locally stored images are served under.
pub const LOCAL_URL_PREFIX: &str = "/uploads/";

/// Errors from validating or storing images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid file type for {0}. Only JPG, PNG, and WEBP are allowed.")]
    UnsupportedType(String),

    #[error("File size for {0} exceeds 2MB limit.")]
    TooLarge(String),

    #[error("Upload failed for {0}")]
    UploadRejected(String),

    #[error("image storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image upload request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Supported image formats, detected from file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Sniff the format from magic bytes.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// An image received from a form, not yet validated.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-side file name, only used in messages and public IDs.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// An image that passed validation.
#[derive(Debug, Clone)]
pub struct ValidImage {
    pub filename: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check type and size.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::UnsupportedType` or `ImageError::TooLarge`.
    pub fn validate(self) -> Result<ValidImage, ImageError> {
        let kind = ImageKind::detect(&self.bytes)
            .ok_or_else(|| ImageError::UnsupportedType(self.filename.clone()))?;
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge(self.filename));
        }
        Ok(ValidImage {
            filename: self.filename,
            kind,
            bytes: self.bytes,
        })
    }
}

/// Response from the hosted upload endpoint.
#[derive(Debug, Deserialize)]
struct HostedUploadResponse {
    secure_url: Option<String>,
}

/// Where listing images go.
#[derive(Debug, Clone)]
pub enum ImageStore {
    Local {
        dir: PathBuf,
    },
    Hosted {
        client: reqwest::Client,
        upload_url: Url,
        upload_preset: String,
    },
}

impl ImageStore {
    /// Build the store selected by configuration.
    #[must_use]
    pub fn from_config(config: &ImageStoreConfig) -> Self {
        match config {
            ImageStoreConfig::Local { dir } => Self::Local { dir: dir.clone() },
            ImageStoreConfig::Hosted {
                upload_url,
                upload_preset,
                ..
            } => Self::Hosted {
                client: reqwest::Client::new(),
                upload_url: upload_url.clone(),
                upload_preset: upload_preset.clone(),
            },
        }
    }

    /// Local directory, when images are stored on disk.
    #[must_use]
    pub fn local_dir(&self) -> Option<&Path> {
        match self {
            Self::Local { dir } => Some(dir),
            Self::Hosted { .. } => None,
        }
    }

    /// Validate every image, then upload them concurrently.
    ///
    /// Returns URLs in input order. If any upload fails, the ones that
    /// succeeded are deleted before the first error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first validation or upload error.
    #[instrument(skip(self, images), fields(count = images.len()))]
    pub async fn upload_all(
        &self,
        owner: UserId,
        images: Vec<ImageUpload>,
    ) -> Result<Vec<String>, ImageError> {
        let valid = images
            .into_iter()
            .map(ImageUpload::validate)
            .collect::<Result<Vec<_>, _>>()?;

        let results = join_all(valid.iter().map(|image| self.upload(owner, image))).await;
        self.settle(results).await
    }

    /// Collect upload results, removing the stored images if any failed.
    async fn settle(
        &self,
        results: Vec<Result<String, ImageError>>,
    ) -> Result<Vec<String>, ImageError> {
        let mut urls = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(url) => urls.push(url),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            tracing::warn!(
                error = %e,
                uploaded = urls.len(),
                "Image upload failed, removing uploaded images"
            );
            self.delete_all(&urls).await;
            return Err(e);
        }

        Ok(urls)
    }

    /// Store one validated image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Io` for disk failures, `ImageError::Http` or
    /// `ImageError::UploadRejected` for hosted failures.
    pub async fn upload(&self, owner: UserId, image: &ValidImage) -> Result<String, ImageError> {
        match self {
            Self::Local { dir } => {
                let name = format!("{owner}-{}.{}", Uuid::new_v4(), image.kind.extension());
                tokio::fs::create_dir_all(dir).await?;
                tokio::fs::write(dir.join(&name), &image.bytes).await?;
                Ok(format!("{LOCAL_URL_PREFIX}{name}"))
            }
            Self::Hosted {
                client,
                upload_url,
                upload_preset,
            } => {
                let public_id = format!(
                    "{owner}-{}-{}",
                    sanitize_filename(&image.filename),
                    Uuid::new_v4()
                );
                let part = reqwest::multipart::Part::bytes(image.bytes.clone())
                    .file_name(image.filename.clone())
                    .mime_str(image.kind.mime())?;
                let form = reqwest::multipart::Form::new()
                    .part("file", part)
                    .text("upload_preset", upload_preset.clone())
                    .text("public_id", public_id);

                let response: HostedUploadResponse = client
                    .post(upload_url.clone())
                    .multipart(form)
                    .send()
                    .await?
                    .json()
                    .await?;

                response
                    .secure_url
                    .ok_or_else(|| ImageError::UploadRejected(image.filename.clone()))
            }
        }
    }

    /// Best-effort removal of stored images.
    ///
    /// Hosted images are left in place: unsigned presets cannot delete.
    pub async fn delete_all(&self, urls: &[String]) {
        let Self::Local { dir } = self else {
            if !urls.is_empty() {
                tracing::debug!(count = urls.len(), "Hosted images not deleted");
            }
            return;
        };

        for url in urls {
            let Some(name) = url.strip_prefix(LOCAL_URL_PREFIX) else {
                continue;
            };
            // Never follow anything that could escape the upload dir.
            if name.contains('/') || name.contains("..") {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(dir.join(name)).await {
                tracing::warn!(url = %url, error = %e, "Failed to delete image");
            }
        }
    }
}

/// Keep ASCII alphanumerics, `-`, `_` and `.`; replace anything else.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn png(name: &str) -> ImageUpload {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(&[0; 16]);
        ImageUpload {
            filename: name.to_string(),
            bytes,
        }
    }

    #[test]
    fn test_detect_kinds() {
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(&PNG_HEADER), Some(ImageKind::Png));
        assert_eq!(ImageKind::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::detect(b"GIF89a"), None);
        assert_eq!(ImageKind::detect(&[]), None);
    }

    #[test]
    fn test_validate_rejects_gif() {
        let upload = ImageUpload {
            filename: "cat.gif".to_string(),
            bytes: b"GIF89a....".to_vec(),
        };
        let err = upload.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type for cat.gif. Only JPG, PNG, and WEBP are allowed."
        );
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let mut upload = png("big.png");
        upload.bytes.resize(MAX_IMAGE_BYTES + 1, 0);
        assert!(matches!(upload.validate(), Err(ImageError::TooLarge(_))));

        let mut ok = png("fits.png");
        ok.bytes.resize(MAX_IMAGE_BYTES, 0);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("../etc"), ".._etc");
    }

    #[tokio::test]
    async fn test_local_upload_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::Local {
            dir: dir.path().to_path_buf(),
        };

        let urls = store
            .upload_all(UserId::new(42), vec![png("a.png"), png("b.png")])
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        for url in &urls {
            let name = url.strip_prefix(LOCAL_URL_PREFIX).unwrap();
            assert!(name.starts_with("42-"));
            assert!(name.ends_with(".png"));
            assert!(dir.path().join(name).exists());
        }

        store.delete_all(&urls).await;
        for url in &urls {
            let name = url.strip_prefix(LOCAL_URL_PREFIX).unwrap();
            assert!(!dir.path().join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_upload_all_validates_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::Local {
            dir: dir.path().join("nested"),
        };
        let bad = ImageUpload {
            filename: "doc.pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
        };

        let result = store
            .upload_all(UserId::new(1), vec![png("a.png"), bad])
            .await;

        assert!(matches!(result, Err(ImageError::UnsupportedType(_))));
        assert!(!dir.path().join("nested").exists());
    }

    #[tokio::test]
    async fn test_failed_upload_removes_the_stored_ones() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::Local {
            dir: dir.path().to_path_buf(),
        };
        let owner = UserId::new(7);
        let first = store
            .upload(owner, &png("a.png").validate().unwrap())
            .await
            .unwrap();
        let second = store
            .upload(owner, &png("b.png").validate().unwrap())
            .await
            .unwrap();

        let result = store
            .settle(vec![
                Ok(first.clone()),
                Err(ImageError::UploadRejected("c.png".to_string())),
                Ok(second.clone()),
            ])
            .await;

        assert!(matches!(result, Err(ImageError::UploadRejected(name)) if name == "c.png"));
        for url in [first, second] {
            let name = url.strip_prefix(LOCAL_URL_PREFIX).unwrap();
            assert!(!dir.path().join(name).exists(), "{name} left behind");
        }
    }

    #[tokio::test]
    async fn test_settle_keeps_order_on_success() {
        let store = ImageStore::Local {
            dir: tempfile::tempdir().unwrap().path().to_path_buf(),
        };
        let urls = store
            .settle(vec![Ok("/uploads/1.png".to_string()), Ok("/uploads/2.png".to_string())])
            .await
            .unwrap();
        assert_eq!(urls, ["/uploads/1.png", "/uploads/2.png"]);
    }

    #[tokio::test]
    async fn test_delete_ignores_foreign_paths() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"x").unwrap();
        let store = ImageStore::Local {
            dir: dir.path().join("uploads"),
        };

        store
            .delete_all(&[
                "/uploads/../keep.txt".to_string(),
                "https://cdn.example.com/x.png".to_string(),
            ])
            .await;

        assert!(outside.exists());
    }
}
