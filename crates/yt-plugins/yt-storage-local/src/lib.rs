//! # yt-storage-local
//!
//! Local filesystem implementation of `MediaStore`.
//! Pictures are content-addressed by SHA-256 and sharded into two levels of
//! directories, so identical uploads share one file.

use std::io::Cursor;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use image::io::Reader as ImageReader;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use tokio::fs;
use yt_core::error::{AppError, Result};
use yt_core::traits::MediaStore;

/// Formats a post picture may use.
const ACCEPTED: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./media")
    root_path: PathBuf,
    /// Public URL prefix the root is served under (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// "ab/cd/abcd…ef.png"
    fn relative_path(hash: &str, format: ImageFormat) -> String {
        let ext = match format {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            _ => "png",
        };
        format!("{}/{}/{hash}.{ext}", &hash[0..2], &hash[2..4])
    }
}

/// Checks that `data` is a complete picture in an accepted format.
fn sniff(data: &[u8]) -> Result<ImageFormat> {
    let rejected = || AppError::ValidationError("upload a valid image (PNG, JPEG, GIF, or WebP)".into());
    let format = image::guess_format(data).map_err(|_| rejected())?;
    if !ACCEPTED.contains(&format) {
        return Err(rejected());
    }
    ImageReader::with_format(Cursor::new(data), format)
        .decode()
        .map_err(|err| {
            log::debug!("rejected {format:?} upload: {err}");
            rejected()
        })?;
    Ok(format)
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save_image(&self, data: Vec<u8>) -> Result<String> {
        // Decoding is CPU-bound; keep it off the reactor.
        let (data, format) = tokio::task::spawn_blocking(move || sniff(&data).map(|f| (data, f)))
            .await
            .context("image check panicked")??;

        let hash = format!("{:x}", Sha256::digest(&data));
        let relative = Self::relative_path(&hash, format);
        let target = self.root_path.join(&relative);

        if fs::try_exists(&target).await.unwrap_or(false) {
            log::debug!("picture {hash} already stored");
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&target, &data)
                .await
                .with_context(|| format!("failed to write {}", target.display()))?;
            log::info!("stored picture {relative}");
        }

        Ok(format!("{}/{relative}", self.url_prefix))
    }
}
