/// Saving the edited image to disk
/// Files are named `edited-image-<unix millis>.png` so repeated downloads
/// never overwrite each other.

use chrono::{DateTime, Utc};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::codec::ImageAsset;
use crate::error::DecodeError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to convert image to PNG: {0}")]
    Convert(#[from] image::ImageError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Task join error: {0}")]
    Join(String),
}

/// `edited-image-<timestamp>.png` for a given moment
pub fn timestamped_file_name(now: DateTime<Utc>) -> String {
    format!("edited-image-{}.png", now.timestamp_millis())
}

/// Folder offered by the save dialog when nothing else is known
pub fn default_directory() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::picture_dir)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// PNG bytes for an asset, converting if the service sent another format
pub fn png_bytes(asset: &ImageAsset) -> Result<Vec<u8>, ExportError> {
    let bytes = asset.encoded.bytes()?;
    if asset.format_tag() == "image/png" {
        return Ok(bytes);
    }

    let img = image::load_from_memory(&bytes)?;
    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Write the asset as PNG to exactly `path`
pub fn save_png(asset: &ImageAsset, path: &Path) -> Result<PathBuf, ExportError> {
    let png = png_bytes(asset)?;
    std::fs::write(path, &png).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;

    tracing::info!("💾 Saved {} ({} bytes)", path.display(), png.len());
    Ok(path.to_path_buf())
}

/// Write the asset into `dir` under a fresh timestamped name
pub fn save_to_dir(asset: &ImageAsset, dir: &Path) -> Result<PathBuf, ExportError> {
    save_png(asset, &dir.join(timestamped_file_name(Utc::now())))
}

/// Save on a blocking thread so the UI stays responsive
pub async fn save_png_async(asset: ImageAsset, path: PathBuf) -> Result<PathBuf, ExportError> {
    tokio::task::spawn_blocking(move || save_png(&asset, &path))
        .await
        .map_err(|e| ExportError::Join(e.to_string()))?
}
