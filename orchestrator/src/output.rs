//! Output directory management
//!
//! Each CLI run gets its own folder under the configured output root,
//! holding numbered PNGs and a `metadata.json`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::error::{OrchestratorError, OrchestratorResult};

pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercase alphanumeric words joined by underscores
    fn sanitize_label(label: &str) -> String {
        label
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join("_")
    }

    /// Create `<root>/<timestamp>_<label>_<short id>`
    pub async fn create_run_dir(&self, label: &str) -> OrchestratorResult<PathBuf> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}_{}_{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            Self::sanitize_label(label),
            &id[..8]
        );
        let path = self.root.join(name);
        fs::create_dir_all(&path)
            .await
            .map_err(|_| OrchestratorError::FileSystem {
                operation: "create_run_dir".to_string(),
                path: path.display().to_string(),
            })?;
        Ok(path)
    }

    /// Write images as `<prefix>_<n>.png`, numbered from 1
    pub async fn save_images(
        &self,
        dir: &Path,
        prefix: &str,
        images: &[DynamicImage],
    ) -> OrchestratorResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let path = dir.join(format!("{}_{}.png", Self::sanitize_label(prefix), i + 1));
            let mut bytes = Cursor::new(Vec::new());
            image
                .write_to(&mut bytes, ImageFormat::Png)
                .map_err(|_| OrchestratorError::FileSystem {
                    operation: "encode_png".to_string(),
                    path: path.display().to_string(),
                })?;
            fs::write(&path, bytes.into_inner()).await?;
            debug!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Pretty-printed JSON next to the images
    pub async fn write_json<T: Serialize>(&self, dir: &Path, name: &str, value: &T) -> OrchestratorResult<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_vec_pretty(value)?).await?;
        Ok(path)
    }
}
