//! Scratch storage for transient chart images.

use crate::error::Result;
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory that receives per-report chart images.
///
/// File names carry a random UUID so concurrent reports never collide.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `image` as `<prefix>_<uuid>.png` and hand back its handle.
    pub fn save_png(&self, prefix: &str, image: &RgbaImage) -> Result<ArtifactHandle> {
        std::fs::create_dir_all(&self.root)?;
        let path = self
            .root
            .join(format!("{}_{}.png", prefix, Uuid::new_v4().simple()));
        image.save_with_format(&path, ImageFormat::Png)?;
        tracing::debug!(path = %path.display(), "Wrote scratch image");
        Ok(ArtifactHandle { path })
    }
}

/// Opaque reference to a pre-rendered image in scratch storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    path: PathBuf,
}

impl ArtifactHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the stored image.
    pub fn load(&self) -> Result<RgbaImage> {
        Ok(image::open(&self.path)?.to_rgba8())
    }

    /// Remove the file. Missing files are ignored.
    pub fn discard(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove scratch image");
            }
        }
    }
}
