//! Disk store for card image artifacts
//!
//! Images are stored flat under the images directory, one file per printing:
//! `{images_dir}/{set}{card_number}.png`. A file present at that path is a
//! cache hit and is never rewritten.
//!
//! Writes go to `{path}.part` first and are renamed into place, so an
//! interrupted download never leaves a file that looks like a cached image.

use anyhow::{anyhow, bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSION: &str = "png";
const PARTIAL_SUFFIX: &str = "part";

/// Validate one component of an image location
///
/// Returns the trimmed value. Blank values, path separators, and parent
/// directory references are rejected.
pub fn checked_component<'s>(kind: &str, value: &'s str) -> Result<&'s str> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{} is blank", kind);
    }
    if value.contains(['/', '\\', '\0']) || value.contains("..") {
        bail!("{} '{}' is not a safe path component", kind, value);
    }
    Ok(value)
}

/// Image artifact cache rooted at a directory
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    /// Create a cache rooted at `dir`; the directory is created on first store
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the cache
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path for the image of `(set, card_number)`
    pub fn path_for(&self, set: &str, card_number: &str) -> Result<PathBuf> {
        let set = checked_component("set", set)?;
        let card_number = checked_component("card number", card_number)?;
        Ok(self
            .dir
            .join(format!("{}{}.{}", set, card_number, IMAGE_EXTENSION)))
    }

    /// Whether an image file already exists at `path`
    pub fn contains(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Write image bytes to `path`
    pub fn store(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path.parent().unwrap_or(&self.dir);
        fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create image directory {:?}: {}", parent, e))?;

        let partial = path.with_extension(format!("{}.{}", IMAGE_EXTENSION, PARTIAL_SUFFIX));
        fs::write(&partial, bytes)
            .map_err(|e| anyhow!("Failed to write image file {:?}: {}", partial, e))?;

        if let Err(e) = fs::rename(&partial, path) {
            let _ = fs::remove_file(&partial);
            return Err(anyhow!(
                "Failed to move image into place at {:?}: {}",
                path,
                e
            ));
        }

        debug!("Stored {} bytes at {:?}", bytes.len(), path);
        Ok(())
    }

    /// Number of cached image files and their total size in bytes
    pub fn usage(&self) -> Result<(usize, u64)> {
        if !self.dir.exists() {
            return Ok((0, 0));
        }

        let entries = fs::read_dir(&self.dir)
            .map_err(|e| anyhow!("Failed to read image directory {:?}: {}", self.dir, e))?;

        let mut count = 0usize;
        let mut size = 0u64;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_image = path
                .extension()
                .map(|ext| ext == IMAGE_EXTENSION)
                .unwrap_or(false);
            if path.is_file() && is_image {
                count += 1;
                size += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            }
        }
        Ok((count, size))
    }
}
