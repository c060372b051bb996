//! Discovery and validation of the still images that become slides.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::error::{SlidecastError, SlidecastResult};
use crate::probe;

/// One sub-stream is opened per image by the encoder, so the set is capped.
pub const MAX_IMAGES: usize = 50;

/// Ordered set of validated image paths. Order is directory-enumeration
/// order, stable within a run but NOT filename-sorted; callers that need a
/// specific slide order must name their files so the filesystem yields them
/// in that order.
#[derive(Clone, Debug)]
pub struct ImageSet {
    paths: Vec<PathBuf>,
}

impl ImageSet {
    /// Enumerate `dir`, keeping entries that pass the still-image predicate.
    /// Non-images are silently excluded, not errored.
    pub fn discover(dir: &Path) -> SlidecastResult<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("read image directory '{}'", dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("enumerate '{}'", dir.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if is_still_image(&path) {
                paths.push(path);
            } else {
                tracing::debug!(path = %path.display(), "skipping non-image entry");
            }
        }

        if paths.is_empty() {
            return Err(SlidecastError::NoImagesFound(dir.to_path_buf()));
        }
        if paths.len() > MAX_IMAGES {
            return Err(SlidecastError::TooManyImages {
                dir: dir.to_path_buf(),
                count: paths.len(),
                cap: MAX_IMAGES,
            });
        }

        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

/// Extension-based classification first; if the extension gives no verdict,
/// fall back to probing the container and accepting a leading visual stream.
fn is_still_image(path: &Path) -> bool {
    if image::ImageFormat::from_path(path).is_ok() {
        return true;
    }
    probe::first_stream_is_visual(path)
}
