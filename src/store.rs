use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::Query;
use crate::error::HarvestError;

/// Destination layout: `<root>/<subject>/<category_segment>/image_<n>.jpg`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: Utf8PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn category_dir(&self, query: &Query) -> Utf8PathBuf {
        self.root.join(query.relative_dir())
    }

    pub fn image_path(dir: &Utf8Path, index: usize) -> Utf8PathBuf {
        dir.join(format!("image_{index}.jpg"))
    }

    pub fn ensure_root(&self) -> Result<(), HarvestError> {
        Self::ensure_dir(&self.root)
    }

    pub fn ensure_dir(dir: &Utf8Path) -> Result<(), HarvestError> {
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| HarvestError::Filesystem(format!("create {dir}: {err}")))
    }

    /// Writes through a temp file in the same directory, then renames.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), HarvestError> {
        let parent = path
            .parent()
            .ok_or_else(|| HarvestError::Filesystem(format!("invalid destination path {path}")))?;
        Self::ensure_dir(parent)?;
        let mut temp = tempfile::Builder::new()
            .prefix("plant-harvest")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
