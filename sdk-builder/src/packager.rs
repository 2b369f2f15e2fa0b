//! Final SDK archive

use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Zips the assembled SDK tree into `<sdk_root>.zip`
#[derive(Debug, Clone)]
pub struct SdkPackager {
    sdk_root: PathBuf,
}

impl SdkPackager {
    /// Packager for the tree at `sdk_root`
    pub fn new(sdk_root: impl Into<PathBuf>) -> Self {
        Self {
            sdk_root: sdk_root.into(),
        }
    }

    /// SDK tree being packed
    #[must_use]
    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    /// Archive written next to the tree, e.g. `sdk` → `sdk.zip`
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.sdk_root.with_extension("zip")
    }

    /// Pack whatever the tree currently holds
    ///
    /// Entries are relative to the SDK root (`windows/lib/SDL2.lib`). A
    /// missing tree is created so an empty run still yields an archive.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Io` if the tree cannot be created and
    /// `BuildError::Cache` if the archive cannot be written.
    pub fn pack(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.sdk_root)?;

        let archive = self.archive_path();
        info!("Packing {} ...", self.sdk_root.display());
        let entries = convenient_cache::pack_zip(&self.sdk_root, &archive)?;
        info!("SDK archive ready: {} ({} entries)", archive.display(), entries);

        Ok(archive)
    }
}
