//! Manifest persistence
//!
//! The manifest lives in the group folder as `kfm_record.json`. Every save
//! goes through [`FileSystem::write_atomic`], so a crash leaves either the
//! previous or the new manifest on disk, never a torn one.

use super::entry::Manifest;
use super::{ARCHIVE_SUFFIX, MANIFEST_FILE_NAME};
use crate::error::{IoResultExt, KfmError, Result};
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};

/// Reads and writes one manifest file
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Store at the fixed manifest name inside `group_folder`
    pub fn for_group(group_folder: &Path) -> Self {
        Self {
            path: group_folder.join(MANIFEST_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self, fs: &dyn FileSystem) -> bool {
        fs.exists(&self.path)
    }

    pub fn save(&self, fs: &dyn FileSystem, manifest: &Manifest) -> Result<()> {
        let json = serde_json::to_vec_pretty(manifest).map_err(|e| KfmError::ManifestCorrupt {
            path: self.path.clone(),
            reason: format!("cannot serialize: {e}"),
        })?;
        fs.write_atomic(&self.path, &json)
            .with_path("write manifest", &self.path)?;

        tracing::trace!(
            run_id = %manifest.run_id,
            moves = manifest.moves.len(),
            "Saved manifest"
        );
        Ok(())
    }

    pub fn load(&self, fs: &dyn FileSystem) -> Result<Manifest> {
        if !fs.exists(&self.path) {
            return Err(KfmError::ManifestNotFound(self.path.clone()));
        }
        let bytes = fs.read(&self.path).with_path("read manifest", &self.path)?;
        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|e| KfmError::ManifestCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        manifest.check().map_err(|reason| KfmError::ManifestCorrupt {
            path: self.path.clone(),
            reason,
        })?;

        tracing::debug!(
            run_id = %manifest.run_id,
            moves = manifest.moves.len(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Rename the manifest to `<record_time>_rev_kfm_record.json` next to it
    pub fn archive(&self, fs: &dyn FileSystem, manifest: &Manifest) -> Result<PathBuf> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        let mut target = parent.join(format!("{}{}", manifest.record_time, ARCHIVE_SUFFIX));
        let mut counter = 1;
        while fs.exists(&target) {
            target = parent.join(format!(
                "{}_{}{}",
                manifest.record_time, counter, ARCHIVE_SUFFIX
            ));
            counter += 1;
        }
        fs.rename(&self.path, &target)
            .with_path("archive manifest", &self.path)?;
        Ok(target)
    }
}
