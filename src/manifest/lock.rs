//! Advisory run lock
//!
//! Two kfm processes working on the same group folder would interleave
//! moves and corrupt each other's manifest. Each run holds an exclusive
//! fs2 lock on `.kfm.lock` in the group folder until it finishes. The file
//! itself stays behind after the run; removing it would let a waiting
//! process lock an unlinked inode while a third one locks a fresh file.

use super::LOCK_FILE_NAME;
use crate::error::{IoResultExt, KfmError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Held for the duration of one forward or reverse run
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without blocking; a held lock means another run is active
    pub fn acquire(group_folder: &Path) -> Result<Self> {
        let path = group_folder.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_path("open lock file", &path)?;

        if let Err(err) = file.try_lock_exclusive() {
            if is_contended(&err) {
                return Err(KfmError::RunInProgress(group_folder.to_path_buf()));
            }
            return Err(err).with_path("lock", &path);
        }

        tracing::debug!(path = %path.display(), "Acquired run lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_lock_is_refused() {
        let dir = tempdir().unwrap();
        let first = RunLock::acquire(dir.path()).unwrap();
        assert!(first.path().exists());

        let second = RunLock::acquire(dir.path());
        assert!(matches!(second, Err(KfmError::RunInProgress(_))));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        {
            let _lock = RunLock::acquire(dir.path()).unwrap();
        }
        assert!(dir.path().join(LOCK_FILE_NAME).exists());
        assert!(RunLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_lock_file_kept_while_reacquired() {
        let dir = tempdir().unwrap();
        let first = RunLock::acquire(dir.path()).unwrap();
        drop(first);

        // Every later run locks the same file
        let second = RunLock::acquire(dir.path()).unwrap();
        assert!(matches!(
            RunLock::acquire(dir.path()),
            Err(KfmError::RunInProgress(_))
        ));
        drop(second);
        assert!(dir.path().join(LOCK_FILE_NAME).is_file());
    }

    #[test]
    fn test_missing_folder() {
        let dir = tempdir().unwrap();
        let err = RunLock::acquire(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, KfmError::Filesystem { .. }));
    }
}
