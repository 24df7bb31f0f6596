//! Filesystem access used by the planner, executor and replayer.
//!
//! Everything that reads or mutates the group folder goes through
//! [`FileSystem`], so planning and replay can be exercised against
//! [`MemoryFileSystem`] in tests and against [`OsFileSystem`] in the binary.

mod memory;
mod os;

pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use std::io;
use std::path::{Path, PathBuf};

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Direct children of `path`, sorted by name
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Every regular file below `root` at any depth, sorted by path
    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>>;

    /// Create one directory; the parent must exist
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Rename a file or directory; the destination parent must exist
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace `path` with `contents` so readers never see a partial file
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Temp file name used next to `path` while writing atomically
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
