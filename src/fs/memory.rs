use super::{DirEntryInfo, FileSystem};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// In-memory [`FileSystem`] for tests.
///
/// Paths are used as given; callers should stick to absolute paths.
/// `fail_renames_after` and `fail_writes_after` simulate an interrupted run.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    renames_left: Cell<Option<usize>>,
    writes_left: Cell<Option<usize>>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and any missing parents
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
        self
    }

    /// Add a file, creating missing parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.nodes
            .borrow_mut()
            .insert(path.to_path_buf(), Node::File(contents.into()));
        self
    }

    /// Let `count` more renames succeed, then fail every rename after that
    pub fn fail_renames_after(&self, count: usize) {
        self.renames_left.set(Some(count));
    }

    /// Undo [`fail_renames_after`](Self::fail_renames_after)
    pub fn allow_renames(&self) {
        self.renames_left.set(None);
    }

    /// Let `count` more atomic writes succeed, then fail every write after that
    pub fn fail_writes_after(&self, count: usize) {
        self.writes_left.set(Some(count));
    }

    /// Undo [`fail_writes_after`](Self::fail_writes_after)
    pub fn allow_writes(&self) {
        self.writes_left.set(None);
    }

    /// Snapshot of every file and its contents
    pub fn files(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.nodes
            .borrow()
            .iter()
            .filter_map(|(path, node)| match node {
                Node::File(contents) => Some((path.clone(), contents.clone())),
                Node::Dir => None,
            })
            .collect()
    }

    /// Every directory path currently present
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.nodes
            .borrow()
            .iter()
            .filter(|(_, node)| **node == Node::Dir)
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn require_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                if self.nodes.borrow().get(parent) == Some(&Node::Dir) {
                    Ok(())
                } else {
                    Err(not_found(parent))
                }
            }
            _ => Ok(()),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.nodes.borrow().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.nodes.borrow().get(path) == Some(&Node::Dir)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        if !self.is_dir(path) {
            return Err(not_found(path));
        }
        let nodes = self.nodes.borrow();
        let mut entries: Vec<DirEntryInfo> = nodes
            .iter()
            .filter(|(child, _)| child.parent() == Some(path))
            .map(|(child, node)| DirEntryInfo {
                path: child.clone(),
                name: child
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                is_dir: *node == Node::Dir,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.exists(root) {
            return Err(not_found(root));
        }
        Ok(self
            .nodes
            .borrow()
            .iter()
            .filter(|(path, node)| matches!(node, Node::File(_)) && path.starts_with(root))
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        if self.exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        self.require_parent(path)?;
        self.nodes.borrow_mut().insert(path.to_path_buf(), Node::Dir);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(left) = self.renames_left.get() {
            if left == 0 {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "simulated interruption"));
            }
            self.renames_left.set(Some(left - 1));
        }
        if !self.exists(from) {
            return Err(not_found(from));
        }
        if self.exists(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        self.require_parent(to)?;

        let mut nodes = self.nodes.borrow_mut();
        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|path| path.starts_with(from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let suffix = old.strip_prefix(from).unwrap_or(Path::new(""));
                let new = if suffix.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(suffix)
                };
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get(path) {
            Some(Node::File(_)) => {
                nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        if !self.is_dir(path) {
            return Err(not_found(path));
        }
        let mut nodes = self.nodes.borrow_mut();
        if nodes.keys().any(|p| p.parent() == Some(path)) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is not empty", path.display()),
            ));
        }
        nodes.remove(path);
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.nodes.borrow().get(path) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            _ => Err(not_found(path)),
        }
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(left) = self.writes_left.get() {
            if left == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "simulated full disk"));
            }
            self.writes_left.set(Some(left - 1));
        }
        if self.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            ));
        }
        self.require_parent(path)?;
        self.nodes
            .borrow_mut()
            .insert(path.to_path_buf(), Node::File(contents.to_vec()));
        Ok(())
    }
}
