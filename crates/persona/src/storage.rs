//! Filesystem seam.
//!
//! Every file the manager touches goes through a [`Storage`]. Production
//! code uses [`FsStorage`]; tests and embedders that want no disk I/O use
//! [`MemoryStorage`].

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{StorageError, StorageResult};

/// Minimal file operations the profile manager needs.
///
/// Paths are always absolute-or-as-given; implementations do not resolve
/// them against anything.
pub trait Storage: std::fmt::Debug + Send + Sync {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether `path` is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    ///
    /// # Errors
    ///
    /// Fails if a component exists as a file or the call is refused.
    fn mkdir(&self, path: &Path) -> StorageResult<()>;

    /// Read a whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, is a directory, or cannot be read.
    fn read(&self, path: &Path) -> StorageResult<String>;

    /// Create or truncate a file with `contents`.
    ///
    /// # Errors
    ///
    /// Fails if the parent directory is missing or `path` is a directory.
    fn write(&self, path: &Path, contents: &str) -> StorageResult<()>;

    /// Remove a file or a directory tree. Missing paths are not an error.
    ///
    /// # Errors
    ///
    /// Fails if the removal is refused.
    fn remove(&self, path: &Path) -> StorageResult<()>;

    /// Copy a file.
    ///
    /// # Errors
    ///
    /// Fails if `from` is not a file or `to` cannot be written.
    fn copy(&self, from: &Path, to: &Path) -> StorageResult<()>;

    /// Move a file or directory.
    ///
    /// # Errors
    ///
    /// Fails if `from` is missing or the target parent does not exist.
    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()>;
}

/// [`Storage`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

fn classify(op: &'static str, path: &Path, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_path_buf())
    } else {
        StorageError::io(op, path, err)
    }
}

impl Storage for FsStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn mkdir(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path).map_err(|e| StorageError::io("mkdir", path, e))
    }

    fn read(&self, path: &Path) -> StorageResult<String> {
        if path.is_dir() {
            return Err(StorageError::IsDirectory(path.to_path_buf()));
        }
        fs::read_to_string(path).map_err(|e| classify("read", path, e))
    }

    fn write(&self, path: &Path, contents: &str) -> StorageResult<()> {
        if path.is_dir() {
            return Err(StorageError::IsDirectory(path.to_path_buf()));
        }
        fs::write(path, contents).map_err(|e| classify("write", path, e))
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io("remove", path, e)),
        }
    }

    fn copy(&self, from: &Path, to: &Path) -> StorageResult<()> {
        if from.is_dir() {
            return Err(StorageError::IsDirectory(from.to_path_buf()));
        }
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| classify("copy", from, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()> {
        fs::rename(from, to).map_err(|e| classify("rename", from, e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(String),
}

/// In-memory [`Storage`].
///
/// Holds a flat map of path to node. Parent directories must exist before
/// a file is written, like on a real filesystem. Reads of individual paths
/// can be made to fail with [`deny_reads`](Self::deny_reads).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    unreadable: RwLock<HashSet<PathBuf>>,
}

impl MemoryStorage {
    /// Create an empty in-memory filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read of `path` fail with a permission error.
    pub fn deny_reads(&self, path: impl Into<PathBuf>) {
        self.unreadable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into());
    }

    /// Paths currently present, in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.read_nodes().keys().cloned().collect()
    }

    fn read_nodes(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_nodes(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn node(&self, path: &Path) -> Option<Node> {
        self.read_nodes().get(path).cloned()
    }
}

fn parent_ready(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> StorageResult<()> {
    match path.parent() {
        None => Ok(()),
        Some(parent) if parent.as_os_str().is_empty() => Ok(()),
        Some(parent) => match nodes.get(parent) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(StorageError::NotDirectory(parent.to_path_buf())),
            None => Err(StorageError::NotFound(parent.to_path_buf())),
        },
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, path: &Path) -> bool {
        self.read_nodes().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.node(path), Some(Node::Dir))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.node(path), Some(Node::File(_)))
    }

    fn mkdir(&self, path: &Path) -> StorageResult<()> {
        let mut nodes = self.write_nodes();
        let missing: Vec<&Path> = path
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        for dir in &missing {
            if let Some(Node::File(_)) = nodes.get(*dir) {
                return Err(StorageError::NotDirectory(dir.to_path_buf()));
            }
        }
        for dir in missing {
            nodes.entry(dir.to_path_buf()).or_insert(Node::Dir);
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> StorageResult<String> {
        let denied = self
            .unreadable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path);
        if denied {
            return Err(StorageError::io(
                "read",
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            ));
        }

        match self.node(path) {
            Some(Node::File(contents)) => Ok(contents),
            Some(Node::Dir) => Err(StorageError::IsDirectory(path.to_path_buf())),
            None => Err(StorageError::NotFound(path.to_path_buf())),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> StorageResult<()> {
        let mut nodes = self.write_nodes();
        if let Some(Node::Dir) = nodes.get(path) {
            return Err(StorageError::IsDirectory(path.to_path_buf()));
        }
        parent_ready(&nodes, path)?;
        nodes.insert(path.to_path_buf(), Node::File(contents.to_owned()));
        Ok(())
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        self.write_nodes().retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> StorageResult<()> {
        let contents = self.read(from)?;
        self.write(to, &contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()> {
        let mut nodes = self.write_nodes();
        if !nodes.contains_key(from) {
            return Err(StorageError::NotFound(from.to_path_buf()));
        }
        parent_ready(&nodes, to)?;

        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        nodes.retain(|p, _| !p.starts_with(to));
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let relative = old.strip_prefix(from).unwrap_or(Path::new(""));
                let new = if relative.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(relative)
                };
                nodes.insert(new, node);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn Storage, root: &Path) {
        let dir = root.join("a/b");
        storage.mkdir(&dir).unwrap();
        assert!(storage.is_dir(&dir));
        assert!(storage.is_dir(&root.join("a")));

        let file = dir.join("config");
        storage.write(&file, "hello").unwrap();
        assert!(storage.is_file(&file));
        assert!(!storage.is_dir(&file));
        assert_eq!(storage.read(&file).unwrap(), "hello");

        let copy = dir.join("copy");
        storage.copy(&file, &copy).unwrap();
        assert_eq!(storage.read(&copy).unwrap(), "hello");

        let moved = root.join("moved");
        storage.rename(&root.join("a"), &moved).unwrap();
        assert!(!storage.exists(&root.join("a")));
        assert_eq!(storage.read(&moved.join("b/config")).unwrap(), "hello");

        storage.remove(&moved).unwrap();
        assert!(!storage.exists(&moved.join("b/config")));
        storage.remove(&moved).unwrap();

        assert!(matches!(
            storage.read(&root.join("missing")),
            Err(StorageError::NotFound(_))
        ));
        assert!(storage.write(&root.join("no/parent"), "x").is_err());
    }

    #[test]
    fn test_fs_storage() {
        let temp = tempfile::tempdir().unwrap();
        exercise(&FsStorage, temp.path());
    }

    #[test]
    fn test_memory_storage() {
        exercise(&MemoryStorage::new(), Path::new("/mem"));
    }

    #[test]
    fn test_read_of_directory_fails() {
        let storage = MemoryStorage::new();
        storage.mkdir(Path::new("/d")).unwrap();
        assert!(matches!(
            storage.read(Path::new("/d")),
            Err(StorageError::IsDirectory(_))
        ));
        assert!(matches!(
            storage.write(Path::new("/d"), ""),
            Err(StorageError::IsDirectory(_))
        ));
    }

    #[test]
    fn test_mkdir_through_file_fails() {
        let storage = MemoryStorage::new();
        storage.mkdir(Path::new("/d")).unwrap();
        storage.write(Path::new("/d/f"), "").unwrap();
        assert!(matches!(
            storage.mkdir(Path::new("/d/f/g")),
            Err(StorageError::NotDirectory(_))
        ));
    }

    #[test]
    fn test_denied_read() {
        let storage = MemoryStorage::new();
        storage.mkdir(Path::new("/d")).unwrap();
        storage.write(Path::new("/d/f"), "x").unwrap();
        storage.deny_reads("/d/f");
        assert!(matches!(
            storage.read(Path::new("/d/f")),
            Err(StorageError::Io { op: "read", .. })
        ));
        assert!(storage.is_file(Path::new("/d/f")));
    }
}
