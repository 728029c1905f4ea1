//! On-disk profile index.
//!
//! The base directory holds two plain-text files next to the profile
//! directories:
//!
//! - `profiles`: every known profile name, one per line
//! - `current_profile`: the name of the active profile
//!
//! Both are created empty on first use. If either path is occupied by a
//! directory, the directory is renamed aside to
//! `<name>.<timestamp>.bak` and a fresh empty file takes its place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::StorageResult;
use crate::names::{CURRENT_FILE, PROFILES_FILE, is_indexable};
use crate::storage::Storage;

/// Reads and writes the profile index under a base directory.
#[derive(Debug, Clone)]
pub struct ProfileIndex {
    root: PathBuf,
    storage: Arc<dyn Storage>,
}

impl ProfileIndex {
    /// Create an index rooted at `root`. Nothing is touched until
    /// [`ensure_scaffold`](Self::ensure_scaffold) runs.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, storage: Arc<dyn Storage>) -> Self {
        Self {
            root: root.into(),
            storage,
        }
    }

    /// Base directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the `profiles` file.
    #[must_use]
    pub fn profiles_path(&self) -> PathBuf {
        self.root.join(PROFILES_FILE)
    }

    /// Path of the `current_profile` file.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    /// Create the base directory and both index files if missing.
    ///
    /// # Errors
    ///
    /// Returns a storage error if any directory or file cannot be created.
    pub fn ensure_scaffold(&self) -> StorageResult<()> {
        if !self.storage.is_dir(&self.root) {
            self.storage.mkdir(&self.root)?;
            debug!(root = %self.root.display(), "Created profile root");
        }
        for path in [self.profiles_path(), self.current_path()] {
            self.ensure_file(&path)?;
        }
        Ok(())
    }

    fn ensure_file(&self, path: &Path) -> StorageResult<()> {
        if self.storage.is_dir(path) {
            let backup = self.backup_path(path);
            self.storage.rename(path, &backup)?;
            warn!(
                path = %path.display(),
                backup = %backup.display(),
                "Index path was a directory, moved it aside"
            );
        } else if self.storage.exists(path) {
            return Ok(());
        }
        self.storage.write(path, "")
    }

    /// Indexed profile names in file order, without blanks or repeats.
    ///
    /// Lines that are not usable as a directory name under the base
    /// directory (`..`, anything with a path separator, the index file
    /// names) are skipped with a warning. A missing `profiles` file reads
    /// as an empty list.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file exists but cannot be read.
    pub fn list(&self) -> StorageResult<Vec<String>> {
        let Some(text) = self.read_optional(&self.profiles_path())? else {
            return Ok(Vec::new());
        };
        let mut names: Vec<String> = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !is_indexable(line) {
                warn!(name = line, "Skipping unusable profile name in index");
                continue;
            }
            if !names.iter().any(|n| n == line) {
                names.push(line.to_owned());
            }
        }
        Ok(names)
    }

    /// Overwrite the `profiles` file. Repeated names are written once, at
    /// their first position.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be written.
    pub fn set_profiles<S: AsRef<str>>(&self, names: &[S]) -> StorageResult<()> {
        let mut written: Vec<&str> = Vec::with_capacity(names.len());
        let mut text = String::new();
        for name in names {
            let name: &str = name.as_ref();
            if written.contains(&name) {
                continue;
            }
            written.push(name);
            text.push_str(name);
            text.push('\n');
        }
        self.storage.write(&self.profiles_path(), &text)
    }

    /// Name recorded in `current_profile`, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file exists but cannot be read.
    pub fn current(&self) -> StorageResult<Option<String>> {
        let text = self.read_optional(&self.current_path())?;
        Ok(text
            .as_deref()
            .and_then(|t| t.lines().next())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned))
    }

    /// Overwrite `current_profile`. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be written.
    pub fn set_current(&self, name: Option<&str>) -> StorageResult<()> {
        let text = name.map(|n| format!("{n}\n")).unwrap_or_default();
        self.storage.write(&self.current_path(), &text)
    }

    /// `<name>.<timestamp>.bak` beside `path`, with a counter appended if
    /// a backup from the same second exists.
    fn backup_path(&self, path: &Path) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut candidate = path.with_file_name(format!("{name}.{stamp}.bak"));
        let mut attempt: u32 = 0;
        while self.storage.exists(&candidate) {
            attempt = attempt.saturating_add(1);
            candidate = path.with_file_name(format!("{name}.{stamp}-{attempt}.bak"));
        }
        candidate
    }

    fn read_optional(&self, path: &Path) -> StorageResult<Option<String>> {
        if !self.storage.exists(path) {
            return Ok(None);
        }
        self.storage.read(path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn index() -> (Arc<MemoryStorage>, ProfileIndex) {
        let storage = Arc::new(MemoryStorage::new());
        let index = ProfileIndex::new("/base", Arc::clone(&storage) as Arc<dyn Storage>);
        (storage, index)
    }

    #[test]
    fn test_scaffold_creates_empty_files() {
        let (storage, index) = index();
        index.ensure_scaffold().unwrap();

        assert!(storage.is_dir(Path::new("/base")));
        assert_eq!(storage.read(&index.profiles_path()).unwrap(), "");
        assert_eq!(storage.read(&index.current_path()).unwrap(), "");
        assert!(index.list().unwrap().is_empty());
        assert_eq!(index.current().unwrap(), None);
    }

    #[test]
    fn test_scaffold_keeps_existing_content() {
        let (_, index) = index();
        index.ensure_scaffold().unwrap();
        index.set_profiles(&["default", "work"]).unwrap();
        index.set_current(Some("work")).unwrap();

        index.ensure_scaffold().unwrap();
        assert_eq!(index.list().unwrap(), vec!["default", "work"]);
        assert_eq!(index.current().unwrap().as_deref(), Some("work"));
    }

    #[test]
    fn test_directory_in_place_of_index_is_backed_up() {
        let (storage, index) = index();
        storage.mkdir(&index.profiles_path()).unwrap();
        storage
            .write(&index.profiles_path().join("stray"), "keep me")
            .unwrap();

        index.ensure_scaffold().unwrap();

        assert!(storage.is_file(&index.profiles_path()));
        let backups: Vec<PathBuf> = storage
            .paths()
            .into_iter()
            .filter(|p| {
                let name = p.file_name().unwrap().to_string_lossy().into_owned();
                name.starts_with("profiles.") && name.ends_with(".bak")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(storage.read(&backups[0].join("stray")).unwrap(), "keep me");
    }

    #[test]
    fn test_repeated_backups_do_not_collide() {
        let (storage, index) = index();
        storage.mkdir(&index.current_path()).unwrap();
        index.ensure_scaffold().unwrap();
        storage.remove(&index.current_path()).unwrap();
        storage.mkdir(&index.current_path()).unwrap();
        index.ensure_scaffold().unwrap();

        let backups = storage
            .paths()
            .into_iter()
            .filter(|p| p.to_string_lossy().ends_with(".bak"))
            .count();
        assert_eq!(backups, 2);
    }

    #[test]
    fn test_set_profiles_drops_repeats() {
        let (storage, index) = index();
        index.ensure_scaffold().unwrap();
        index.set_profiles(&["a", "b", "a"]).unwrap();
        assert_eq!(storage.read(&index.profiles_path()).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_list_skips_blanks_and_repeats() {
        let (storage, index) = index();
        index.ensure_scaffold().unwrap();
        storage
            .write(&index.profiles_path(), "default\n\n work \ndefault\n")
            .unwrap();
        assert_eq!(index.list().unwrap(), vec!["default", "work"]);
    }

    #[test]
    fn test_list_skips_names_escaping_the_root() {
        let (storage, index) = index();
        index.ensure_scaffold().unwrap();
        storage
            .write(
                &index.profiles_path(),
                "default\n..\n../outside\n.\nprofiles\ncurrent_profile\nwork\n",
            )
            .unwrap();
        assert_eq!(index.list().unwrap(), vec!["default", "work"]);
    }

    #[test]
    fn test_missing_files_read_empty() {
        let (_, index) = index();
        assert!(index.list().unwrap().is_empty());
        assert_eq!(index.current().unwrap(), None);
    }

    #[test]
    fn test_clear_current() {
        let (_, index) = index();
        index.ensure_scaffold().unwrap();
        index.set_current(Some("x")).unwrap();
        index.set_current(None).unwrap();
        assert_eq!(index.current().unwrap(), None);
    }
}
