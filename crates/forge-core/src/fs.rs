//! In-memory destination file store
//!
//! Generators never touch the destination directly. Writes land in memory,
//! reads fall back to disk, and the whole set is committed once the writing
//! phases are over.

use crate::error::{GeneratorError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Written(Vec<u8>),
    Deleted,
}

/// How `edit` treats a missing target
#[derive(Debug, Clone, Copy, Default)]
pub struct EditOptions {
    /// Skip silently instead of failing
    pub ignore_missing: bool,
    /// Start from empty content instead of failing
    pub create: bool,
}

/// A write staged by a per-entity task, merged after the task completes
#[derive(Debug, Clone)]
pub struct StagedWrite {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

/// Virtual file store rooted at a destination directory
#[derive(Debug)]
pub struct MemFs {
    root: PathBuf,
    entries: BTreeMap<PathBuf, Entry>,
}

impl MemFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination-relative key for a path
    fn key(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    pub fn write_destination(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let key = self.key(path);
        self.entries.insert(key, Entry::Written(content.into()));
    }

    /// Content from memory, falling back to disk. `None` when the file does
    /// not exist or was deleted in this run.
    pub fn read_destination(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        let key = self.key(path);
        match self.entries.get(&key) {
            Some(Entry::Written(content)) => Ok(Some(content.clone())),
            Some(Entry::Deleted) => Ok(None),
            None => match std::fs::read(self.root.join(&key)) {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    pub fn read_string(&self, path: impl AsRef<Path>) -> Result<Option<String>> {
        Ok(self
            .read_destination(path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Whether the file was written in this run and not deleted since
    pub fn exists_in_memory(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.entries.get(&self.key(path)), Some(Entry::Written(_)))
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let key = self.key(path);
        match self.entries.get(&key) {
            Some(Entry::Written(_)) => true,
            Some(Entry::Deleted) => false,
            None => self.root.join(&key).exists(),
        }
    }

    pub fn delete(&mut self, path: impl AsRef<Path>) {
        let key = self.key(path);
        self.entries.insert(key, Entry::Deleted);
    }

    /// Read-modify-write an existing file.
    ///
    /// Returns `false` when the target is missing and `ignore_missing` is set.
    pub fn edit<F>(&mut self, path: impl AsRef<Path>, options: EditOptions, f: F) -> Result<bool>
    where
        F: FnOnce(&str) -> String,
    {
        let key = self.key(path);
        let current = match self.read_string(&key)? {
            Some(content) => content,
            None if options.create => String::new(),
            None if options.ignore_missing => return Ok(false),
            None => {
                return Err(GeneratorError::EditTargetNotFound {
                    path: self.root.join(&key),
                })
            }
        };
        let updated = f(&current);
        self.write_destination(key, updated);
        Ok(true)
    }

    /// Merge writes staged by per-entity tasks.
    pub fn apply(&mut self, staged: Vec<StagedWrite>) {
        for write in staged {
            self.write_destination(write.path, write.content);
        }
    }

    /// Paths written in this run, relative to the root
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|(path, entry)| match entry {
            Entry::Written(_) => Some(path.as_path()),
            Entry::Deleted => None,
        })
    }

    /// Flush writes and deletions to disk. Returns the number of files written.
    pub async fn commit(&mut self) -> Result<usize> {
        fs::create_dir_all(&self.root).await?;
        let mut written = 0;

        for (key, entry) in std::mem::take(&mut self.entries) {
            let target = self.root.join(&key);
            match entry {
                Entry::Written(content) => {
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent).await?;
                    }
                    fs::write(&target, &content).await?;
                    written += 1;
                }
                Entry::Deleted => match fs::remove_file(&target).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                },
            }
        }

        tracing::info!(files = written, root = %self.root.display(), "committed destination");
        Ok(written)
    }
}
