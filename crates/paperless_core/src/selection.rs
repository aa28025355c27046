use std::collections::HashSet;
use std::time::SystemTime;

use crate::SourceFile;

/// Identity of a staged file; two files with the same key are the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl FileKey {
    pub fn of(file: &SourceFile) -> Self {
        Self {
            name: file.name.clone(),
            size: file.size,
            modified: file.modified,
        }
    }
}

/// Pre-job staging buffer owned by the presentation layer.
///
/// Insertion order is preserved; it is the upload order.
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    files: Vec<SourceFile>,
    keys: HashSet<FileKey>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds files not already staged and returns how many were added.
    pub fn add(&mut self, incoming: impl IntoIterator<Item = SourceFile>) -> usize {
        let mut added = 0;
        for file in incoming {
            if self.keys.insert(FileKey::of(&file)) {
                self.files.push(file);
                added += 1;
            }
        }
        added
    }

    pub fn remove(&mut self, index: usize) -> Option<SourceFile> {
        if index >= self.files.len() {
            return None;
        }
        let removed = self.files.remove(index);
        self.keys.remove(&FileKey::of(&removed));
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.keys.clear();
    }

    /// Frozen copy handed to a job; later mutations do not reach it.
    pub fn snapshot(&self) -> Vec<SourceFile> {
        self.files.clone()
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}
