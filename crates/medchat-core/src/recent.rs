//! Bounded most-recent-first list of previously attached files.
//!
//! The whole list is rewritten to a single JSON file on every mutation, the
//! same shape a browser would keep under its `recentFiles` storage key.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use log::{debug, warn};

use crate::error::{ChatError, Result};
use crate::message::FileRef;

pub const RECENT_FILES_CAPACITY: usize = 5;

#[derive(Debug, Clone)]
pub struct RecentFiles {
    entries: Vec<FileRef>,
    path: Option<PathBuf>,
}

impl RecentFiles {
    /// A list that is never written anywhere
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            path: None,
        }
    }

    /// Load the list persisted at `path`. A missing or unreadable file yields
    /// an empty list; the file is only ever read here.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring recent files at {}: {}", path.display(), e);
                Vec::new()
            }
        };
        entries.truncate(RECENT_FILES_CAPACITY);
        debug!("Loaded {} recent files from {}", entries.len(), path.display());

        Self {
            entries,
            path: Some(path),
        }
    }

    /// Default location: `<data_dir>/medchat/recent_files.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("medchat").join("recent_files.json"))
    }

    pub fn entries(&self) -> &[FileRef] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FileRef> {
        self.entries.get(index)
    }

    /// Move (or insert) `entry` to the front, evicting the oldest entry past
    /// capacity, then persist.
    pub fn add(&mut self, entry: FileRef) -> Result<()> {
        self.entries.retain(|e| e.file_path != entry.file_path);
        self.entries.insert(0, entry);
        self.entries.truncate(RECENT_FILES_CAPACITY);
        self.persist()
    }

    /// Drop the entry with `file_path`, then persist. Returns whether anything
    /// was removed; the file is rewritten either way.
    pub fn remove(&mut self, file_path: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.file_path != file_path);
        let removed = self.entries.len() != before;
        self.persist()?;
        Ok(removed)
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ChatError::Storage(e.to_string()))?;
        }

        let content = serde_json::to_string(&self.entries)?;
        fs::write(path, content).map_err(|e| ChatError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> anyhow::Result<Vec<FileRef>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    // A stored `null` reads back as an empty list
    let entries: Option<Vec<FileRef>> = serde_json::from_str(&content)?;
    Ok(entries.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> FileRef {
        FileRef::new(format!("file{}.png", n), format!("/static/uploads/file{}.png", n))
    }

    #[test]
    fn test_add_puts_newest_first() {
        let mut recent = RecentFiles::in_memory();
        recent.add(entry(1)).unwrap();
        recent.add(entry(2)).unwrap();

        assert_eq!(recent.entries(), &[entry(2), entry(1)]);
    }

    #[test]
    fn test_sixth_entry_evicts_oldest() {
        let mut recent = RecentFiles::in_memory();
        for n in 1..=6 {
            recent.add(entry(n)).unwrap();
        }

        assert_eq!(recent.len(), RECENT_FILES_CAPACITY);
        assert_eq!(recent.get(0), Some(&entry(6)));
        assert!(!recent.entries().contains(&entry(1)));
    }

    #[test]
    fn test_readding_moves_to_front_without_growing() {
        let mut recent = RecentFiles::in_memory();
        for n in 1..=3 {
            recent.add(entry(n)).unwrap();
        }
        recent.add(entry(1)).unwrap();

        assert_eq!(recent.entries(), &[entry(1), entry(3), entry(2)]);
    }

    #[test]
    fn test_readding_full_list_keeps_everything() {
        let mut recent = RecentFiles::in_memory();
        for n in 1..=5 {
            recent.add(entry(n)).unwrap();
        }
        recent.add(entry(1)).unwrap();

        assert_eq!(recent.len(), 5);
        assert_eq!(recent.get(0), Some(&entry(1)));
        assert!(recent.entries().contains(&entry(2)));
    }

    #[test]
    fn test_remove() {
        let mut recent = RecentFiles::in_memory();
        recent.add(entry(1)).unwrap();
        recent.add(entry(2)).unwrap();

        assert!(recent.remove("/static/uploads/file1.png").unwrap());
        assert!(!recent.remove("/static/uploads/missing.png").unwrap());
        assert_eq!(recent.entries(), &[entry(2)]);
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recent_files.json");

        let mut recent = RecentFiles::load(&path);
        assert!(recent.is_empty());
        recent.add(entry(1)).unwrap();
        recent.add(entry(2)).unwrap();
        recent.remove("/static/uploads/file1.png").unwrap();

        let reloaded = RecentFiles::load(&path);
        assert_eq!(reloaded.entries(), &[entry(2)]);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"filePath\""));
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent_files.json");
        fs::write(&path, "{not json").unwrap();

        let recent = RecentFiles::load(&path);
        assert!(recent.is_empty());
    }

    #[test]
    fn test_oversized_file_is_truncated_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent_files.json");
        let many: Vec<FileRef> = (1..=8).map(entry).collect();
        fs::write(&path, serde_json::to_string(&many).unwrap()).unwrap();

        let recent = RecentFiles::load(&path);
        assert_eq!(recent.len(), RECENT_FILES_CAPACITY);
        assert_eq!(recent.get(0), Some(&entry(1)));
    }
}
