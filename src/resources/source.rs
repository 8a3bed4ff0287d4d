//! Readers for resource trees.
//!
//! Resources live either in the bundle compiled into the binary or in a
//! directory on disk. Both are read through [`ResourceSource`], chosen once
//! when [`Resources`](super::Resources) is built.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use include_dir::{Dir, DirEntry, include_dir};

static EMBEDDED_RESOURCES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/resources");

/// One entry of a resource directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read access to a tree of resource files.
pub trait ResourceSource: Send + Sync + fmt::Debug {
    /// Lists a directory, sorted by name.
    fn read_dir(&self, path: &Path) -> Result<Vec<ResourceEntry>>;

    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    fn is_file(&self, path: &Path) -> bool;
}

/// Resources bundled into the binary from the crate's `resources/` directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedResourceSource;

impl ResourceSource for EmbeddedResourceSource {
    fn read_dir(&self, path: &Path) -> Result<Vec<ResourceEntry>> {
        let dir = EMBEDDED_RESOURCES
            .get_dir(path)
            .ok_or_else(|| anyhow!("Embedded resource directory not found: {}", path.display()))?;

        let mut entries: Vec<ResourceEntry> = dir
            .entries()
            .iter()
            .filter_map(|entry| {
                let name = entry.path().file_name()?.to_str()?.to_string();
                Some(ResourceEntry {
                    name,
                    is_dir: matches!(entry, DirEntry::Dir(_)),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        EMBEDDED_RESOURCES
            .get_file(path)
            .map(|file| file.contents().to_vec())
            .ok_or_else(|| anyhow!("Embedded resource file not found: {}", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        EMBEDDED_RESOURCES.get_file(path).is_some()
    }
}

/// Resources read from a directory on disk.
#[derive(Debug, Clone, Default)]
pub struct FilesystemResourceSource;

impl ResourceSource for FilesystemResourceSource {
    fn read_dir(&self, path: &Path) -> Result<Vec<ResourceEntry>> {
        let read = fs::read_dir(path)
            .with_context(|| format!("Failed to read resource directory: {}", path.display()))?;

        let mut entries = Vec::new();
        for entry in read {
            let entry = entry
                .with_context(|| format!("Failed to read directory entry in: {}", path.display()))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_dir = entry
                .file_type()
                .with_context(|| format!("Failed to stat: {}", entry.path().display()))?
                .is_dir();
            entries.push(ResourceEntry { name, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read resource file: {}", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Joins path components the way both sources expect.
pub(crate) fn join(root: &Path, parts: &[&str]) -> PathBuf {
    parts.iter().fold(root.to_path_buf(), |path, part| path.join(part))
}
