//! Backend capability interface
//!
//! Every backend exposes the same small surface: resolve what a path is,
//! list a directory, open byte streams, copy within the backend, and
//! create/delete entries. The transfer engine is written against this
//! trait only.

use std::io::{Read, Write};

use regex::Regex;

use super::path::VfsPath;
use crate::error::{FerryError, Result};

/// Kind of entry a path resolves to
///
/// Resolving a nonexistent path is not an error; it yields
/// [`EntryKind::Missing`] and only operations on the entry fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A plain file
    File,
    /// A directory
    Folder,
    /// Nothing exists at the path
    Missing,
}

/// Boxed readable stream handed out by providers
pub type ReadStream = Box<dyn Read + Send>;

/// Boxed writable stream handed out by providers
pub type WriteStream = Box<dyn Write + Send>;

/// Full-match filter on base file names
///
/// The pattern is anchored on both ends, so `report.*` selects
/// `report-1.xml` but never `old-report-1.xml`. Matching is case-sensitive.
#[derive(Debug, Clone)]
pub struct FileNameFilter {
    pattern: Regex,
}

impl FileNameFilter {
    /// Compile a filter from a raw pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{pattern})$");
        let compiled = Regex::new(&anchored).map_err(|e| {
            FerryError::config(format!("invalid file pattern '{pattern}': {e}"))
        })?;
        Ok(Self { pattern: compiled })
    }

    /// Check a base name against the pattern
    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}

/// Capability surface every backend provider implements
///
/// Methods take `&mut self`: a provider owns its protocol session and the
/// router serializes access to each instance. Streams returned by
/// `open_read`/`open_write` are independent of the provider and may outlive
/// the call.
pub trait VfsProvider: Send {
    /// What, if anything, exists at the path
    fn kind(&mut self, path: &VfsPath) -> Result<EntryKind>;

    /// Children of a directory, sorted by name
    ///
    /// A filter restricts the listing to matching base names. Listing a
    /// missing path or a plain file is an error.
    fn list(&mut self, dir: &VfsPath, filter: Option<&FileNameFilter>) -> Result<Vec<VfsPath>>;

    /// Open a file for reading
    fn open_read(&mut self, path: &VfsPath) -> Result<ReadStream>;

    /// Open a file for writing, truncating any existing content
    fn open_write(&mut self, path: &VfsPath) -> Result<WriteStream>;

    /// Copy a file to another path on the same backend in one call
    fn copy_file(&mut self, src: &VfsPath, dst: &VfsPath) -> Result<()>;

    /// Create an empty file, failing if the path already exists where the
    /// backend can express that
    fn create_file(&mut self, path: &VfsPath) -> Result<()>;

    /// Create a directory and any missing ancestors
    fn create_dir_all(&mut self, path: &VfsPath) -> Result<()>;

    /// Delete a file or an empty directory
    fn delete(&mut self, path: &VfsPath) -> Result<()>;

    /// Check whether anything exists at the path
    fn exists(&mut self, path: &VfsPath) -> Result<bool> {
        Ok(self.kind(path)? != EntryKind::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_whole_name_only() {
        let filter = FileNameFilter::new(r"report.*\.xml").unwrap();
        assert!(filter.matches("report-1.xml"));
        assert!(filter.matches("report.xml"));
        assert!(!filter.matches("old-report-1.xml"));
        assert!(!filter.matches("report-1.xml.bak"));
    }

    #[test]
    fn test_filter_anchors_alternations() {
        let filter = FileNameFilter::new("a|b").unwrap();
        assert!(filter.matches("a"));
        assert!(filter.matches("b"));
        assert!(!filter.matches("ab"));
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let filter = FileNameFilter::new(r".*\.XML").unwrap();
        assert!(!filter.matches("report.xml"));
        assert!(filter.matches("report.XML"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = FileNameFilter::new("*.xml").unwrap_err();
        assert!(matches!(err, FerryError::Config(_)));
        assert!(!err.is_transient());
    }
}
