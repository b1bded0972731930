//! Local-disk provider

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind};

use super::path::VfsPath;
use super::provider::{EntryKind, FileNameFilter, ReadStream, VfsProvider, WriteStream};
use crate::error::{FerryError, IoResultExt, Result};

/// Provider for local-disk paths
#[derive(Debug, Default)]
pub struct LocalProvider;

impl LocalProvider {
    /// Create a local provider
    pub fn new() -> Self {
        Self
    }
}

impl VfsProvider for LocalProvider {
    /// Follows symlinks, so a link to a directory reports as a folder
    fn kind(&mut self, path: &VfsPath) -> Result<EntryKind> {
        match fs::metadata(path.path()) {
            Ok(meta) if meta.is_dir() => Ok(EntryKind::Folder),
            Ok(_) => Ok(EntryKind::File),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(EntryKind::Missing),
            Err(e) => Err(FerryError::io(path.uri(), e)),
        }
    }

    fn list(&mut self, dir: &VfsPath, filter: Option<&FileNameFilter>) -> Result<Vec<VfsPath>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir.path()).with_uri(dir.uri())? {
            let entry = entry.with_uri(dir.uri())?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if filter.map_or(true, |f| f.matches(&name)) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names.iter().map(|name| dir.join(name)).collect())
    }

    fn open_read(&mut self, path: &VfsPath) -> Result<ReadStream> {
        let file = File::open(path.path()).with_uri(path.uri())?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&mut self, path: &VfsPath) -> Result<WriteStream> {
        let file = File::create(path.path()).with_uri(path.uri())?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn copy_file(&mut self, src: &VfsPath, dst: &VfsPath) -> Result<()> {
        fs::copy(src.path(), dst.path()).with_uri(src.uri())?;
        Ok(())
    }

    fn create_file(&mut self, path: &VfsPath) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.path())
            .with_uri(path.uri())?;
        Ok(())
    }

    fn create_dir_all(&mut self, path: &VfsPath) -> Result<()> {
        fs::create_dir_all(path.path()).with_uri(path.uri())
    }

    fn delete(&mut self, path: &VfsPath) -> Result<()> {
        let is_dir = fs::metadata(path.path())
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if is_dir {
            fs::remove_dir(path.path()).with_uri(path.uri())
        } else {
            fs::remove_file(path.path()).with_uri(path.uri())
        }
    }
}
