//! In-memory provider
//!
//! Backs `ram://` paths with a shared map, so transfers can be wired up and
//! tested without touching disk or a network. One store exists per provider
//! instance; the router hands every `ram://` path of an authority to the
//! same instance.

use std::collections::HashMap;
use std::io::{Cursor, Error as IoError, ErrorKind, Write};
use std::sync::{Arc, Mutex};

use super::path::VfsPath;
use super::provider::{EntryKind, FileNameFilter, ReadStream, VfsProvider, WriteStream};
use crate::error::{FerryError, Result};

#[derive(Debug, Clone)]
enum MemNode {
    File(Vec<u8>),
    Folder,
}

type Store = Arc<Mutex<HashMap<String, MemNode>>>;

/// Provider for `ram://` paths
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    store: Store,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Create an empty in-memory filesystem containing only the root folder
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert("/".to_string(), MemNode::Folder);
        Self {
            store: Arc::new(Mutex::new(map)),
        }
    }

    fn key(path: &VfsPath) -> String {
        let trimmed = path.path().trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn parents(key: &str) -> Vec<String> {
        let mut parents = Vec::new();
        let mut current = key;
        while let Some(cut) = current.rfind('/') {
            let parent = if cut == 0 { "/" } else { &current[..cut] };
            parents.push(parent.to_string());
            if parent == "/" {
                break;
            }
            current = parent;
        }
        parents
    }

    fn ensure_parents(map: &mut HashMap<String, MemNode>, key: &str, uri: &str) -> Result<()> {
        for parent in Self::parents(key) {
            match map.get(&parent) {
                Some(MemNode::Folder) => {}
                Some(MemNode::File(_)) => {
                    return Err(FerryError::io(
                        uri.to_string(),
                        IoError::new(ErrorKind::AlreadyExists, "ancestor is a plain file"),
                    ));
                }
                None => {
                    map.insert(parent, MemNode::Folder);
                }
            }
        }
        Ok(())
    }

    fn missing(uri: String) -> FerryError {
        FerryError::io(uri, IoError::new(ErrorKind::NotFound, "no such entry"))
    }
}

impl VfsProvider for MemoryProvider {
    fn kind(&mut self, path: &VfsPath) -> Result<EntryKind> {
        let map = self.store.lock().unwrap();
        Ok(match map.get(&Self::key(path)) {
            Some(MemNode::File(_)) => EntryKind::File,
            Some(MemNode::Folder) => EntryKind::Folder,
            None => EntryKind::Missing,
        })
    }

    fn list(&mut self, dir: &VfsPath, filter: Option<&FileNameFilter>) -> Result<Vec<VfsPath>> {
        let key = Self::key(dir);
        let map = self.store.lock().unwrap();
        match map.get(&key) {
            Some(MemNode::Folder) => {}
            Some(MemNode::File(_)) | None => {
                return Err(FerryError::not_a_directory(dir.uri()));
            }
        }

        let prefix = if key == "/" { key } else { format!("{key}/") };
        let mut names: Vec<String> = map
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .filter(|name| filter.map_or(true, |f| f.matches(name)))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names.iter().map(|name| dir.join(name)).collect())
    }

    fn open_read(&mut self, path: &VfsPath) -> Result<ReadStream> {
        let map = self.store.lock().unwrap();
        match map.get(&Self::key(path)) {
            Some(MemNode::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MemNode::Folder) => Err(FerryError::io(
                path.uri(),
                IoError::new(ErrorKind::InvalidInput, "is a folder"),
            )),
            None => Err(Self::missing(path.uri())),
        }
    }

    fn open_write(&mut self, path: &VfsPath) -> Result<WriteStream> {
        Ok(Box::new(MemWriter {
            store: self.store.clone(),
            key: Self::key(path),
            uri: path.uri(),
            buf: Vec::new(),
        }))
    }

    fn copy_file(&mut self, src: &VfsPath, dst: &VfsPath) -> Result<()> {
        let mut map = self.store.lock().unwrap();
        let content = match map.get(&Self::key(src)) {
            Some(MemNode::File(content)) => content.clone(),
            Some(MemNode::Folder) => {
                return Err(FerryError::io(
                    src.uri(),
                    IoError::new(ErrorKind::InvalidInput, "is a folder"),
                ));
            }
            None => return Err(Self::missing(src.uri())),
        };
        let dst_key = Self::key(dst);
        Self::ensure_parents(&mut map, &dst_key, &dst.uri())?;
        map.insert(dst_key, MemNode::File(content));
        Ok(())
    }

    fn create_file(&mut self, path: &VfsPath) -> Result<()> {
        let mut map = self.store.lock().unwrap();
        let key = Self::key(path);
        if map.contains_key(&key) {
            return Err(FerryError::io(
                path.uri(),
                IoError::new(ErrorKind::AlreadyExists, "entry already exists"),
            ));
        }
        Self::ensure_parents(&mut map, &key, &path.uri())?;
        map.insert(key, MemNode::File(Vec::new()));
        Ok(())
    }

    fn create_dir_all(&mut self, path: &VfsPath) -> Result<()> {
        let mut map = self.store.lock().unwrap();
        let key = Self::key(path);
        Self::ensure_parents(&mut map, &key, &path.uri())?;
        match map.get(&key) {
            Some(MemNode::File(_)) => Err(FerryError::io(
                path.uri(),
                IoError::new(ErrorKind::AlreadyExists, "a plain file is in the way"),
            )),
            Some(MemNode::Folder) => Ok(()),
            None => {
                map.insert(key, MemNode::Folder);
                Ok(())
            }
        }
    }

    fn delete(&mut self, path: &VfsPath) -> Result<()> {
        let mut map = self.store.lock().unwrap();
        let key = Self::key(path);
        if let Some(MemNode::Folder) = map.get(&key) {
            let prefix = format!("{key}/");
            if map.keys().any(|k| k.starts_with(&prefix)) {
                return Err(FerryError::io(
                    path.uri(),
                    IoError::new(ErrorKind::Other, "folder is not empty"),
                ));
            }
        }
        match map.remove(&key) {
            Some(_) => Ok(()),
            None => Err(Self::missing(path.uri())),
        }
    }
}

/// Writer that commits its buffer to the store on flush
///
/// Dropping an unflushed writer also commits; in-memory writes cannot fail
/// part-way, so there is no partial state to protect against.
struct MemWriter {
    store: Store,
    key: String,
    uri: String,
    buf: Vec<u8>,
}

impl MemWriter {
    fn commit(&mut self) -> std::io::Result<()> {
        let mut map = self.store.lock().unwrap();
        MemoryProvider::ensure_parents(&mut map, &self.key, &self.uri)
            .map_err(|e| IoError::new(ErrorKind::AlreadyExists, e.to_string()))?;
        map.insert(self.key.clone(), MemNode::File(self.buf.clone()));
        Ok(())
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.commit()
    }
}

impl Drop for MemWriter {
    fn drop(&mut self) {
        let _ = self.commit();
    }
}
