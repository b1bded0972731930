//! Scheme router and provider cache

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::ftp::FtpProvider;
use super::local::LocalProvider;
use super::memory::MemoryProvider;
use super::path::{ProviderKey, Scheme, VfsPath};
use super::provider::{EntryKind, FileNameFilter, ReadStream, VfsProvider, WriteStream};
use super::sftp::SftpProvider;
use crate::config::TransferOptions;
use crate::error::{FerryError, Result};

/// Buffer size for copies that cross backends
const CROSS_COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Connection parameters providers read at connect time
///
/// These arrive with the options snapshot of each invocation; nothing here
/// is process-wide.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// FTP data connections use passive mode
    pub ftp_passive_mode: bool,
    /// SFTP blocking-call timeout in milliseconds
    pub sftp_timeout_ms: Option<u32>,
    /// SFTP private key for authentication
    pub sftp_auth_key_path: Option<PathBuf>,
    /// SFTP paths are relative to the login home directory
    pub sftp_user_dir_is_root: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ftp_passive_mode: false,
            sftp_timeout_ms: None,
            sftp_auth_key_path: None,
            sftp_user_dir_is_root: true,
        }
    }
}

impl BackendConfig {
    /// Extract the connection parameters from an options snapshot
    pub fn from_options(options: &TransferOptions) -> Self {
        Self {
            ftp_passive_mode: options.ftp_passive_mode,
            sftp_timeout_ms: options.sftp_timeout_ms,
            sftp_auth_key_path: options.sftp_auth_key_path.clone(),
            sftp_user_dir_is_root: options.sftp_user_dir_is_root,
        }
    }
}

/// Router dispatching paths to backend providers
///
/// Remote providers connect lazily, on the first path addressing their
/// endpoint, and are cached per endpoint for the rest of the invocation;
/// connection failures therefore surface from [`Vfs::resolve`], inside the
/// caller's retry wrapper. Cloning shares the provider cache.
#[derive(Clone)]
pub struct Vfs {
    providers: Arc<Mutex<HashMap<ProviderKey, Box<dyn VfsProvider>>>>,
    config: BackendConfig,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl Vfs {
    /// Create a router with the given connection parameters
    pub fn new(config: BackendConfig) -> Self {
        Self {
            providers: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Create a router from an options snapshot
    pub fn from_options(options: &TransferOptions) -> Self {
        Self::new(BackendConfig::from_options(options))
    }

    /// Register a provider for a key, replacing any cached one
    ///
    /// This is how tests slot fault-injecting providers under real paths.
    pub fn mount(&self, key: ProviderKey, provider: Box<dyn VfsProvider>) {
        self.providers.lock().unwrap().insert(key, provider);
    }

    /// Parse a URI and make sure its provider is reachable
    ///
    /// For remote schemes this is where the connection is dialed, so an
    /// unreachable endpoint fails here and not somewhere deeper.
    pub fn resolve(&self, uri: &str) -> Result<VfsPath> {
        let path = VfsPath::parse(uri)?;
        self.with_provider(&path, |_| Ok(()))?;
        Ok(path)
    }

    /// What, if anything, exists at the path
    pub fn kind(&self, path: &VfsPath) -> Result<EntryKind> {
        self.with_provider(path, |p| p.kind(path))
    }

    /// Children of a directory, sorted by name, optionally filtered
    pub fn list(&self, dir: &VfsPath, filter: Option<&FileNameFilter>) -> Result<Vec<VfsPath>> {
        self.with_provider(dir, |p| p.list(dir, filter))
    }

    /// Open a file for reading; the stream outlives this call
    pub fn open_read(&self, path: &VfsPath) -> Result<ReadStream> {
        self.with_provider(path, |p| p.open_read(path))
    }

    /// Open a file for writing; the stream outlives this call
    pub fn open_write(&self, path: &VfsPath) -> Result<WriteStream> {
        self.with_provider(path, |p| p.open_write(path))
    }

    /// Copy a file as one call, wherever the endpoints live
    ///
    /// Same-backend copies go through the provider. A copy across backends
    /// falls back to streaming the bytes through the router, still presented
    /// to the caller as a single call so it stays a single retryable unit.
    pub fn copy_file(&self, src: &VfsPath, dst: &VfsPath) -> Result<()> {
        if src.provider_key() == dst.provider_key() {
            return self.with_provider(src, |p| p.copy_file(src, dst));
        }

        let mut reader = self.open_read(src)?;
        let mut writer = self.open_write(dst)?;
        let mut buffer = vec![0u8; CROSS_COPY_BUFFER_SIZE];
        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| FerryError::io(src.uri(), e))?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| FerryError::io(dst.uri(), e))?;
        }
        writer.flush().map_err(|e| FerryError::io(dst.uri(), e))?;
        Ok(())
    }

    /// Create an empty file
    pub fn create_file(&self, path: &VfsPath) -> Result<()> {
        self.with_provider(path, |p| p.create_file(path))
    }

    /// Create a directory and any missing ancestors
    pub fn create_dir_all(&self, path: &VfsPath) -> Result<()> {
        self.with_provider(path, |p| p.create_dir_all(path))
    }

    /// Delete a file or an empty directory
    pub fn delete(&self, path: &VfsPath) -> Result<()> {
        self.with_provider(path, |p| p.delete(path))
    }

    /// Check whether anything exists at the path
    pub fn exists(&self, path: &VfsPath) -> Result<bool> {
        self.with_provider(path, |p| p.exists(path))
    }

    fn with_provider<T>(
        &self,
        path: &VfsPath,
        f: impl FnOnce(&mut dyn VfsProvider) -> Result<T>,
    ) -> Result<T> {
        let mut providers = self.providers.lock().unwrap();
        let provider = match providers.entry(path.provider_key()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(create_provider(&self.config, path)?),
        };
        f(provider.as_mut())
    }
}

fn create_provider(config: &BackendConfig, path: &VfsPath) -> Result<Box<dyn VfsProvider>> {
    Ok(match path.scheme() {
        Scheme::File => Box::new(LocalProvider::new()),
        Scheme::Ram => Box::new(MemoryProvider::new()),
        Scheme::Ftp => Box::new(FtpProvider::connect(path.authority(), config)?),
        Scheme::Sftp => Box::new(SftpProvider::connect(path.authority(), config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_through(vfs: &Vfs, uri: &str, content: &[u8]) -> VfsPath {
        let path = vfs.resolve(uri).unwrap();
        let mut writer = vfs.open_write(&path).unwrap();
        writer.write_all(content).unwrap();
        writer.flush().unwrap();
        path
    }

    #[test]
    fn test_ram_round_trip_through_router() {
        let vfs = Vfs::default();
        let dir = vfs.resolve("ram:///queues/in").unwrap();
        vfs.create_dir_all(&dir).unwrap();

        let file = write_through(&vfs, "ram:///queues/in/a.txt", b"hello");
        assert_eq!(vfs.kind(&file).unwrap(), EntryKind::File);
        assert!(vfs.exists(&file).unwrap());

        let listed = vfs.list(&dir, None).unwrap();
        assert_eq!(listed, vec![file.clone()]);

        let mut content = Vec::new();
        vfs.open_read(&file)
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"hello");
    }

    #[test]
    fn test_provider_cache_shares_ram_store() {
        let vfs = Vfs::default();
        write_through(&vfs, "ram:///in/a.txt", b"x");

        // A second resolve of the same authority must see the same store
        let dir = vfs.resolve("ram:///in").unwrap();
        assert_eq!(vfs.list(&dir, None).unwrap().len(), 1);
    }

    #[test]
    fn test_same_backend_copy() {
        let vfs = Vfs::default();
        let src = write_through(&vfs, "ram:///in/a.txt", b"data");
        let dst = vfs.resolve("ram:///out/a.txt").unwrap();

        vfs.copy_file(&src, &dst).unwrap();

        let mut content = Vec::new();
        vfs.open_read(&dst)
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"data");
    }

    #[test]
    fn test_cross_backend_copy() {
        let vfs = Vfs::default();
        let dir = TempDir::new().unwrap();

        let src = write_through(&vfs, "ram:///in/a.txt", b"ferry me");
        let dst = vfs
            .resolve(&dir.path().join("a.txt").to_string_lossy())
            .unwrap();

        vfs.copy_file(&src, &dst).unwrap();
        assert_eq!(std::fs::read(dst.path()).unwrap(), b"ferry me");
    }

    #[test]
    fn test_mount_overrides_provider() {
        let vfs = Vfs::default();
        let path = VfsPath::parse("ram:///in/seeded.txt").unwrap();

        let mut seeded = MemoryProvider::new();
        let mut writer = seeded.open_write(&path).unwrap();
        writer.write_all(b"preloaded").unwrap();
        writer.flush().unwrap();
        drop(writer);

        vfs.mount(path.provider_key(), Box::new(seeded));
        assert_eq!(vfs.kind(&path).unwrap(), EntryKind::File);
    }

    #[test]
    fn test_unsupported_scheme_fails_resolve() {
        let vfs = Vfs::default();
        let err = vfs.resolve("s3://bucket/key").unwrap_err();
        assert!(matches!(err, FerryError::UnsupportedScheme(_)));
    }
}
