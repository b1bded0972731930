//! SFTP provider
//!
//! Adapts the ssh2 crate to the provider interface. One provider instance
//! holds one authenticated session; the router creates it lazily on the
//! first path that needs the endpoint.

use std::net::TcpStream;
use std::path::{Path, PathBuf};

use ssh2::{ErrorCode, OpenFlags, OpenType, Session, Sftp};

use super::path::{Authority, VfsPath};
use super::provider::{EntryKind, FileNameFilter, ReadStream, VfsProvider, WriteStream};
use super::BackendConfig;
use crate::error::{FerryError, Result};

/// Copy buffer for same-endpoint copies
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// SFTP error codes for a path that does not exist
const FX_NO_SUCH_FILE: i32 = 2;
const FX_NO_SUCH_PATH: i32 = 10;

/// Provider for `sftp://` paths
pub struct SftpProvider {
    sftp: Sftp,
    /// Login home directory; `Some` when paths are home-relative
    home: Option<String>,
}

impl SftpProvider {
    /// Connect and authenticate against an SFTP endpoint
    pub fn connect(authority: &Authority, config: &BackendConfig) -> Result<Self> {
        let user = authority
            .user
            .clone()
            .ok_or_else(|| FerryError::auth("", &authority.host, "no user name in URI"))?;
        let endpoint = authority.endpoint(22);

        let tcp = TcpStream::connect(&endpoint)
            .map_err(|e| FerryError::connection(&endpoint, e.to_string()))?;

        let mut session = Session::new()
            .map_err(|e| FerryError::connection(&endpoint, e.to_string()))?;
        if let Some(ms) = config.sftp_timeout_ms {
            session.set_timeout(ms);
        }
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| FerryError::connection(&endpoint, e.to_string()))?;

        Self::authenticate(&mut session, &user, authority, config)?;

        let sftp = session
            .sftp()
            .map_err(|e| FerryError::connection(&endpoint, e.to_string()))?;

        let home = if config.sftp_user_dir_is_root {
            let resolved = sftp
                .realpath(Path::new("."))
                .map_err(|e| FerryError::connection(&endpoint, e.to_string()))?;
            Some(resolved.to_string_lossy().into_owned())
        } else {
            None
        };

        Ok(Self { sftp, home })
    }

    /// Authenticate with the endpoint
    ///
    /// Tries the URI password, then a configured key file, then the SSH
    /// agent.
    fn authenticate(
        session: &mut Session,
        user: &str,
        authority: &Authority,
        config: &BackendConfig,
    ) -> Result<()> {
        if let Some(password) = &authority.password {
            session
                .userauth_password(user, password)
                .map_err(|e| FerryError::auth(user, &authority.host, e.to_string()))?;
        } else if let Some(key_path) = &config.sftp_auth_key_path {
            session
                .userauth_pubkey_file(user, None, key_path, None)
                .map_err(|e| FerryError::auth(user, &authority.host, e.to_string()))?;
        } else {
            let mut agent = session
                .agent()
                .map_err(|e| FerryError::auth(user, &authority.host, e.to_string()))?;
            agent
                .connect()
                .map_err(|e| FerryError::auth(user, &authority.host, e.to_string()))?;
            agent
                .list_identities()
                .map_err(|e| FerryError::auth(user, &authority.host, e.to_string()))?;

            let identities = agent.identities().unwrap_or_default();
            let mut authenticated = false;
            for identity in identities {
                if agent.userauth(user, &identity).is_ok() {
                    authenticated = true;
                    break;
                }
            }
            if !authenticated {
                return Err(FerryError::auth(
                    user,
                    &authority.host,
                    "no valid SSH key found in agent",
                ));
            }
        }

        if !session.authenticated() {
            return Err(FerryError::auth(
                user,
                &authority.host,
                "authentication failed",
            ));
        }
        Ok(())
    }

    fn real_path(&self, path: &VfsPath) -> PathBuf {
        apply_home(self.home.as_deref(), path)
    }

    fn error(&self, path: &VfsPath, e: ssh2::Error) -> FerryError {
        FerryError::protocol("sftp", path.uri(), e.to_string())
    }
}

/// Map a URI path onto the remote filesystem
///
/// With a home directory, URI paths are relative to it, so
/// `sftp://host/upload` lands in `~/upload`. Without one, they are used as
/// absolute paths.
fn apply_home(home: Option<&str>, path: &VfsPath) -> PathBuf {
    match home {
        Some(home) => {
            let relative = path.path().trim_start_matches('/');
            if relative.is_empty() {
                PathBuf::from(home)
            } else {
                Path::new(home).join(relative)
            }
        }
        None => PathBuf::from(path.path()),
    }
}

fn is_missing(e: &ssh2::Error) -> bool {
    matches!(
        e.code(),
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH)
    )
}

impl VfsProvider for SftpProvider {
    fn kind(&mut self, path: &VfsPath) -> Result<EntryKind> {
        match self.sftp.stat(&self.real_path(path)) {
            Ok(stat) if stat.is_dir() => Ok(EntryKind::Folder),
            Ok(_) => Ok(EntryKind::File),
            Err(e) if is_missing(&e) => Ok(EntryKind::Missing),
            Err(e) => Err(self.error(path, e)),
        }
    }

    fn list(&mut self, dir: &VfsPath, filter: Option<&FileNameFilter>) -> Result<Vec<VfsPath>> {
        let entries = self
            .sftp
            .readdir(&self.real_path(dir))
            .map_err(|e| self.error(dir, e))?;

        let mut names: Vec<String> = entries
            .into_iter()
            .filter_map(|(path, _stat)| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .filter(|name| filter.map_or(true, |f| f.matches(name)))
            .collect();
        names.sort();
        Ok(names.iter().map(|name| dir.join(name)).collect())
    }

    fn open_read(&mut self, path: &VfsPath) -> Result<ReadStream> {
        let file = self
            .sftp
            .open(&self.real_path(path))
            .map_err(|e| self.error(path, e))?;
        Ok(Box::new(file))
    }

    fn open_write(&mut self, path: &VfsPath) -> Result<WriteStream> {
        let file = self
            .sftp
            .create(&self.real_path(path))
            .map_err(|e| self.error(path, e))?;
        Ok(Box::new(file))
    }

    fn copy_file(&mut self, src: &VfsPath, dst: &VfsPath) -> Result<()> {
        use std::io::{Read, Write};

        let mut reader = self
            .sftp
            .open(&self.real_path(src))
            .map_err(|e| self.error(src, e))?;
        let mut writer = self
            .sftp
            .create(&self.real_path(dst))
            .map_err(|e| self.error(dst, e))?;

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| FerryError::protocol("sftp", src.uri(), e.to_string()))?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| FerryError::protocol("sftp", dst.uri(), e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| FerryError::protocol("sftp", dst.uri(), e.to_string()))?;
        Ok(())
    }

    fn create_file(&mut self, path: &VfsPath) -> Result<()> {
        self.sftp
            .open_mode(
                &self.real_path(path),
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::EXCLUSIVE,
                0o644,
                OpenType::File,
            )
            .map_err(|e| self.error(path, e))?;
        Ok(())
    }

    fn create_dir_all(&mut self, path: &VfsPath) -> Result<()> {
        let full = self.real_path(path);
        let mut current = PathBuf::new();
        for component in full.components() {
            current.push(component);
            match self.sftp.stat(&current) {
                Ok(stat) => {
                    if !stat.is_dir() {
                        return Err(FerryError::protocol(
                            "sftp",
                            path.uri(),
                            format!("'{}' exists but is not a directory", current.display()),
                        ));
                    }
                }
                Err(_) => {
                    self.sftp
                        .mkdir(&current, 0o755)
                        .map_err(|e| self.error(path, e))?;
                }
            }
        }
        Ok(())
    }

    fn delete(&mut self, path: &VfsPath) -> Result<()> {
        let full = self.real_path(path);
        let is_dir = self
            .sftp
            .stat(&full)
            .map(|stat| stat.is_dir())
            .unwrap_or(false);
        if is_dir {
            self.sftp.rmdir(&full).map_err(|e| self.error(path, e))
        } else {
            self.sftp.unlink(&full).map_err(|e| self.error(path, e))
        }
    }

    fn exists(&mut self, path: &VfsPath) -> Result<bool> {
        match self.sftp.stat(&self.real_path(path)) {
            Ok(_) => Ok(true),
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(self.error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_home_relative_and_absolute() {
        let path = VfsPath::parse("sftp://user@host/upload/in").unwrap();

        let relative = apply_home(Some("/home/user"), &path);
        assert_eq!(relative, PathBuf::from("/home/user/upload/in"));

        let absolute = apply_home(None, &path);
        assert_eq!(absolute, PathBuf::from("/upload/in"));
    }

    #[test]
    fn test_apply_home_root() {
        let path = VfsPath::parse("sftp://user@host/").unwrap();
        assert_eq!(apply_home(Some("/home/user"), &path), PathBuf::from("/home/user"));
    }

    // Connection tests require a reachable SSH server.

    #[test]
    #[ignore]
    fn test_connect() {
        let path = VfsPath::parse("sftp://test@localhost/upload").unwrap();
        let provider = SftpProvider::connect(path.authority(), &BackendConfig::default());
        assert!(provider.is_ok());
    }
}
