//! FTP provider
//!
//! Adapts the suppaftp crate to the provider interface. One provider holds
//! one logged-in control connection. FTP has no stat call, so entry kinds
//! come from parsing a LIST of the containing directory; and it cannot
//! express create-if-absent, so `create_file` is a plain store and the
//! caller's exists pre-check is the only conflict guard.

use std::io::{Cursor, Error as IoError, ErrorKind, Write};
use std::sync::{Arc, Mutex};

use suppaftp::list;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode, Status};

use super::path::{Authority, VfsPath};
use super::provider::{EntryKind, FileNameFilter, ReadStream, VfsProvider, WriteStream};
use super::BackendConfig;
use crate::error::{FerryError, Result};

/// Provider for `ftp://` paths
pub struct FtpProvider {
    stream: Arc<Mutex<FtpStream>>,
}

impl FtpProvider {
    /// Connect and log in to an FTP endpoint
    pub fn connect(authority: &Authority, config: &BackendConfig) -> Result<Self> {
        let endpoint = authority.endpoint(21);
        let mut stream = FtpStream::connect(&endpoint)
            .map_err(|e| FerryError::connection(&endpoint, e.to_string()))?;

        let user = authority.user.as_deref().unwrap_or("anonymous");
        let password = authority.password.as_deref().unwrap_or("");
        stream
            .login(user, password)
            .map_err(|e| FerryError::auth(user, &authority.host, e.to_string()))?;

        stream.set_mode(if config.ftp_passive_mode {
            Mode::Passive
        } else {
            Mode::Active
        });
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| FerryError::connection(&endpoint, e.to_string()))?;

        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
        })
    }

    fn list_names(&self, dir: &VfsPath) -> Result<Vec<list::File>> {
        let mut ftp = self.stream.lock().unwrap();
        let lines = ftp
            .list(Some(dir.path()))
            .map_err(|e| ftp_error(dir, e))?;
        Ok(lines
            .iter()
            .filter_map(|line| list::File::try_from(line.as_str()).ok())
            .filter(|entry| entry.name() != "." && entry.name() != "..")
            .collect())
    }
}

fn ftp_error(path: &VfsPath, e: FtpError) -> FerryError {
    FerryError::protocol("ftp", path.uri(), e.to_string())
}

fn is_unavailable(e: &FtpError) -> bool {
    matches!(e, FtpError::UnexpectedResponse(response) if response.status == Status::FileUnavailable)
}

impl VfsProvider for FtpProvider {
    fn kind(&mut self, path: &VfsPath) -> Result<EntryKind> {
        let parent = match path.parent() {
            Some(parent) => parent,
            // The account root always exists
            None => return Ok(EntryKind::Folder),
        };
        let entries = {
            let mut ftp = self.stream.lock().unwrap();
            match ftp.list(Some(parent.path())) {
                Ok(lines) => lines,
                Err(e) if is_unavailable(&e) => return Ok(EntryKind::Missing),
                Err(e) => return Err(ftp_error(path, e)),
            }
        };
        let name = path.base_name();
        for line in &entries {
            if let Ok(entry) = list::File::try_from(line.as_str()) {
                if entry.name() == name {
                    return Ok(if entry.is_directory() {
                        EntryKind::Folder
                    } else {
                        EntryKind::File
                    });
                }
            }
        }
        Ok(EntryKind::Missing)
    }

    fn list(&mut self, dir: &VfsPath, filter: Option<&FileNameFilter>) -> Result<Vec<VfsPath>> {
        let mut names: Vec<String> = self
            .list_names(dir)?
            .into_iter()
            .map(|entry| entry.name().to_string())
            .filter(|name| filter.map_or(true, |f| f.matches(name)))
            .collect();
        names.sort();
        Ok(names.iter().map(|name| dir.join(name)).collect())
    }

    fn open_read(&mut self, path: &VfsPath) -> Result<ReadStream> {
        let mut ftp = self.stream.lock().unwrap();
        let buffer = ftp
            .retr_as_buffer(path.path())
            .map_err(|e| ftp_error(path, e))?;
        Ok(Box::new(buffer))
    }

    fn open_write(&mut self, path: &VfsPath) -> Result<WriteStream> {
        Ok(Box::new(FtpWriter {
            stream: self.stream.clone(),
            path: path.path().to_string(),
            buf: Vec::new(),
            uploaded: false,
        }))
    }

    fn copy_file(&mut self, src: &VfsPath, dst: &VfsPath) -> Result<()> {
        let mut ftp = self.stream.lock().unwrap();
        let mut content = ftp
            .retr_as_buffer(src.path())
            .map_err(|e| ftp_error(src, e))?;
        ftp.put_file(dst.path(), &mut content)
            .map_err(|e| ftp_error(dst, e))?;
        Ok(())
    }

    fn create_file(&mut self, path: &VfsPath) -> Result<()> {
        let mut ftp = self.stream.lock().unwrap();
        ftp.put_file(path.path(), &mut std::io::empty())
            .map_err(|e| ftp_error(path, e))?;
        Ok(())
    }

    fn create_dir_all(&mut self, path: &VfsPath) -> Result<()> {
        {
            let mut ftp = self.stream.lock().unwrap();
            let mut current = String::new();
            for segment in path.path().split('/').filter(|s| !s.is_empty()) {
                current.push('/');
                current.push_str(segment);
                // Already-existing levels answer with an error; ignored here
                let _ = ftp.mkdir(&current);
            }
        }
        match self.kind(path)? {
            EntryKind::Folder => Ok(()),
            _ => Err(FerryError::protocol(
                "ftp",
                path.uri(),
                "could not create directory",
            )),
        }
    }

    fn delete(&mut self, path: &VfsPath) -> Result<()> {
        let mut ftp = self.stream.lock().unwrap();
        match ftp.rm(path.path()) {
            Ok(()) => Ok(()),
            Err(first) => match ftp.rmdir(path.path()) {
                Ok(()) => Ok(()),
                Err(_) => Err(ftp_error(path, first)),
            },
        }
    }
}

impl Drop for FtpProvider {
    fn drop(&mut self) {
        if let Ok(mut ftp) = self.stream.lock() {
            let _ = ftp.quit();
        }
    }
}

/// Writer that stores its buffer on the server at flush time
///
/// Contents reach the server only on a successful flush; a writer dropped
/// without one sends nothing.
struct FtpWriter {
    stream: Arc<Mutex<FtpStream>>,
    path: String,
    buf: Vec<u8>,
    uploaded: bool,
}

impl Write for FtpWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.uploaded = false;
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.uploaded {
            return Ok(());
        }
        let mut ftp = self.stream.lock().unwrap();
        let mut cursor = Cursor::new(self.buf.as_slice());
        ftp.put_file(&self.path, &mut cursor)
            .map_err(|e| IoError::new(ErrorKind::Other, e.to_string()))?;
        self.uploaded = true;
        Ok(())
    }
}
