//! Virtual filesystem layer
//!
//! Presents local disk, FTP, SFTP and an in-memory store behind one
//! provider interface, addressed by URI:
//!
//! | Scheme    | Backend        | Provider crate |
//! |-----------|----------------|----------------|
//! | (none), `file://` | local disk | std |
//! | `ftp://`  | FTP server     | suppaftp |
//! | `sftp://` | SSH/SFTP server | ssh2 |
//! | `ram://`  | in-memory map  | std |
//!
//! The [`Vfs`] router owns the providers, connecting to remote endpoints
//! lazily and caching one provider per endpoint. The transfer engine only
//! ever talks to the router.

mod ftp;
mod local;
mod memory;
mod path;
mod provider;
mod router;
mod sftp;

pub use ftp::*;
pub use local::*;
pub use memory::*;
pub use path::*;
pub use provider::*;
pub use router::*;
pub use sftp::*;
