//! Transfer strategies
//!
//! Bytes move one of two ways. The atomic strategy asks the backend to copy
//! the whole file in a single call, which the retry policy can safely
//! re-run. The streamed strategy pulls the content through the engine in
//! fixed-size blocks; it is never retried, because a failure part-way
//! leaves a partial destination write that is not cleaned up, and replaying
//! the file against it would not be idempotent. Streaming trades that
//! weaker failure atomicity for bounded memory on backends whose one-call
//! copy buffers entire files.

use std::io::{Read, Write};

use tracing::debug;

use super::retry::{with_retry, RetryPolicy};
use crate::config::TransferOptions;
use crate::error::{FerryError, Result};
use crate::vfs::{Vfs, VfsPath};

/// How file content travels from source to destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStrategy {
    /// One backend-level copy call per file, retried on transient failures
    Atomic,
    /// Manual block-by-block copy through explicit read/write streams
    Streamed {
        /// Bytes read and written per block
        block_size: usize,
    },
}

impl TransferStrategy {
    /// Pick the strategy an options snapshot asks for
    pub fn from_options(options: &TransferOptions) -> Self {
        if options.streaming_transfer {
            Self::Streamed {
                block_size: options.effective_block_size(),
            }
        } else {
            Self::Atomic
        }
    }

    /// Copy one file from `src` to `dst`
    ///
    /// The atomic variant runs under the retry policy; the streamed variant
    /// makes a single pass and surfaces any failure, including stream
    /// opens, as [`FerryError::Streaming`].
    pub fn transfer(
        &self,
        vfs: &Vfs,
        src: &VfsPath,
        dst: &VfsPath,
        policy: &RetryPolicy,
    ) -> Result<()> {
        match self {
            Self::Atomic => with_retry(policy, || vfs.copy_file(src, dst)),
            Self::Streamed { block_size } => streamed_copy(vfs, src, dst, *block_size),
        }
    }
}

/// Block-by-block copy over explicit streams
///
/// Reads until end-of-stream, writes every block, then flushes the
/// destination so backends that commit on flush finalize the upload. The
/// streams close on drop whatever the outcome.
fn streamed_copy(vfs: &Vfs, src: &VfsPath, dst: &VfsPath, block_size: usize) -> Result<()> {
    debug!("streaming {} to {} in {} byte blocks", src, dst, block_size);

    let mut reader = vfs
        .open_read(src)
        .map_err(|e| FerryError::streaming(dst.uri(), e))?;
    let mut writer = vfs
        .open_write(dst)
        .map_err(|e| FerryError::streaming(dst.uri(), e))?;

    let mut block = vec![0u8; block_size];
    loop {
        let read = reader
            .read(&mut block)
            .map_err(|e| FerryError::streaming(dst.uri(), FerryError::io(src.uri(), e)))?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&block[..read])
            .map_err(|e| FerryError::streaming(dst.uri(), FerryError::io(dst.uri(), e)))?;
    }
    writer
        .flush()
        .map_err(|e| FerryError::streaming(dst.uri(), FerryError::io(dst.uri(), e)))?;
    Ok(())
}
