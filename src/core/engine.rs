//! Batch transfer engine
//!
//! One engine performs one fully-configured unit of work: validate the
//! directories, list the matching source files, and for each file run the
//! optional archive copy followed by the primary copy or move. Copy and
//! move share the whole pipeline; they differ in a single branch that
//! deletes the source after a successful move. The first unrecovered error
//! aborts the remaining batch — files already transferred stay where they
//! landed.

use tracing::debug;

use super::lock::LockCoordinator;
use super::naming::decorated_file_name;
use super::retry::{with_retry, RetryPolicy};
use super::strategy::TransferStrategy;
use crate::config::TransferOptions;
use crate::error::{FerryError, Result};
use crate::vfs::{EntryKind, FileNameFilter, Vfs, VfsPath};

/// The one point where copying and moving diverge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Copy,
    Move,
}

/// Batch transfer engine over the virtual filesystem
///
/// Construction validates the options snapshot and compiles the file
/// pattern, so misconfiguration surfaces before any backend is contacted.
/// The engine holds no state beyond its options and the provider cache; it
/// is built fresh per invocation and discarded afterwards.
pub struct TransferEngine {
    options: TransferOptions,
    filter: Option<FileNameFilter>,
    strategy: TransferStrategy,
    policy: RetryPolicy,
    locks: LockCoordinator,
    vfs: Vfs,
}

impl TransferEngine {
    /// Create an engine, building backend providers from the options
    pub fn new(options: TransferOptions) -> Result<Self> {
        let vfs = Vfs::from_options(&options);
        Self::with_vfs(options, vfs)
    }

    /// Create an engine on an existing router
    ///
    /// The seam for callers that preload or replace providers — tests mount
    /// seeded and fault-injecting backends here.
    pub fn with_vfs(options: TransferOptions, vfs: Vfs) -> Result<Self> {
        options.validate()?;
        let filter = options
            .file_pattern
            .as_deref()
            .map(FileNameFilter::new)
            .transpose()?;
        let strategy = TransferStrategy::from_options(&options);
        let policy = RetryPolicy::new(options.retry_count, options.retry_wait_ms);
        let locks = LockCoordinator::new(vfs.clone(), policy);
        Ok(Self {
            options,
            filter,
            strategy,
            policy,
            locks,
            vfs,
        })
    }

    /// Copy every matching source file into the target directory
    ///
    /// Returns the number of plain files copied. Directory entries and
    /// names the pattern rejects are not copied and not counted.
    pub fn copy_files(&self) -> Result<usize> {
        self.run(OperationKind::Copy)
    }

    /// Move every matching source file into the target directory
    ///
    /// A move is a copy followed by deletion of the source file. The
    /// deletion is not retried; when it fails, the batch aborts with the
    /// file present at both ends.
    pub fn move_files(&self) -> Result<usize> {
        self.run(OperationKind::Move)
    }

    fn run(&self, kind: OperationKind) -> Result<usize> {
        debug!(
            "starting {:?}: {} -> {}",
            kind, self.options.source_directory, self.options.target_directory
        );

        let target_dir = self.prepare_directory(&self.options.target_directory)?;
        let archive_dir = match self.options.archive_directory.as_deref() {
            Some(uri) => {
                let dir = self.prepare_directory(uri)?;
                debug!("archiving into {}", dir);
                Some(dir)
            }
            None => None,
        };

        let entries = self.list_source_files()?;
        debug!("{} entries in source directory", entries.len());

        let mut processed = 0;
        for (index, entry) in entries.iter().enumerate() {
            debug!("processing entry #{}: {}", index + 1, entry);
            if self.vfs.kind(entry)? != EntryKind::File {
                debug!("skipping {}: not a plain file", entry);
                continue;
            }
            // Archive first; its failure stops the batch before the
            // primary operation touches this file.
            if let Some(archive_dir) = &archive_dir {
                self.transfer_one(
                    entry,
                    archive_dir,
                    &self.options.archive_file_prefix,
                    &self.options.archive_file_suffix,
                    OperationKind::Copy,
                )?;
            }
            self.transfer_one(
                entry,
                &target_dir,
                &self.options.target_file_prefix,
                &self.options.target_file_suffix,
                kind,
            )?;
            processed += 1;
        }

        debug!("{:?} finished, {} files processed", kind, processed);
        Ok(processed)
    }

    /// Resolve a destination directory before the batch starts
    ///
    /// Resolution runs under the retry policy; it is also where remote
    /// endpoints are dialed. With `create_missing_directories` the
    /// directory is created (attempted once, not retried); without it,
    /// anything that is not a folder fails as `NotADirectory`.
    fn prepare_directory(&self, uri: &str) -> Result<VfsPath> {
        let dir = with_retry(&self.policy, || self.vfs.resolve(uri))?;
        if self.options.create_missing_directories {
            self.vfs.create_dir_all(&dir)?;
        } else if self.vfs.kind(&dir)? != EntryKind::Folder {
            return Err(FerryError::not_a_directory(dir.uri()));
        }
        Ok(dir)
    }

    /// List the transfer candidates, applying the name filter
    ///
    /// The source directory is never created for the caller; a missing or
    /// non-folder source fails the batch.
    fn list_source_files(&self) -> Result<Vec<VfsPath>> {
        let dir = with_retry(&self.policy, || {
            self.vfs.resolve(&self.options.source_directory)
        })?;
        if self.vfs.kind(&dir)? != EntryKind::Folder {
            return Err(FerryError::not_a_directory(dir.uri()));
        }
        with_retry(&self.policy, || self.vfs.list(&dir, self.filter.as_ref()))
    }

    /// Transfer one file into one destination directory
    ///
    /// The destination name applies the prefix/suffix pair and the lock,
    /// when enabled, guards that decorated path. For a move the source is
    /// deleted after a successful copy, before the lock is released.
    fn transfer_one(
        &self,
        src: &VfsPath,
        dir: &VfsPath,
        prefix: &str,
        suffix: &str,
        kind: OperationKind,
    ) -> Result<()> {
        let name = decorated_file_name(src.base_name(), prefix, suffix);
        let dst = dir.join(&name);
        debug!("transferring {} to {}", src, dst);

        self.locks.with_lock(self.options.lock_enabled, &dst, || {
            self.strategy.transfer(&self.vfs, src, &dst, &self.policy)?;
            if kind == OperationKind::Move {
                self.vfs.delete(src)?;
            }
            Ok(())
        })
    }
}
