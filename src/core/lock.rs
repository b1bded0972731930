//! Advisory lock files
//!
//! Independent invocations racing to write the same target directory
//! coordinate through marker files: before writing `a.txt`, an engine
//! creates `a.txt.lock` beside it and deletes it when done. A marker that
//! already exists means another writer is active and the transfer must not
//! proceed. The protection is a convention backed by the backend's
//! create-if-absent atomicity, not an OS-level lock.

use tracing::debug;

use super::retry::{with_retry, RetryPolicy};
use crate::error::{FerryError, Result};
use crate::vfs::{Vfs, VfsPath};

/// Suffix appended to a target path to form its lock-file path
pub const LOCK_FILE_SUFFIX: &str = ".lock";

/// Handle to a held advisory lock
#[derive(Debug)]
#[must_use = "dropping a guard without releasing it leaves the marker file behind"]
pub struct LockGuard {
    path: VfsPath,
}

impl LockGuard {
    /// Path of the marker file this guard owns
    pub fn path(&self) -> &VfsPath {
        &self.path
    }
}

/// Creates and deletes advisory ".lock" markers around transfers
pub struct LockCoordinator {
    vfs: Vfs,
    policy: RetryPolicy,
}

impl LockCoordinator {
    /// Create a coordinator issuing locks through the given router
    pub fn new(vfs: Vfs, policy: RetryPolicy) -> Self {
        Self { vfs, policy }
    }

    /// Acquire the lock for a target path
    ///
    /// An existing marker is a concurrent writer: a definitive
    /// [`FerryError::LockConflict`], checked once and never retried.
    /// Creating the marker goes through the retry policy like any other
    /// backend mutation.
    pub fn acquire(&self, target: &VfsPath) -> Result<LockGuard> {
        let path = target.with_appended(LOCK_FILE_SUFFIX);
        debug!("creating lock file {}", path);
        if self.vfs.exists(&path)? {
            return Err(FerryError::lock_conflict(path.uri()));
        }
        with_retry(&self.policy, || self.vfs.create_file(&path))?;
        Ok(LockGuard { path })
    }

    /// Release a held lock by deleting its marker file
    pub fn release(&self, guard: LockGuard) -> Result<()> {
        debug!("deleting lock file {}", guard.path);
        with_retry(&self.policy, || self.vfs.delete(&guard.path))
    }

    /// Run a transfer step with the target locked
    ///
    /// With locking disabled this is just `op()`. Otherwise the marker is
    /// created first and deleted on every exit path, before any error
    /// leaves this function; when the operation and the release both fail,
    /// the operation's error wins.
    pub fn with_lock<T>(
        &self,
        enabled: bool,
        target: &VfsPath,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        if !enabled {
            return op();
        }
        let guard = self.acquire(target)?;
        let outcome = op();
        let released = self.release(guard);
        match outcome {
            Ok(value) => released.map(|()| value),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::EntryKind;

    fn ram_target() -> (Vfs, VfsPath) {
        let vfs = Vfs::default();
        let target = vfs.resolve("ram:///out/a.txt").unwrap();
        vfs.create_dir_all(&target.parent().unwrap()).unwrap();
        (vfs, target)
    }

    #[test]
    fn test_acquire_creates_marker_release_removes_it() {
        let (vfs, target) = ram_target();
        let locks = LockCoordinator::new(vfs.clone(), RetryPolicy::none());

        let guard = locks.acquire(&target).unwrap();
        assert_eq!(guard.path().path(), "/out/a.txt.lock");
        assert_eq!(vfs.kind(guard.path()).unwrap(), EntryKind::File);

        let marker = guard.path().clone();
        locks.release(guard).unwrap();
        assert_eq!(vfs.kind(&marker).unwrap(), EntryKind::Missing);
    }

    #[test]
    fn test_existing_marker_is_a_definitive_conflict() {
        let (vfs, target) = ram_target();
        let locks = LockCoordinator::new(vfs.clone(), RetryPolicy::new(3, 0));

        let marker = target.with_appended(LOCK_FILE_SUFFIX);
        vfs.create_file(&marker).unwrap();

        let err = locks.acquire(&target).unwrap_err();
        assert!(matches!(err, FerryError::LockConflict(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_with_lock_releases_on_success() {
        let (vfs, target) = ram_target();
        let locks = LockCoordinator::new(vfs.clone(), RetryPolicy::none());
        let marker = target.with_appended(LOCK_FILE_SUFFIX);

        let held_during = locks
            .with_lock(true, &target, || vfs.kind(&marker))
            .unwrap();
        assert_eq!(held_during, EntryKind::File);
        assert_eq!(vfs.kind(&marker).unwrap(), EntryKind::Missing);
    }

    #[test]
    fn test_with_lock_releases_on_failure_and_keeps_the_op_error() {
        let (vfs, target) = ram_target();
        let locks = LockCoordinator::new(vfs.clone(), RetryPolicy::none());
        let marker = target.with_appended(LOCK_FILE_SUFFIX);

        let err = locks
            .with_lock(true, &target, || -> Result<()> {
                Err(FerryError::config("boom"))
            })
            .unwrap_err();
        assert!(matches!(err, FerryError::Config(_)));
        assert_eq!(vfs.kind(&marker).unwrap(), EntryKind::Missing);
    }

    #[test]
    fn test_with_lock_disabled_creates_no_marker() {
        let (vfs, target) = ram_target();
        let locks = LockCoordinator::new(vfs.clone(), RetryPolicy::none());
        let marker = target.with_appended(LOCK_FILE_SUFFIX);

        locks
            .with_lock(false, &target, || {
                assert_eq!(vfs.kind(&marker).unwrap(), EntryKind::Missing);
                Ok(())
            })
            .unwrap();
        assert_eq!(vfs.kind(&marker).unwrap(), EntryKind::Missing);
    }
}
