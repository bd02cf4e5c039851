//! Single-run exclusion via an advisory `flock`.

use crate::error::ProvisionError;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Exclusive lock held for the lifetime of a run.
///
/// The kernel drops the lock when the descriptor closes, so a crashed run
/// never leaves a stale lock behind.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    _file: File,
}

impl RunLock {
    /// Take the lock for `tool` under `lock_dir`, failing fast if it is held.
    pub fn acquire(lock_dir: &Path, tool: &str) -> Result<Self, ProvisionError> {
        fs::create_dir_all(lock_dir)?;
        let path = lock_dir.join(format!("{}.lock", tool));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        // SAFETY: the descriptor is owned by `file` and stays open for the call
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Err(ProvisionError::LockHeld(path));
            }
            return Err(ProvisionError::Io(err));
        }

        log::debug!("[Lock] Acquired {}", path.display());
        Ok(RunLock { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
