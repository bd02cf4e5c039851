//! Free-space probing for the install target.
//!
//! The install directory usually does not exist before the first run, so the
//! probe resolves the filesystem by longest mount-point prefix instead of
//! stat'ing the target itself.

use crate::error::HostError;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

pub fn gib_to_bytes(gib: u64) -> u64 {
    gib.saturating_mul(BYTES_PER_GIB)
}

/// Pick the mount point that contains `path`.
///
/// Returns the index into `mounts` of the longest mount point that is a
/// component-wise prefix of `path`.
pub fn mount_for_path(path: &Path, mounts: &[PathBuf]) -> Option<usize> {
    mounts
        .iter()
        .enumerate()
        .filter(|(_, mount)| path.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(idx, _)| idx)
}

/// Nearest ancestor of `path` that exists, canonicalized so symlinked
/// directories are attributed to the right filesystem.
fn existing_ancestor(path: &Path) -> PathBuf {
    let mut current = path;
    loop {
        if let Ok(canonical) = current.canonicalize() {
            return canonical;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return PathBuf::from("/"),
        }
    }
}

/// Bytes available to unprivileged writers on the filesystem holding `path`.
pub fn free_space_bytes(path: &Path) -> Result<u64, HostError> {
    let target = existing_ancestor(path);
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<PathBuf> = disks
        .list()
        .iter()
        .map(|d| d.mount_point().to_path_buf())
        .collect();

    let idx = mount_for_path(&target, &mounts)
        .ok_or_else(|| HostError::DiskProbeFailed(target.display().to_string()))?;
    let available = disks.list()[idx].available_space();

    log::debug!(
        "[Host] [DISK] {} resolves to mount {} with {} bytes free",
        path.display(),
        mounts[idx].display(),
        available
    );
    Ok(available)
}
