//! Backup and atomic-replace helpers for host configuration files.

use chrono::Local;
use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Copy `path` aside as `<path>.bak.<YYYYmmddHHMMSS>` if it exists.
///
/// Backups are never overwritten: a second backup in the same second gets a
/// numeric suffix.
pub fn backup_if_exists(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
    let base = format!("{}.bak.{}", path.display(), stamp);
    let mut candidate = PathBuf::from(&base);
    let mut n = 1u32;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}.{}", base, n));
        n += 1;
    }

    fs::copy(path, &candidate)?;
    log::info!("[Files] [BACKUP] {} -> {}", path.display(), candidate.display());
    Ok(Some(candidate))
}

/// List the backups `backup_if_exists` has produced for `path`, oldest name first.
pub fn list_backups(path: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let prefix = match path.file_name() {
        Some(name) => format!("{}.bak.", name.to_string_lossy()),
        None => return Ok(Vec::new()),
    };

    let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.path())
        .collect();
    backups.sort();
    Ok(backups)
}

/// Write `contents` into a hidden temporary file next to `target` with `mode`.
///
/// The staged file is removed when dropped unless persisted.
pub fn stage_beside(target: &Path, contents: &[u8], mode: u32) -> io::Result<NamedTempFile> {
    let dir = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;
    fs::create_dir_all(dir)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged
        .as_file()
        .set_permissions(Permissions::from_mode(mode))?;
    Ok(staged)
}

/// Replace `target` atomically with `contents`.
pub fn write_atomic(target: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let staged = stage_beside(target, contents, mode)?;
    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}
