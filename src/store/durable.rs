//! Crash-safe file replacement.
//!
//! # Write Sequence
//! 1. Write bytes to `.{filename}.{pid}.{nanos}.tmp` in the target's directory
//! 2. `fsync` the temporary file
//! 3. Rename it over the target (atomic on the same filesystem)
//! 4. `fsync` the directory so the rename itself is durable
//!
//! A failure before step 3 removes the temporary file and leaves the target
//! untouched.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::error::StoreError;

/// Writes whole files durably. Remembers whether the host supports
/// directory fsync so the fallback warning is logged once.
#[derive(Debug)]
pub struct DurableWriter {
    dir_sync_supported: AtomicBool,
}

impl Default for DurableWriter {
    fn default() -> Self {
        Self {
            dir_sync_supported: AtomicBool::new(true),
        }
    }
}

impl DurableWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `target` with `bytes`.
    pub fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let dir = parent_dir(target);
        let tmp = temp_path_for(target);

        if let Err(err) = write_and_rename(&tmp, target, bytes) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(err);
        }

        self.sync_directory(&dir)
    }

    /// Whether directory fsync is still attempted.
    pub fn dir_sync_supported(&self) -> bool {
        self.dir_sync_supported.load(Ordering::Relaxed)
    }

    fn sync_directory(&self, dir: &Path) -> Result<(), StoreError> {
        if !self.dir_sync_supported() {
            return Ok(());
        }

        let result = File::open(dir).and_then(|handle| handle.sync_all());
        match result {
            Ok(()) => Ok(()),
            Err(err) if dir_sync_unsupported(&err) => {
                self.disable_dir_sync(dir, &err);
                Ok(())
            }
            Err(err) => Err(StoreError::io("fsync directory", dir, err)),
        }
    }

    fn disable_dir_sync(&self, dir: &Path, err: &io::Error) {
        if self.dir_sync_supported.swap(false, Ordering::Relaxed) {
            tracing::warn!(
                dir = %dir.display(),
                error = %err,
                "Directory fsync unsupported on this host; continuing without it"
            );
        }
    }
}

fn write_and_rename(tmp: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp)
        .map_err(|e| StoreError::io("create", tmp, e))?;
    file.write_all(bytes)
        .map_err(|e| StoreError::io("write", tmp, e))?;
    file.sync_all()
        .map_err(|e| StoreError::io("fsync", tmp, e))?;
    drop(file);

    fs::rename(tmp, target).map_err(|e| StoreError::io("rename", target, e))
}

/// Error kinds that mean "this filesystem or platform cannot fsync a
/// directory", as opposed to a real I/O failure.
pub(crate) fn dir_sync_unsupported(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied | io::ErrorKind::InvalidInput
    )
}

/// `.{filename}.{pid}.{nanos}.tmp` next to `target`.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    parent_dir(target).join(format!(".{}.{}.{}.tmp", file_name, std::process::id(), nanos))
}

pub(crate) fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
