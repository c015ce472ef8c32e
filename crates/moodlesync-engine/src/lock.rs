//! Per-calendar run lock.
//!
//! Overlapping runs against the same calendar would race on create versus
//! update for the same title. [`RunLock`] holds an exclusive advisory lock
//! on a PID file named after the calendar for the whole run. The kernel
//! drops the lock when the holder exits, so a file left behind by a dead
//! run is simply reused.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Attempts before giving up on a lock file that keeps being replaced.
const MAX_ATTEMPTS: usize = 3;

/// Lock file guarding one calendar.
///
/// Acquired on [`RunLock::acquire`]; the file is removed and the lock
/// released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    _file: File,
}

impl RunLock {
    /// Acquires the lock for `calendar_name` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] if another run holds the lock.
    pub fn acquire(dir: &Path, calendar_name: &str) -> SyncResult<Self> {
        let path = lock_path(dir, calendar_name);

        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        for _ in 0..MAX_ATTEMPTS {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;

            if !try_lock(&file)? {
                return Err(SyncError::already_running(path.to_string_lossy()));
            }

            // The previous holder unlinks the file before releasing it; a
            // lock taken on that orphaned inode guards nothing.
            if !is_current(&file, &path) {
                debug!(path = %path.display(), "lock file replaced while waiting, retrying");
                continue;
            }

            let mut previous = String::new();
            file.read_to_string(&mut previous)?;
            match previous.trim() {
                "" => {}
                pid if pid.parse::<u32>().is_ok() => {
                    warn!(path = %path.display(), pid, "taking over stale run lock")
                }
                _ => warn!(path = %path.display(), "taking over invalid run lock"),
            }

            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            writeln!(file, "{}", process::id())?;
            file.sync_all()?;
            info!(path = %path.display(), pid = process::id(), "acquired run lock");
            return Ok(Self { path, _file: file });
        }

        Err(SyncError::already_running(path.to_string_lossy()))
    }

    /// Returns the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Unlink while still holding the lock; the handle closes afterwards.
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        } else {
            debug!(path = %self.path.display(), "released run lock");
        }
    }
}

/// Returns the lock file path for a calendar.
///
/// The calendar summary is reduced to lowercase ASCII alphanumerics and
/// dashes so it is safe as a file name, followed by a short digest of the
/// full summary so names differing only outside ASCII stay distinct.
pub fn lock_path(dir: &Path, calendar_name: &str) -> PathBuf {
    let slug: String = calendar_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let digest = Sha256::digest(calendar_name.as_bytes());
    let short: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
    dir.join(format!("moodlesync-{}-{}.lock", slug, short))
}

/// Returns the default lock directory.
///
/// Uses the user runtime directory if available, otherwise
/// `/tmp/moodlesync-$UID`.
pub fn default_lock_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(|| {
        #[cfg(unix)]
        let uid = unsafe { libc::getuid() };
        #[cfg(not(unix))]
        let uid = 0;
        std::env::temp_dir().join(format!("moodlesync-{}", uid))
    })
}

/// Takes an exclusive, non-blocking lock. `Ok(false)` means it is held elsewhere.
#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> io::Result<bool> {
    Ok(true)
}

/// Whether `file` is still the inode linked at `path`.
#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(linked)) => held.dev() == linked.dev() && held.ino() == linked.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_current(_file: &File, path: &Path) -> bool {
    path.exists()
}
