//! Entry backends
//!
//! How a single entry is materialized on disk. The store logic (key
//! escaping, value tagging, sub-tree wipes, enumeration) is shared; a
//! backend only knows how to create, read and atomically replace one
//! entry.
//!
//! - [`SymlinkBackend`]: value is the target of a symbolic link. Creating
//!   and reading are single system calls, so create-if-absent is atomic
//!   by construction.
//! - [`FileBackend`]: value is the content of a regular file, for hosts
//!   without usable symlinks. Create-if-absent hard-links a complete
//!   temporary into place so readers never see a partial file.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crate::codec::TEMP_MARKER;
use crate::util::remove_file_ignoring_missing;

/// Per-process counter making temporary names unique across calls
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Storage primitives for one entry
pub trait Backend: Send + Sync + fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// True if `path` is an entry of this backend's kind
    fn is_entry(&self, path: &Path) -> bool;

    /// Read the stored text; `Ok(None)` if the entry does not exist
    fn read(&self, path: &Path) -> io::Result<Option<String>>;

    /// Create `path` holding `value`, failing with `AlreadyExists` if
    /// the name is taken. Readers must never observe partial content.
    fn create_exclusive(&self, path: &Path, value: &str) -> io::Result<()>;

    /// Write a private temporary that will be renamed into place
    fn write_temporary(&self, path: &Path, value: &str) -> io::Result<()> {
        self.create_exclusive(path, value)
    }

    /// Atomically replace `dst` with `src`
    fn replace(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::rename(src, dst)
    }
}

/// Unique sibling name for a temporary copy of `location`
///
/// `<entry>~<pid>-<thread>-<seq>`; the marker can never appear in an
/// escaped key, so enumeration skips these.
pub(crate) fn temporary_path(location: &Path) -> PathBuf {
    let thread_id: String = format!("{:?}", thread::current().id())
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);

    let mut name = location.as_os_str().to_owned();
    name.push(format!("{}{}-{}-{}", TEMP_MARKER, process::id(), thread_id, seq));
    PathBuf::from(name)
}

fn invalid_data(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}: stored value is not valid UTF-8", path.display()),
    )
}

// =============================================================================
// Symlink Backend
// =============================================================================

/// Entries are symbolic links whose target is the encoded value
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SymlinkBackend;

#[cfg(unix)]
impl SymlinkBackend {
    /// Check whether symlinks can be created in `dir`
    pub fn supported_in(dir: &Path) -> bool {
        let probe = temporary_path(&dir.join("probe"));
        match std::os::unix::fs::symlink("probe", &probe) {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&probe) {
                    tracing::warn!("{}: cannot remove symlink probe: {}", probe.display(), e);
                }
                true
            }
            Err(e) => {
                tracing::debug!("{}: symlinks not supported: {}", dir.display(), e);
                false
            }
        }
    }
}

#[cfg(unix)]
impl Backend for SymlinkBackend {
    fn name(&self) -> &'static str {
        "symlink"
    }

    fn is_entry(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn read(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read_link(path) {
            Ok(target) => target
                .into_os_string()
                .into_string()
                .map(Some)
                .map_err(|_| invalid_data(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_exclusive(&self, path: &Path, value: &str) -> io::Result<()> {
        std::os::unix::fs::symlink(value, path)
    }
}

// =============================================================================
// File Backend
// =============================================================================

/// Entries are regular files whose content is the encoded value
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBackend;

impl Backend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn is_entry(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|meta| meta.file_type().is_file())
            .unwrap_or(false)
    }

    fn read(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read(path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| invalid_data(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_exclusive(&self, path: &Path, value: &str) -> io::Result<()> {
        // Stage the full content, then link(2) it in: the link either
        // appears complete or fails with AlreadyExists.
        let staged = temporary_path(path);
        self.write_temporary(&staged, value)?;
        let linked = fs::hard_link(&staged, path);
        if let Err(e) = remove_file_ignoring_missing(&staged) {
            tracing::warn!("{}: cannot remove staged file: {}", staged.display(), e);
        }
        linked
    }

    fn write_temporary(&self, path: &Path, value: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()
    }
}
