//! Path and ID helpers
//!
//! Small filesystem utilities shared by the store and its callers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use data_encoding::BASE32;
use sha2::{Digest, Sha512};

use crate::error::{FlatKvError, Result};

/// Default length of identifiers produced by [`derive_id`]
pub const DEFAULT_ID_LEN: usize = 10;

/// Prefix of per-user store directories inside a state directory
pub const USER_DIR_PREFIX: &str = "_user_";

/// Create a directory tree, tolerating someone else creating it first
///
/// `mode` is applied only when this call created the directory. If
/// creation fails, the path is accepted as long as it is a writable
/// directory; anything else is `DirectoryUnavailable`.
pub fn ensure_directory(path: &Path, mode: Option<u32>) -> Result<()> {
    let existed = path.is_dir();

    if let Err(e) = fs::create_dir_all(path) {
        if !path.is_dir() {
            return Err(FlatKvError::DirectoryUnavailable {
                path: path.to_path_buf(),
                reason: format!("not a directory: {}", e),
            });
        }
        tracing::trace!("{}: lost creation race: {}", path.display(), e);
    } else if !existed {
        if let Some(mode) = mode {
            set_mode(path, mode)?;
        }
        tracing::debug!("{}: directory created", path.display());
    }

    if !access_ok(path, false, true, false) {
        return Err(FlatKvError::DirectoryUnavailable {
            path: path.to_path_buf(),
            reason: "does not allow writes".to_string(),
        });
    }

    Ok(())
}

/// Remove a file; a missing file is not an error
pub fn remove_file_ignoring_missing(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Derive a short stable identifier from arbitrary data
///
/// SHA-512 of the input, base32 encoded, lower-cased and truncated to
/// `length` characters.
pub fn derive_id(input: impl AsRef<[u8]>, length: usize) -> String {
    let digest = Sha512::digest(input.as_ref());
    let mut id = BASE32.encode(&digest);
    id.truncate(length);
    id.make_ascii_lowercase();
    id
}

/// Directory holding the private store of `user_id` under `state_dir`
pub fn user_store_dir(state_dir: &Path, user_id: &str) -> PathBuf {
    state_dir.join(format!("{}{}", USER_DIR_PREFIX, derive_id(user_id, DEFAULT_ID_LEN)))
}

// =============================================================================
// Permission Helpers
// =============================================================================

/// Check access(2) permissions for the running process
#[cfg(unix)]
pub(crate) fn access_ok(path: &Path, read: bool, write: bool, exec: bool) -> bool {
    use nix::unistd::{access, AccessFlags};

    let mut flags = AccessFlags::F_OK;
    if read {
        flags |= AccessFlags::R_OK;
    }
    if write {
        flags |= AccessFlags::W_OK;
    }
    if exec {
        flags |= AccessFlags::X_OK;
    }
    access(path, flags).is_ok()
}

#[cfg(not(unix))]
pub(crate) fn access_ok(path: &Path, _read: bool, write: bool, _exec: bool) -> bool {
    match fs::metadata(path) {
        Ok(meta) => !(write && meta.permissions().readonly()),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
