//! Flat store
//!
//! One directory, one entry per key, no locks.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::codec::{
    decode_key, decode_value, encode_key, encode_value, is_canonical_name, is_temporary_name, Value,
    MAX_NAME_LEN,
};
use crate::config::{BackendKind, Config};
use crate::error::{FlatKvError, Result};
use crate::project::{project_sorted, NestedMap};
use crate::util::{access_ok, ensure_directory, remove_file_ignoring_missing, user_store_dir};

use super::backend::{temporary_path, Backend, FileBackend};
#[cfg(unix)]
use super::backend::SymlinkBackend;
use super::pattern::{compile_pattern, subtree_pattern, KeyFilter};

/// Key recorded in every per-user store
const USER_ID_KEY: &str = "userid";

/// Handle to a database directory
///
/// ## Concurrency:
/// - Holds no mutable state; all methods take `&self`
/// - Safe to share across threads and to open the same directory from
///   several processes at once
/// - Every call goes to the filesystem (no caching)
#[derive(Debug)]
pub struct FlatStore {
    /// Database directory
    location: PathBuf,

    /// How entries are materialized
    backend: Box<dyn Backend>,
}

impl FlatStore {
    /// Open a database directory with the given config
    ///
    /// On open:
    /// 1. Create the directory if configured to
    /// 2. Check it is a directory we can read, write and search
    /// 3. Pick the backend (probing for symlink support if `Auto`)
    /// 4. Reap stale temporaries if configured to
    pub fn open(config: Config) -> Result<Self> {
        let location = config.db_dir;

        if config.create_if_missing {
            ensure_directory(&location, config.dir_mode)?;
        }
        Self::validate_location(&location)?;

        let backend = Self::select_backend(config.backend, &location)?;
        tracing::debug!("{}: opened with {} backend", location.display(), backend.name());

        let store = Self { location, backend };

        if let Some(age) = config.reap_temporaries_older_than {
            store.reap_temporaries(age)?;
        }

        Ok(store)
    }

    /// Open an existing directory with the default config
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().db_dir(path).build())
    }

    /// Open the private store of `user_id` under `state_dir`
    ///
    /// With `create`, a missing store is bootstrapped; without it, a
    /// missing store is `InvalidDatabase`. The user id is recorded under
    /// the `userid` key.
    pub fn open_user(state_dir: &Path, user_id: &str, create: bool) -> Result<Self> {
        Self::open_user_with(state_dir, user_id, create, BackendKind::Auto)
    }

    /// Like [`FlatStore::open_user`], with an explicit backend choice
    pub fn open_user_with(
        state_dir: &Path,
        user_id: &str,
        create: bool,
        backend: BackendKind,
    ) -> Result<Self> {
        let location = user_store_dir(state_dir, user_id);

        if create && !location.is_dir() {
            // Clear whatever non-directory may sit at that name
            remove_file_ignoring_missing(&location)?;
            ensure_directory(&location, None)?;
        }

        let store = Self::open(Config::builder().db_dir(location).backend(backend).build())?;
        store.set(USER_ID_KEY, Some(Value::from(user_id)), true)?;
        Ok(store)
    }

    // =========================================================================
    // Core Operations
    // =========================================================================

    /// Set `key` to `value`, or remove it (and its sub-tree) with `None`
    ///
    /// Returns `false` only when `force` is off and the key already
    /// exists; removal always returns `true`.
    pub fn set(&self, key: &str, value: Option<Value>, force: bool) -> Result<bool> {
        let location = self.entry_path(key)?;

        let value = match value {
            Some(value) => value,
            None => {
                self.remove_with_subtree(key, &location)?;
                return Ok(true);
            }
        };

        let encoded = encode_value(&value)?;

        if !force {
            return match self.backend.create_exclusive(&location, &encoded) {
                Ok(()) => {
                    tracing::trace!("{}: created", key);
                    Ok(true)
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::trace!("{}: exists, not overwriting", key);
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            };
        }

        // Concurrent writers each stage under their own name; the last
        // rename wins.
        let staged = temporary_path(&location);
        remove_file_ignoring_missing(&staged)?;
        self.backend.write_temporary(&staged, &encoded)?;
        if let Err(e) = self.backend.replace(&staged, &location) {
            if let Err(cleanup) = remove_file_ignoring_missing(&staged) {
                tracing::warn!("{}: cannot remove staged value: {}", staged.display(), cleanup);
            }
            return Err(e.into());
        }

        tracing::trace!("{}: set", key);
        Ok(true)
    }

    /// Get the value of `key`, `None` if unset
    ///
    /// Decode failures and I/O errors other than "not found" propagate.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let location = self.entry_path(key)?;
        self.read_entry(&location)
    }

    /// Get the value of `key`, or `default` if unset
    pub fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Overwrite `key` with `value`
    pub fn put(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.set(key, Some(value.into()), true)?;
        Ok(())
    }

    /// Remove `key` and every `key.*` below it
    pub fn delete(&self, key: &str) -> Result<()> {
        self.set(key, None, true)?;
        Ok(())
    }

    /// List keys, optionally filtered by a shell-style pattern
    ///
    /// Order is unspecified.
    pub fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let filter = match pattern {
            Some(pattern) => Some(compile_pattern(pattern)?),
            None => None,
        };

        Ok(self
            .entries()?
            .into_iter()
            .map(|(key, _)| key)
            .filter(|key| filter.as_ref().map_or(true, |f| f.matches(key)))
            .collect())
    }

    /// Key/value pairs selected by `patterns`, sorted by key
    ///
    /// A key is selected if a pattern matches it or it lies in the dotted
    /// sub-tree of a pattern; no patterns selects everything. `a.b` sorts
    /// before `a.b.c`.
    pub fn get_as_slist<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<(String, Value)>> {
        let mut pairs = self.scan(&KeyFilter::new(patterns)?)?;
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(pairs)
    }

    /// Key/value pairs selected by `patterns`, as a map
    pub fn get_as_dict<S: AsRef<str>>(&self, patterns: &[S]) -> Result<HashMap<String, Value>> {
        Ok(self.scan(&KeyFilter::new(patterns)?)?.into_iter().collect())
    }

    /// Selected pairs projected into a nested tree
    pub fn to_nested<S: AsRef<str>>(&self, patterns: &[S]) -> Result<NestedMap> {
        Ok(project_sorted(&self.get_as_slist(patterns)?))
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Remove temporaries left by interrupted writes
    ///
    /// Only temporaries last modified at least `older_than` ago are
    /// removed, so writes in flight are left alone. Names merely carrying
    /// `~`, directories and other foreign objects are never touched.
    /// Returns how many were removed.
    pub fn reap_temporaries(&self, older_than: Duration) -> Result<usize> {
        let mut reaped = 0;

        for dir_entry in fs::read_dir(&self.location)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let is_temporary = name.to_str().map_or(false, is_temporary_name);
            if !is_temporary {
                continue;
            }

            let path = dir_entry.path();
            let meta = match fs::symlink_metadata(&path) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let file_type = meta.file_type();
            if !(file_type.is_symlink() || file_type.is_file()) {
                tracing::debug!("{}: not a temporary, leaving it", path.display());
                continue;
            }
            let age = meta.modified()?.elapsed().unwrap_or_default();

            if age >= older_than {
                remove_file_ignoring_missing(&path)?;
                reaped += 1;
            }
        }

        if reaped > 0 {
            tracing::debug!("{}: reaped {} temporaries", self.location.display(), reaped);
        }
        Ok(reaped)
    }

    /// Remove the whole database directory
    pub fn wipe(self) -> Result<()> {
        match fs::remove_dir_all(&self.location) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!("{}: wiped", self.location.display());
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the database directory path
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Name of the backend in use ("symlink" or "file")
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn validate_location(location: &Path) -> Result<()> {
        if !location.is_dir() {
            return Err(FlatKvError::InvalidDatabase {
                path: location.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        if !access_ok(location, true, true, true) {
            return Err(FlatKvError::InvalidDatabase {
                path: location.to_path_buf(),
                reason: "cannot access".to_string(),
            });
        }
        Ok(())
    }

    #[cfg(unix)]
    fn select_backend(kind: BackendKind, location: &Path) -> Result<Box<dyn Backend>> {
        Ok(match kind {
            BackendKind::Symlink => Box::new(SymlinkBackend),
            BackendKind::File => Box::new(FileBackend),
            BackendKind::Auto if SymlinkBackend::supported_in(location) => Box::new(SymlinkBackend),
            BackendKind::Auto => Box::new(FileBackend),
        })
    }

    #[cfg(not(unix))]
    fn select_backend(kind: BackendKind, _location: &Path) -> Result<Box<dyn Backend>> {
        match kind {
            BackendKind::Symlink => Err(FlatKvError::Config(
                "symlink backend is not available on this platform".to_string(),
            )),
            BackendKind::File | BackendKind::Auto => Ok(Box::new(FileBackend)),
        }
    }

    /// Path of the entry for `key`
    ///
    /// Keys whose escaped name would not fit a temporary's name are
    /// rejected up front, whatever the write mode.
    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(FlatKvError::InvalidKey("empty key".to_string()));
        }
        let name = encode_key(key);
        if name.len() > MAX_NAME_LEN {
            return Err(FlatKvError::InvalidKey(format!(
                "escaped key is {} bytes, limit is {}",
                name.len(),
                MAX_NAME_LEN
            )));
        }
        Ok(self.location.join(name))
    }

    fn read_entry(&self, location: &Path) -> Result<Option<Value>> {
        match self.backend.read(location)? {
            Some(stored) => Ok(Some(decode_value(&stored)?)),
            None => Ok(None),
        }
    }

    /// All live entries as (key, path); residue is skipped
    fn entries(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();

        for dir_entry in fs::read_dir(&self.location)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_canonical_name(name) {
                continue;
            }
            let Some(key) = decode_key(name) else {
                continue;
            };

            let path = dir_entry.path();
            if self.backend.is_entry(&path) {
                entries.push((key, path));
            }
        }

        Ok(entries)
    }

    /// Read every entry selected by `filter`
    ///
    /// Entries that vanish mid-scan or hold undecodable values are
    /// skipped.
    fn scan(&self, filter: &KeyFilter) -> Result<Vec<(String, Value)>> {
        let mut pairs = Vec::new();

        for (key, path) in self.entries()? {
            if !filter.matches(&key) {
                continue;
            }
            match self.read_entry(&path) {
                Ok(Some(value)) => pairs.push((key, value)),
                Ok(None) => {}
                Err(e) if Self::is_residue(&e) => {
                    tracing::debug!("{}: skipping unreadable entry: {}", key, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(pairs)
    }

    fn is_residue(err: &FlatKvError) -> bool {
        match err {
            FlatKvError::Io(e) => e.kind() == io::ErrorKind::InvalidData,
            other => other.is_decode_error(),
        }
    }

    /// Unlink `key` and then every entry in its dotted sub-tree
    fn remove_with_subtree(&self, key: &str, location: &Path) -> Result<()> {
        remove_file_ignoring_missing(location)?;

        let below = self.keys(Some(&subtree_pattern(key)))?;
        for sub_key in &below {
            remove_file_ignoring_missing(&self.location.join(encode_key(sub_key)))?;
        }

        tracing::debug!("{}: removed with {} sub-keys", key, below.len());
        Ok(())
    }
}
