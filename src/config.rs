//! Configuration for FlatKV
//!
//! Centralized configuration with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FlatKvError, Result};

/// Environment variable naming the database directory
pub const ENV_DB_DIR: &str = "FLATKV_DIR";

/// Legacy environment variable for the database directory
pub const ENV_DB_DIR_LEGACY: &str = "FSDB";

/// Environment variable selecting the storage backend
pub const ENV_BACKEND: &str = "FLATKV_BACKEND";

/// Main configuration for a FlatKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Database directory. Every immediate child is one entry:
    ///   {db_dir}/
    ///     ├── title          -> "Inception"
    ///     ├── watched        -> "b:True"
    ///     └── rating%2Eimdb  -> "f:8.8000000000"
    pub db_dir: PathBuf,

    /// Which entry representation to use
    pub backend: BackendKind,

    // -------------------------------------------------------------------------
    // Bootstrap Configuration
    // -------------------------------------------------------------------------
    /// Create `db_dir` (and parents) on open if it is missing
    pub create_if_missing: bool,

    /// Permission bits applied to a freshly created `db_dir` (unix only)
    pub dir_mode: Option<u32>,

    // -------------------------------------------------------------------------
    // Maintenance Configuration
    // -------------------------------------------------------------------------
    /// Reap temporaries older than this on open (None = never)
    pub reap_temporaries_older_than: Option<Duration>,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Probe the filesystem; symlinks if supported, plain files otherwise
    Auto,

    /// Value kept as the target of a symbolic link
    Symlink,

    /// Value kept as the contents of a regular file
    File,
}

impl FromStr for BackendKind {
    type Err = FlatKvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "symlink" => Ok(BackendKind::Symlink),
            "file" => Ok(BackendKind::File),
            other => Err(FlatKvError::Config(format!(
                "unknown backend '{}' (expected auto, symlink or file)",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from("./flatkv_data"),
            backend: BackendKind::Auto,
            create_if_missing: false,
            dir_mode: None,
            reap_temporaries_older_than: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from the process environment
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(dir) = env::var_os(ENV_DB_DIR).or_else(|| env::var_os(ENV_DB_DIR_LEGACY)) {
            config.db_dir = PathBuf::from(dir);
        }

        if let Ok(backend) = env::var(ENV_BACKEND) {
            config.backend = backend.parse()?;
        }

        Ok(config)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database directory
    pub fn db_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_dir = path.into();
        self
    }

    /// Set the storage backend
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Create the database directory on open if missing
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    /// Set the mode applied to a created database directory
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.config.dir_mode = Some(mode);
        self
    }

    /// Reap leaked temporaries older than `age` when the store opens
    pub fn reap_temporaries_older_than(mut self, age: Duration) -> Self {
        self.config.reap_temporaries_older_than = Some(age);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
