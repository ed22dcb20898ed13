//! # FlatKV
//!
//! A small key/value database kept in a plain directory:
//! - One directory entry per key, the value in the link target (or file)
//! - Type-tagged scalar values (boolean, integer, real, string)
//! - Lock-free, multi-process safe writes via atomic create and rename
//! - Dotted keys (`a.b.c`) projected into nested maps for presentation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                                │
//! │            set / get / keys / get_as_dict                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     FlatStore                                │
//! │        (sub-tree wipes, filtering, enumeration)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Key codec  │          │ Value codec │
//!   │  (escape)   │          │   (tags)    │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬───────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │    Backend    │
//!               │ symlink/file  │
//!               └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use flatkv::{FlatStore, Value};
//!
//! # fn main() -> flatkv::Result<()> {
//! let store = FlatStore::open_path(std::path::Path::new("/var/lib/movies"))?;
//! store.set("movie.title", Some(Value::from("Inception")), true)?;
//! store.set("movie.watched", Some(Value::from(false)), true)?;
//! assert_eq!(store.get("movie.watched")?, Some(Value::Bool(false)));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod project;
pub mod store;
pub mod util;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlatKvError, Result};
pub use config::{BackendKind, Config};
pub use codec::Value;
pub use project::{project, project_sorted, NestedMap, Node};
pub use store::FlatStore;
pub use util::{derive_id, ensure_directory, remove_file_ignoring_missing, user_store_dir};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FlatKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
