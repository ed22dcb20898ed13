//! Store Module
//!
//! The flat key/value database kept in a single directory.
//!
//! ## Responsibilities
//! - Map each key to exactly one directory entry
//! - Atomic create-if-absent and last-writer-wins overwrite
//! - Sub-tree deletion over dotted key names
//! - Enumeration and pattern filtering
//!
//! ## Layout
//! ```text
//! {db_dir}/
//!   ├── title               -> "Inception"          (entry)
//!   ├── watched             -> "b:False"            (entry)
//!   ├── cast%2E0            -> "Leonardo DiCaprio"  (entry, key "cast.0")
//!   └── title~4121-7-3      -> "Inceptio..."        (leaked temporary, ignored)
//! ```
//!
//! ## Concurrency
//! There are no locks, in process or on disk. Every write is one of:
//! - create-if-absent: a single call that fails when the name exists
//! - overwrite: write a private temporary, then rename it over the entry
//!
//! Readers therefore see either the old or the new value, never a mix.

mod backend;
mod flat;
mod pattern;

pub use backend::{Backend, FileBackend};
#[cfg(unix)]
pub use backend::SymlinkBackend;
pub use flat::FlatStore;
pub use pattern::{compile_pattern, field_needed, subtree_pattern, KeyFilter};
