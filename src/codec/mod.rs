//! Codec Module
//!
//! Translation between logical keys/values and their on-disk text.
//!
//! ## Responsibilities
//! - Escape logical key names into single, safe directory entry names
//! - Tag scalar values so their type survives a plain-text medium
//!
//! ## Encodings
//! ```text
//! key    "rating.imdb/x"   <->  entry name   "rating%2Eimdb%2Fx"
//! value  true              <->  link target  "b:True"
//!        42                <->               "i:42"
//!        8.8               <->               "f:8.8000000000"
//!        "Inception"       <->               "Inception"
//!        "i:5"             <->               "s:i:5"
//! ```

mod key;
mod value;

pub use key::{decode_key, encode_key, is_canonical_name, is_temporary_name, MAX_NAME_LEN, TEMP_MARKER};
pub use value::{decode_value, encode_value, Value, MAX_ENCODED_LEN};
