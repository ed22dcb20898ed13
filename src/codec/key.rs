//! Key encoder
//!
//! Logical keys may contain anything (slashes, dots, unicode); entry
//! names must be a single path segment. Everything except ASCII letters,
//! digits, `-`, `_` and space is percent-escaped over its UTF-8 bytes.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes left unescaped: alphanumerics plus `-`, `_` and space
const KEY_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b' ');

/// Separates an escaped key from the writer suffix of a temporary entry.
///
/// `~` is always escaped by [`encode_key`], so a name carrying it can
/// never be a live entry.
pub const TEMP_MARKER: char = '~';

/// Longest entry name a key may escape to
///
/// Leaves room under the usual 255-byte `NAME_MAX` for the
/// `~<pid>-<thread>-<seq>` suffix of a temporary.
pub const MAX_NAME_LEN: usize = 255 - 64;

/// Escape a logical key into an entry name
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPE_SET).to_string()
}

/// Recover the logical key from an entry name
///
/// Returns `None` if the unescaped bytes are not valid UTF-8.
pub fn decode_key(name: &str) -> Option<String> {
    percent_decode_str(name)
        .decode_utf8()
        .ok()
        .map(|key| key.into_owned())
}

/// True if `name` is exactly what [`encode_key`] produces for some key
///
/// Anything else found in a database directory is residue: leaked
/// temporaries, editor droppings, hand-made files.
pub fn is_canonical_name(name: &str) -> bool {
    match decode_key(name) {
        Some(key) => !key.is_empty() && encode_key(&key) == name,
        None => false,
    }
}

/// True if `name` is a temporary written by this store
///
/// That is `<canonical name>~<digits>-<digits>-<digits>`; other names
/// carrying the marker belong to someone else.
pub fn is_temporary_name(name: &str) -> bool {
    let Some((entry, suffix)) = name.split_once(TEMP_MARKER) else {
        return false;
    };

    let mut fields = 0;
    for field in suffix.split('-') {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        fields += 1;
    }

    fields == 3 && is_canonical_name(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_characters_pass_through() {
        assert_eq!(encode_key("title"), "title");
        assert_eq!(encode_key("my key-1_x"), "my key-1_x");
    }

    #[test]
    fn test_unsafe_characters_are_escaped() {
        assert_eq!(encode_key("a.b.c"), "a%2Eb%2Ec");
        assert_eq!(encode_key("a/b"), "a%2Fb");
        assert_eq!(encode_key("100%"), "100%25");
        assert_eq!(encode_key(".."), "%2E%2E");
        assert_eq!(encode_key("~"), "%7E");
        assert_eq!(encode_key("é"), "%C3%A9");
    }

    #[test]
    fn test_key_round_trip() {
        for key in ["title", "a.b.c", "with/slash", "per%cent", "sp ace", "ünï.cödé", "x~y", "*?[]"] {
            let name = encode_key(key);
            assert!(!name.contains('/'));
            assert_eq!(decode_key(&name).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_escaping_is_injective() {
        // A literal "%2E" must not collide with an escaped "."
        assert_ne!(encode_key("a%2Eb"), encode_key("a.b"));
    }

    #[test]
    fn test_canonical_names() {
        assert!(is_canonical_name("title"));
        assert!(is_canonical_name("a%2Eb"));
        assert!(!is_canonical_name("a.b"));
        assert!(!is_canonical_name("a%2eb"));
        assert!(!is_canonical_name("title~123-456-7"));
        assert!(!is_canonical_name("%FF"));
        assert!(!is_canonical_name(""));
    }

    #[test]
    fn test_temporary_names() {
        assert!(is_temporary_name("title~123-1-0"));
        assert!(is_temporary_name("a%2Eb~9-12-345"));
        assert!(!is_temporary_name(&encode_key("x~y")));

        // Editor backups and other foreign names
        assert!(!is_temporary_name("notes~"));
        assert!(!is_temporary_name("backup~"));
        assert!(!is_temporary_name("title~1-2"));
        assert!(!is_temporary_name("title~1-2-3-4"));
        assert!(!is_temporary_name("title~1-x-3"));
        assert!(!is_temporary_name("a.b~1-2-3"));
        assert!(!is_temporary_name("~1-2-3"));
    }
}
