//! Key filtering
//!
//! Shell-style patterns (`*`, `?`, `[...]`) matched against decoded key
//! names. A pattern also selects the dotted sub-tree below it, so `movie`
//! matches `movie`, `movie.title` and `movie.cast.0`.
//!
//! Keys are flat names, not paths, so a run of `*` means the same as a
//! single `*`.

use glob::Pattern;

use crate::error::Result;

/// A compiled set of key patterns
///
/// An empty set matches every key.
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    patterns: Vec<(Pattern, String)>,
}

impl KeyFilter {
    /// Compile `patterns`; fails on malformed glob syntax
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| -> Result<(Pattern, String)> {
                let p = p.as_ref();
                Ok((compile_pattern(p)?, format!("{}.", p)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// A filter accepting every key
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, key: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns
            .iter()
            .any(|(glob, prefix)| glob.matches(key) || key.starts_with(prefix.as_str()))
    }
}

/// Check if `field` is selected by any of `patterns`
///
/// An empty pattern list selects everything.
pub fn field_needed<S: AsRef<str>>(field: &str, patterns: &[S]) -> Result<bool> {
    Ok(KeyFilter::new(patterns)?.matches(field))
}

/// Compile a shell-style key pattern
pub fn compile_pattern(pattern: &str) -> Result<Pattern> {
    let mut folded = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && folded.ends_with('*') {
            continue;
        }
        folded.push(c);
    }
    Ok(Pattern::new(&folded)?)
}

/// Pattern matching every key strictly below `key`
///
/// Glob metacharacters in `key` itself are escaped.
pub fn subtree_pattern(key: &str) -> String {
    format!("{}.*", Pattern::escape(key))
}
