//! Wildcard part patterns
//!
//! An other-filter value containing `*` matches a TSID part when every `*`
//! stands for one or more non-hyphen characters; all other characters are
//! literal and matching ignores case. `ALPHA-*` therefore matches `ALPHA-1`
//! but not `ALPHA` or `ALPHA-1-North`.
//!
//! Compiled patterns are cached, bounded by `max_pattern_cache`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Compiled size limit for one pattern
const PATTERN_SIZE_LIMIT: usize = 1024 * 1024;

/// Why a wildcard value could not be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Value is longer than the configured limit
    #[error("pattern too long: {len} chars (max: {max})")]
    TooLong {
        /// Length of the rejected value
        len: usize,
        /// Configured limit
        max: usize,
    },

    /// The generated expression failed to compile
    #[error("invalid pattern: {0}")]
    Invalid(String),
}

/// Translate a wildcard value into an anchored regular expression
pub fn wildcard_to_regex(value: &str) -> String {
    let mut expr = String::with_capacity(value.len() + 8);
    expr.push('^');
    for ch in value.chars() {
        if ch == '*' {
            expr.push_str("[^-]+");
        } else {
            let mut buf = [0u8; 4];
            expr.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
        }
    }
    expr.push('$');
    expr
}

/// Cache of compiled wildcard patterns keyed by the upper-cased value
#[derive(Debug)]
pub struct PatternCache {
    patterns: RwLock<HashMap<String, Regex>>,
    max_len: usize,
    max_entries: usize,
    errors: AtomicU64,
}

impl PatternCache {
    /// Create a cache
    pub fn new(max_len: usize, max_entries: usize) -> Self {
        Self {
            patterns: RwLock::new(HashMap::new()),
            max_len,
            max_entries,
            errors: AtomicU64::new(0),
        }
    }

    /// Get a compiled pattern from cache or compile and cache it
    pub fn get_or_compile(&self, value: &str) -> Result<Regex, PatternError> {
        let key = value.to_ascii_uppercase();
        {
            let cache = self.patterns.read();
            if let Some(regex) = cache.get(&key) {
                return Ok(regex.clone());
            }
        }

        if value.len() > self.max_len {
            self.errors.fetch_add(1, Ordering::Relaxed);
            return Err(PatternError::TooLong {
                len: value.len(),
                max: self.max_len,
            });
        }

        let regex = RegexBuilder::new(&wildcard_to_regex(value))
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| {
                self.errors.fetch_add(1, Ordering::Relaxed);
                PatternError::Invalid(e.to_string())
            })?;

        {
            let mut cache = self.patterns.write();
            if cache.len() < self.max_entries {
                cache.insert(key, regex.clone());
            }
        }

        Ok(regex)
    }

    /// Number of cached patterns
    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Patterns rejected so far
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}
