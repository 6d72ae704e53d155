//! Key Pattern Module
//!
//! Compiles glob-like key patterns into anchored regular expressions for
//! bulk invalidation. `*` matches any run of characters, `?` matches a
//! single character; everything else matches literally.

use regex::Regex;

use crate::error::{CacheError, Result};

// == Compile ==
/// Compiles a glob pattern into a full-string-anchored regex.
pub fn compile(pattern: &str) -> Result<Regex> {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            // Escape regex metacharacters so keys like "user.1" match literally
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                regex.push('\\');
                regex.push(ch);
            }
            _ => regex.push(ch),
        }
    }
    regex.push('$');

    Regex::new(&regex).map_err(|e| CacheError::InvalidPattern(e.to_string()))
}
