//! # Input Sanitizer
//!
//! Filters raw user text down to the characters a toy understands.
//!
//! The sanitizer is total: it never fails and never rejects input. Unknown
//! characters are silently dropped, ASCII letters are upper-cased, digits pass
//! through, and punctuation passes only if it is in the toy's allow-list.
//!
//! ## Example
//! ```rust
//! use tonetoys::sanitize::{sanitize, sanitize_with, CharSet};
//!
//! assert_eq!(sanitize("hello, world!"), "HELLO, WORLD");
//! assert_eq!(sanitize_with("2025/01/02 (thu)", &CharSet::dates()), "2025/01/02 ");
//! ```

use serde::{Deserialize, Serialize};

/// Every punctuation character any toy accepts.
pub const ALL_PUNCTUATION: &str = " -,:/.+#*";

/// Allow-list of characters for one toy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CharSet {
    pub letters: bool,
    pub digits: bool,
    pub punctuation: String,
}

impl Default for CharSet {
    fn default() -> Self {
        Self {
            letters: true,
            digits: true,
            punctuation: ALL_PUNCTUATION.to_string(),
        }
    }
}

impl CharSet {
    /// Dates and times: digits plus the usual separators.
    pub fn dates() -> Self {
        Self {
            letters: false,
            digits: true,
            punctuation: " -,:/.".to_string(),
        }
    }

    /// Phone keypads: letters, digits, separators and the `+ # *` keys.
    pub fn phone() -> Self {
        Self {
            letters: true,
            digits: true,
            punctuation: " -+#*".to_string(),
        }
    }

    /// Free text: letters, digits and plain separators.
    pub fn words() -> Self {
        Self {
            letters: true,
            digits: true,
            punctuation: " -,:".to_string(),
        }
    }

    /// Map a single character to its sanitized form, or `None` to drop it
    pub fn admit(&self, c: char) -> Option<char> {
        if c.is_ascii_alphabetic() {
            return self.letters.then(|| c.to_ascii_uppercase());
        }
        if c.is_ascii_digit() {
            return self.digits.then_some(c);
        }
        // Tabs and newlines collapse into the space separator
        let c = if c.is_whitespace() { ' ' } else { c };
        self.punctuation.contains(c).then_some(c)
    }
}

/// Sanitize with the widest allow-list (every toy's characters).
pub fn sanitize(raw: &str) -> String {
    sanitize_with(raw, &CharSet::default())
}

/// Sanitize with a specific toy's allow-list.
pub fn sanitize_with(raw: &str, charset: &CharSet) -> String {
    raw.chars().filter_map(|c| charset.admit(c)).collect()
}
