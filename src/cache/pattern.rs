//! Key Pattern Module
//!
//! Matching rules for bulk invalidation. A pattern without `*` is a plain
//! prefix; a pattern containing `*` is a glob anchored at both ends where
//! each `*` matches any run of characters.

use regex::Regex;

// == Key Pattern ==
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Matches every key starting with the string
    Prefix(String),
    /// Compiled glob
    Glob(Regex),
}

impl KeyPattern {
    // == Parse ==
    /// Parses an invalidation pattern.
    ///
    /// Returns an error only if the translated glob fails to compile.
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        if !pattern.contains('*') {
            return Ok(KeyPattern::Prefix(pattern.to_string()));
        }

        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        Regex::new(&format!("^{}$", body)).map(KeyPattern::Glob)
    }

    /// Parses a pattern, degrading to the literal text before the first `*`
    /// when the glob cannot be compiled. The fallback clears more, never less.
    pub fn parse_lossy(pattern: &str) -> Self {
        match Self::parse(pattern) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("Invalid key pattern '{}': {}; using prefix match", pattern, err);
                let literal = pattern.split('*').next().unwrap_or_default();
                KeyPattern::Prefix(literal.to_string())
            }
        }
    }

    // == Matches ==
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyPattern::Glob(re) => re.is_match(key),
        }
    }
}
