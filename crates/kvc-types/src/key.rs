//! Key prefixing.
//!
//! Every key sent to the store passes through [`KeyFormatter::format`]
//! exactly once. Handlers never concatenate the prefix themselves.

/// Applies the configured prefix to logical keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyFormatter {
    prefix: String,
}

impl KeyFormatter {
    /// Create a formatter for the given prefix. An empty prefix is allowed.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Format a logical key.
    ///
    /// Returns `None` when the key is absent or empty; callers report that
    /// as a `NO_KEY` application error for the item.
    pub fn format(&self, key: Option<&str>) -> Option<String> {
        match key {
            Some(key) if !key.is_empty() => {
                let mut formatted = String::with_capacity(self.prefix.len() + key.len());
                formatted.push_str(&self.prefix);
                formatted.push_str(key);
                Some(formatted)
            }
            _ => None,
        }
    }
}
