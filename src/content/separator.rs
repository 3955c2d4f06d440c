use regex::Regex;

use crate::config::DEFAULT_SEPARATOR;

/// Splits a physical file into the logical documents bundled inside it.
#[derive(Debug, Clone)]
pub struct Separator {
    pattern: Regex,
}

impl Separator {
    pub fn new(pattern: &str) -> Result<Separator, regex::Error> {
        Ok(Separator { pattern: Regex::new(pattern)? })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns every segment, including empty ones, so the segment count is
    /// always one more than the number of separators found.
    pub fn split<'a>(&self, content: &'a str) -> Vec<&'a str> {
        self.pattern.split(content).collect()
    }
}

impl Default for Separator {
    fn default() -> Self {
        // The built-in pattern is a constant and always compiles.
        Separator::new(DEFAULT_SEPARATOR).unwrap()
    }
}
