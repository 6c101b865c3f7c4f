//! Shortcode keys.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ShortcodeError};

/// A validated `CATEGORY:ACTION` key.
///
/// Both segments match `[A-Z][A-Z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortcodeKey {
    category: String,
    action: String,
}

impl ShortcodeKey {
    pub fn new(category: &str, action: &str) -> Result<Self> {
        if !is_segment(category) || !is_segment(action) {
            return Err(ShortcodeError::InvalidKey(format!("{}:{}", category, action)));
        }
        Ok(Self {
            category: category.to_string(),
            action: action.to_string(),
        })
    }

    /// Parses `CATEGORY:ACTION`.
    pub fn parse(s: &str) -> Result<Self> {
        let (category, action) = s
            .split_once(':')
            .ok_or_else(|| ShortcodeError::InvalidKey(s.to_string()))?;
        Self::new(category, action)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

fn is_segment(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl fmt::Display for ShortcodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.action)
    }
}

impl FromStr for ShortcodeKey {
    type Err = ShortcodeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
