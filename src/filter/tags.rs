use crate::validation::Pattern;

use super::error::FilterError;

/// Normalized, de-duplicated tag names in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    names: Vec<String>,
}

impl TagSet {
    /// Trim each value, strip one leading `#` and check it against the tag
    /// pattern. Any failure rejects the whole set.
    pub fn parse<I, S>(values: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = Vec::new();
        for raw in values {
            let raw = raw.as_ref();
            let trimmed = raw.trim();
            let name = trimmed.strip_prefix('#').unwrap_or(trimmed);
            if !Pattern::Tag.matches(name) {
                return Err(FilterError::InvalidTag(raw.to_string()));
            }
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
