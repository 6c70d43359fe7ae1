//! Post search term.

use crate::domain::PostRecord;
use crate::error::DomainError;

/// A validated, trimmed, non-empty search term.
///
/// Matching rules: case-insensitive substring on title, content, excerpt and
/// author username; exact membership in the tag list. Any one match is enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn parse(raw: Option<&str>) -> Result<Self, DomainError> {
        match raw.map(str::trim) {
            Some(term) if !term.is_empty() => Ok(Self(term.to_string())),
            _ => Err(DomainError::Validation(
                "Search query is required".to_string(),
            )),
        }
    }

    pub fn term(&self) -> &str {
        &self.0
    }

    /// `LIKE` pattern for a lower-cased column, with `%`, `_` and `\` escaped.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.0.len() + 2);
        pattern.push('%');
        for c in self.0.to_lowercase().chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    /// Evaluate the matching rules against an in-memory record.
    pub fn matches(&self, record: &PostRecord) -> bool {
        let needle = self.0.to_lowercase();
        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

        contains(&record.post.title)
            || contains(&record.post.content)
            || contains(&record.post.excerpt)
            || contains(&record.author.username)
            || record.post.tags.iter().any(|tag| tag == &self.0)
    }
}
