//! Policy chunk types with source provenance

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page reference of a chunk: a page number or a free-form locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    /// Numbered page
    Number(u32),
    /// Anything else the corpus uses (section ids, "p. iv", sheet names)
    Locator(String),
}

impl PageRef {
    /// Parse a raw corpus cell
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<u32>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Locator(raw.to_string()),
        }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Locator(s) => f.write_str(s),
        }
    }
}

/// A retrievable unit of policy text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier from the corpus
    pub chunk_id: String,
    /// Document the text came from
    pub source_doc: String,
    /// Page or locator inside the document
    pub page: PageRef,
    /// Indexed content
    pub text: String,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        chunk_id: impl Into<String>,
        source_doc: impl Into<String>,
        page: PageRef,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            source_doc: source_doc.into(),
            page,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_ref_parse() {
        assert_eq!(PageRef::parse("12"), PageRef::Number(12));
        assert_eq!(PageRef::parse(" 3 "), PageRef::Number(3));
        assert_eq!(PageRef::parse("iv"), PageRef::Locator("iv".to_string()));
        assert_eq!(PageRef::parse("-1"), PageRef::Locator("-1".to_string()));
    }

    #[test]
    fn test_page_ref_serializes_untagged() {
        let json = serde_json::to_string(&PageRef::Number(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&PageRef::Locator("Annex A".into())).unwrap();
        assert_eq!(json, "\"Annex A\"");

        let back: PageRef = serde_json::from_str("7").unwrap();
        assert_eq!(back, PageRef::Number(7));
    }
}
