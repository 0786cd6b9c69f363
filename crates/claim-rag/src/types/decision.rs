//! Structured claim decision returned to callers

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire value used when the model gave no decision
pub const NO_DECISION: &str = "No decision provided";

/// Wire value used when no amount applies
pub const NOT_APPLICABLE: &str = "N/A";

/// Claim verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
    /// The model did not provide a decision
    Undetermined,
}

impl Verdict {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Undetermined => NO_DECISION,
        }
    }

    /// Parse a label, case-insensitively. Returns `None` for labels outside the set.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("approved") {
            Some(Self::Approved)
        } else if label.eq_ignore_ascii_case("rejected") {
            Some(Self::Rejected)
        } else if label.eq_ignore_ascii_case(NO_DECISION) {
            Some(Self::Undetermined)
        } else {
            None
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown decision label '{}'", label)))
    }
}

/// Claim amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amount {
    /// Monetary value as the model phrased it
    Value(String),
    /// No amount applies
    NotApplicable,
}

impl Amount {
    /// Interpret a raw amount string; blank or `N/A` means not applicable
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(NOT_APPLICABLE) {
            Self::NotApplicable
        } else {
            Self::Value(raw.to_string())
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(v) => v,
            Self::NotApplicable => NOT_APPLICABLE,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A clause reference and the reason it supports the decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JustificationItem {
    pub clause: String,
    pub reason: String,
}

/// Decision for one claim query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: Verdict,
    pub amount: Amount,
    pub justification: Vec<JustificationItem>,
}
