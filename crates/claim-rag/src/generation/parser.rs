//! Strict parsing of model replies into a [`Decision`]

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Amount, Decision, JustificationItem, Verdict};

#[derive(Deserialize)]
struct RawDecision {
    #[serde(default)]
    decision: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    amount: Option<String>,
    #[serde(default)]
    justification: Option<Vec<RawJustification>>,
}

#[derive(Deserialize)]
struct RawJustification {
    #[serde(deserialize_with = "text")]
    clause: String,
    reason: String,
}

/// Remove a surrounding markdown code fence, if any.
///
/// Text before the opening fence and a language tag after it are dropped.
/// Unfenced input is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let after = &trimmed[open + 3..];
    let body = match after.find('\n') {
        Some(nl) if after[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after[nl + 1..]
        }
        Some(_) => after,
        None => after.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    match body.rfind("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse a model reply into a decision.
///
/// Missing fields take their sentinel defaults. Anything that is not a JSON
/// object of the expected shape is [`Error::MalformedModelOutput`].
pub fn parse_decision(raw: &str) -> Result<Decision> {
    let cleaned = strip_code_fence(raw);
    if cleaned.is_empty() {
        return Err(Error::malformed("Empty reply", raw));
    }

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| Error::malformed(format!("Reply is not JSON: {}", e), raw))?;
    if !value.is_object() {
        return Err(Error::malformed("Reply is not a JSON object", raw));
    }

    let parsed: RawDecision = serde_json::from_value(value)
        .map_err(|e| Error::malformed(format!("Unexpected reply shape: {}", e), raw))?;

    let decision = match parsed.decision.as_deref().map(str::trim) {
        None | Some("") => Verdict::Undetermined,
        Some(label) => Verdict::parse(label)
            .ok_or_else(|| Error::malformed(format!("Unknown decision '{}'", label), raw))?,
    };

    let amount = parsed
        .amount
        .map(|a| Amount::parse(&a))
        .unwrap_or(Amount::NotApplicable);

    let justification = parsed
        .justification
        .unwrap_or_default()
        .into_iter()
        .map(|j| JustificationItem {
            clause: j.clause,
            reason: j.reason,
        })
        .collect();

    Ok(Decision {
        decision,
        amount,
        justification,
    })
}

fn text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_malformed(raw: &str) {
        match parse_decision(raw) {
            Err(Error::MalformedModelOutput { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected malformed output for {:?}, got {:?}", raw, other),
        }
    }

    #[test]
    fn test_fenced_reply() {
        let raw = "```json\n{\"decision\":\"approved\",\"amount\":\"500\",\"justification\":[]}\n```";
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.decision, Verdict::Approved);
        assert_eq!(decision.amount, Amount::Value("500".into()));
        assert!(decision.justification.is_empty());
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json{}```"), "{}");
        assert_eq!(strip_code_fence("Here you go:\n```json\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fence("```{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_empty_and_non_json_fail() {
        assert_malformed("");
        assert_malformed("```json\n```");
        assert_malformed("The claim should be approved.");
        assert_malformed("[{\"decision\":\"approved\"}]");
        assert_malformed("\"approved\"");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let decision = parse_decision("{\"decision\":\"rejected\"}").unwrap();
        assert_eq!(decision.decision, Verdict::Rejected);
        assert_eq!(decision.amount, Amount::NotApplicable);
        assert!(decision.justification.is_empty());

        let decision = parse_decision("{}").unwrap();
        assert_eq!(decision.decision, Verdict::Undetermined);
        assert_eq!(decision.amount, Amount::NotApplicable);
        assert!(decision.justification.is_empty());
    }

    #[test]
    fn test_amount_forms() {
        let decision = parse_decision("{\"decision\":\"APPROVED\",\"amount\":25000}").unwrap();
        assert_eq!(decision.decision, Verdict::Approved);
        assert_eq!(decision.amount, Amount::Value("25000".into()));

        let decision = parse_decision("{\"amount\":\"n/a\"}").unwrap();
        assert_eq!(decision.amount, Amount::NotApplicable);

        let decision = parse_decision("{\"amount\":null}").unwrap();
        assert_eq!(decision.amount, Amount::NotApplicable);
    }

    #[test]
    fn test_justification_items() {
        let raw = r#"{
            "decision": "rejected",
            "amount": "N/A",
            "justification": [
                {"clause": "4.1", "reason": "waiting period not served"},
                {"clause": 7, "reason": "excluded procedure"}
            ],
            "confidence": "high"
        }"#;
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.justification.len(), 2);
        assert_eq!(decision.justification[0].clause, "4.1");
        assert_eq!(decision.justification[1].clause, "7");
        assert_eq!(decision.justification[1].reason, "excluded procedure");
    }

    #[test]
    fn test_structural_violations_fail() {
        assert_malformed("{\"decision\":\"maybe\"}");
        assert_malformed("{\"decision\":true}");
        assert_malformed("{\"justification\":\"see clause 4\"}");
        assert_malformed("{\"justification\":[{\"clause\":\"4\"}]}");
        assert_malformed("{\"justification\":[{\"clause\":[1],\"reason\":\"x\"}]}");
        assert_malformed("{\"amount\":{\"value\":10}}");
    }
}
