//! Prompt template for claim decisions

/// Prompt builder for claim decisions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Reply shape the model is asked to produce
    pub const RESPONSE_FORMAT: &'static str = r#"{"decision": "approved | rejected", "amount": "<amount or N/A>", "justification": [{ "clause": "<clause>", "reason": "<why>" }]}"#;

    /// Build the decision prompt.
    ///
    /// Context texts are included verbatim, newline-joined, in the order given.
    pub fn build_decision_prompt(query: &str, context: &[String]) -> String {
        format!(
            r#"Given the user query and policy clauses below, decide if the claim should be approved, estimate amount, and explain using clause references.

Query: "{query}"

Relevant Clauses:
{clauses}

Respond in JSON like:
{format}
"#,
            query = query,
            clauses = context.join("\n"),
            format = Self::RESPONSE_FORMAT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_keeps_context_order() {
        let context = vec![
            "3.1 Hospitalization is covered".to_string(),
            "1.2 Cosmetic surgery is excluded".to_string(),
            "2.4 Waiting period of 30 days".to_string(),
        ];
        let prompt = PromptBuilder::build_decision_prompt("46M, knee surgery, Pune", &context);

        let positions: Vec<usize> = context
            .iter()
            .map(|c| prompt.find(c.as_str()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("3.1 Hospitalization is covered\n1.2 Cosmetic"));
    }

    #[test]
    fn test_prompt_names_output_fields() {
        let prompt = PromptBuilder::build_decision_prompt("q", &[]);
        let query_at = prompt.find("Query: \"q\"").unwrap();
        let format_at = prompt.find("Respond in JSON").unwrap();
        assert!(query_at < format_at);

        for field in ["decision", "amount", "justification", "clause", "reason"] {
            assert!(prompt.contains(&format!("\"{}\"", field)), "missing {}", field);
        }
    }
}
