//! Gemini client for decision generation via the Generative Language API
//!
//! Authenticates with an API key. One request per prompt, no retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{GeminiConfig, GenerationConfig};
use crate::error::{Error, Result};

use super::llm::LlmProvider;

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    json_mode: bool,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: RequestConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct RequestConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a client; fails without an API key
    pub fn new(gemini: &GeminiConfig, generation: &GenerationConfig) -> Result<Self> {
        let api_key = gemini
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config("Gemini API key is not configured (GEMINI_API_KEY)"))?
            .to_string();

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: gemini.base_url.trim_end_matches('/').to_string(),
            model: generation.model_name(),
            temperature: generation.temperature,
            max_output_tokens: generation.max_output_tokens,
            json_mode: generation.json_mode,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: RequestConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: self.json_mode.then_some("application/json"),
            },
        }
    }
}

/// Concatenated text of the first candidate; empty when there is none
fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default()
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| Error::service_unavailable(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::service_unavailable(format!(
                "Gemini generation failed ({}): {}",
                status, body
            )));
        }

        let gen_response: GenerateResponse = response.json().await.map_err(|e| {
            Error::service_unavailable(format!("Failed to parse Gemini response: {}", e))
        })?;

        Ok(extract_text(gen_response))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model);
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_string()),
            ..GeminiConfig::default()
        }
    }

    #[test]
    fn test_missing_key_fails_at_construction() {
        let generation = GenerationConfig::default();
        let missing = GeminiConfig {
            api_key: None,
            ..GeminiConfig::default()
        };
        assert!(matches!(
            GeminiClient::new(&missing, &generation),
            Err(Error::Config(_))
        ));

        let blank = GeminiConfig {
            api_key: Some("  ".to_string()),
            ..GeminiConfig::default()
        };
        assert!(matches!(
            GeminiClient::new(&blank, &generation),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_and_request_shape() {
        let client = GeminiClient::new(&configured(), &GenerationConfig::default()).unwrap();
        assert_eq!(client.model(), "gemini-2.5-flash");
        assert!(client
            .endpoint()
            .ends_with("/v1beta/models/gemini-2.5-flash:generateContent"));

        let value = serde_json::to_value(client.request("decide")).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "decide");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(value["generationConfig"]["maxOutputTokens"].is_u64());
    }

    #[test]
    fn test_extract_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"decision\":"},{"text":"\"approved\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response), "{\"decision\":\"approved\"}");

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_text(empty), "");

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(extract_text(blocked), "");
    }
}
