//! Ollama HTTP client for embeddings and decision generation
//!
//! Calls are made once; failures surface immediately to the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{GenerationConfig, OllamaConfig};
use crate::error::{Error, Result};

use super::llm::LlmProvider;

/// Ollama API client
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Server base URL
    base_url: String,
    /// Generation model
    generate_model: String,
    /// Temperature for generation
    temperature: f32,
    /// Request `format: "json"`
    json_mode: bool,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(ollama: &OllamaConfig, generation: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: ollama.base_url.trim_end_matches('/').to_string(),
            generate_model: generation.model_name(),
            temperature: generation.temperature,
            json_mode: generation.json_mode,
        })
    }

    /// Check if Ollama is reachable
    pub async fn ping(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Embed `text` with `model`
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model, prompt: text })
            .send()
            .await
            .map_err(|e| Error::model_unavailable(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::model_unavailable(format!(
                "Embedding failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            Error::model_unavailable(format!("Failed to parse embedding response: {}", e))
        })?;

        Ok(embed_response.embedding)
    }

    /// Run one non-streaming completion
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.generate_model,
            prompt,
            stream: false,
            format: self.json_mode.then_some("json"),
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::service_unavailable(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::service_unavailable(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response.json().await.map_err(|e| {
            Error::service_unavailable(format!("Failed to parse generation response: {}", e))
        })?;

        Ok(generate_response.response)
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.ping().await)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.generate_model
    }
}
