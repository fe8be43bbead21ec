//! Ollama backend
//!
//! Blocking client for a local Ollama server. Serves both embeddings
//! (`/api/embeddings`) and completions (`/api/generate`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{BackendError, TextEncoder, TextGenerator};
use crate::logic::config::OllamaSettings;

/// Ollama client
pub struct OllamaClient {
    base_url: String,
    model: String,
    embed_model: String,
    embedding_dim: usize,
    agent: ureq::Agent,
    embed_agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f64>,
}

impl OllamaClient {
    pub fn new(settings: &OllamaSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            embed_model: settings.embed_model.clone(),
            embedding_dim: settings.embedding_dim,
            agent: ureq::AgentBuilder::new().timeout(settings.timeout).build(),
            embed_agent: ureq::AgentBuilder::new().timeout(settings.embed_timeout).build(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn embed_url(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }
}

fn post_json<T: Serialize, R: DeserializeOwned>(
    agent: &ureq::Agent,
    url: &str,
    body: &T,
) -> Result<R, BackendError> {
    agent
        .post(url)
        .send_json(body)?
        .into_json()
        .map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

impl TextGenerator for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let parsed: GenerateResponse = post_json(
            &self.agent,
            &self.generate_url(),
            &GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            },
        )?;

        log::debug!("Ollama completion: {} chars", parsed.response.len());
        Ok(parsed.response)
    }
}

impl TextEncoder for OllamaClient {
    fn id(&self) -> &str {
        &self.embed_model
    }

    fn dimension(&self) -> usize {
        self.embedding_dim
    }

    fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError> {
        let parsed: EmbedResponse = post_json(
            &self.embed_agent,
            &self.embed_url(),
            &EmbedRequest {
                model: &self.embed_model,
                prompt: text,
            },
        )?;

        if parsed.embedding.len() != self.embedding_dim {
            return Err(BackendError::InvalidResponse(format!(
                "embedding has {} dimensions, expected {}",
                parsed.embedding.len(),
                self.embedding_dim
            )));
        }

        Ok(parsed.embedding)
    }
}
