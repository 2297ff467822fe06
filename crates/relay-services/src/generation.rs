//! Generation backends.
//!
//! The relay treats a backend as an opaque async call that may run for a long
//! time, fail, or never answer at all. The deadline is enforced by the caller,
//! never here.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::GenerationError;
use serde::Deserialize;
use serde_json::json;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer for `prompt`, optionally steered by a system instruction.
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Model name reported by the direct generation endpoint.
    fn model(&self) -> &str {
        "unknown"
    }
}

// ── Gemini ────────────────────────────────────────────────────────────────────

/// Google Gemini `generateContent` over REST.
pub struct GeminiGenerator {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiError {
    message: String,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

impl GeminiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: crate::http_client(DEFAULT_TIMEOUT),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = crate::http_client(timeout);
        self
    }
}

fn request_body(prompt: &str, system_instruction: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    });
    if let Some(instruction) = system_instruction.filter(|s| !s.trim().is_empty()) {
        body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }
    body
}

/// Concatenated text of the first candidate.
fn answer_text(response: GenerateResponse) -> Result<String, GenerationError> {
    if let Some(err) = response.error {
        return Err(GenerationError::Backend(err.message));
    }
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(text)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured("GEMINI_API_KEY".into()));
        }

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt, system_instruction))
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(format!("HTTP {status}: {e}")))?;
        if !status.is_success() && body.error.is_none() {
            return Err(GenerationError::Backend(format!("HTTP {status}")));
        }

        let text = answer_text(body)?;
        tracing::debug!(model = %self.model, len = text.len(), "generation complete");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
