//! Text-generation collaborator seam.
//!
//! Every call the pipeline makes to the outside generator goes through the
//! `TextGenerator` trait: one operation, `generate(prompt) -> text`. The
//! production implementation talks to a Gemini-style HTTP endpoint; tests
//! substitute scripted fakes.

use crate::errors::LlmError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// The single operation the pipeline needs from the outside world.
///
/// Failures are never retried here; recoverability is decided at the
/// orchestration level (skip the task, or abort the cycle on quota).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(
            api_key,
            model,
            "https://generativelanguage.googleapis.com/v1beta".to_string(),
        )
    }

    /// Override the endpoint base, used to point at a local stub in tests.
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key,
            model,
            base_url,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        debug!(chars = prompt.len(), model = %self.model, "Calling generation service");
        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || body.contains("RESOURCE_EXHAUSTED") {
                return Err(LlmError::Quota);
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        let text = payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or(LlmError::MissingContent)?;

        if text.trim().is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(text.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn gemini_client_extracts_candidate_text() {
        let app = Router::new().fallback(|| async {
            axum::Json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "hola mundo" }] } }]
            }))
        });
        let base = spawn_stub(app).await;
        let client = GeminiClient::with_base_url("k".into(), "gemini-2.0-flash".into(), base);
        assert_eq!(client.generate("saluda").await.unwrap(), "hola mundo");
    }

    #[tokio::test]
    async fn gemini_client_maps_429_to_quota() {
        let app = Router::new()
            .fallback(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") });
        let base = spawn_stub(app).await;
        let client = GeminiClient::with_base_url("k".into(), "gemini-2.0-flash".into(), base);
        assert!(matches!(
            client.generate("x").await,
            Err(LlmError::Quota)
        ));
    }

    #[tokio::test]
    async fn gemini_client_missing_content_is_an_error() {
        let app = Router::new().fallback(|| async { axum::Json(json!({ "candidates": [] })) });
        let base = spawn_stub(app).await;
        let client = GeminiClient::with_base_url("k".into(), "gemini-2.0-flash".into(), base);
        assert!(matches!(
            client.generate("x").await,
            Err(LlmError::MissingContent)
        ));
    }

    #[tokio::test]
    async fn scripted_generator_returns_in_order() {
        let generator = ScriptedGenerator::new(vec![Ok("first".into()), Ok("second".into())]);
        assert_eq!(generator.generate("x").await.unwrap(), "first");
        assert_eq!(generator.generate("x").await.unwrap(), "second");
        // Last response replays.
        assert_eq!(generator.generate("x").await.unwrap(), "second");
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn scripted_generator_propagates_errors() {
        let generator = ScriptedGenerator::new(vec![Err(LlmError::Quota), Ok("ok".into())]);
        assert!(matches!(
            generator.generate("x").await,
            Err(LlmError::Quota)
        ));
        assert_eq!(generator.generate("x").await.unwrap(), "ok");
    }
}
