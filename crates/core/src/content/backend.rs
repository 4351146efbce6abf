use async_trait::async_trait;
use tracing::debug;

use crate::config::ContentConfig;
use crate::error::BackendError;
use crate::provider::{BackendSettings, Provider};

/// Prompt in, free text out.
#[async_trait]
pub trait LanguageBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsBackend {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl ChatCompletionsBackend {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature,
        }
    }

    pub fn from_settings(settings: BackendSettings) -> Self {
        Self::new(
            settings.api_url,
            settings.model,
            settings.api_key,
            settings.temperature,
        )
    }

    /// Backend for `provider`, reading its API key from the environment.
    pub fn for_provider(provider: Provider, config: &ContentConfig) -> Result<Self, BackendError> {
        Ok(Self::from_settings(provider.resolve(config)?))
    }
}

#[async_trait]
impl LanguageBackend for ChatCompletionsBackend {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": self.temperature,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<serde_json::Value>().await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                BackendError::InvalidResponse(format!(
                    "missing choices[0].message.content in {}",
                    response
                ))
            })?;

        debug!(model = %self.model, chars = content.len(), "backend responded");
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn backend(server: &MockServer) -> ChatCompletionsBackend {
        ChatCompletionsBackend::new(
            format!("{}/v1/chat/completions", server.uri()),
            "test-model",
            "secret",
            0.3,
        )
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "FLOW SCORE: 81" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = backend(&server).generate("rate this").await.unwrap();
        assert_eq!(text, "FLOW SCORE: 81");
    }

    #[tokio::test]
    async fn resolved_settings_reach_the_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gateway/chat/completions"))
            .and(header("Authorization", "Bearer gw-key"))
            .and(body_partial_json(serde_json::json!({ "model": "local-judge" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "STRUCTURE SCORE: 64" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ContentConfig {
            api_url: Some(format!("{}/gateway/chat/completions", server.uri())),
            model: Some("local-judge".to_string()),
            ..ContentConfig::default()
        };
        let settings = Provider::Grok
            .resolve_with_key(&config, Some("gw-key".to_string()))
            .unwrap();

        let text = ChatCompletionsBackend::from_settings(settings)
            .generate("rate this")
            .await
            .unwrap();
        assert_eq!(text, "STRUCTURE SCORE: 64");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = backend(&server).generate("rate this").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn unexpected_shape_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "output": [] })))
            .mount(&server)
            .await;

        let err = backend(&server).generate("rate this").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }
}
