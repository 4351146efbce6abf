//! Generative-text providers judging lecture content. All of them are reached
//! through an OpenAI-compatible chat-completions endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ContentConfig;
use crate::error::BackendError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

/// Built-in endpoint and judge model of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDefaults {
    pub chat_completions_url: &'static str,
    pub judge_model: &'static str,
    pub api_key_var: &'static str,
}

/// Everything a content backend needs to send a request.
#[derive(Clone, PartialEq)]
pub struct BackendSettings {
    pub provider: Provider,
    pub api_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Provider {
    pub fn defaults(&self) -> ProviderDefaults {
        match self {
            Provider::Gemini => ProviderDefaults {
                chat_completions_url:
                    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                judge_model: "gemini-2.5-flash",
                api_key_var: "GEMINI_API_KEY",
            },
            Provider::Openai => ProviderDefaults {
                chat_completions_url: "https://api.openai.com/v1/chat/completions",
                judge_model: "gpt-5.1",
                api_key_var: "OPENAI_API_KEY",
            },
            Provider::Grok => ProviderDefaults {
                chat_completions_url: "https://api.x.ai/v1/chat/completions",
                judge_model: "grok-4-fast",
                api_key_var: "XAI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Openai => "OpenAI",
            Provider::Grok => "Grok",
        }
    }

    /// Backend settings for `config`, with the API key read from the
    /// provider's environment variable.
    pub fn resolve(&self, config: &ContentConfig) -> Result<BackendSettings, BackendError> {
        let api_key = std::env::var(self.defaults().api_key_var).ok();
        self.resolve_with_key(config, api_key)
    }

    /// Configured endpoint and model override the provider defaults. A blank
    /// key counts as missing.
    pub fn resolve_with_key(
        &self,
        config: &ContentConfig,
        api_key: Option<String>,
    ) -> Result<BackendSettings, BackendError> {
        let defaults = self.defaults();
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| BackendError::MissingApiKey {
                provider_name: self.name().to_string(),
                env_var: defaults.api_key_var,
            })?;

        Ok(BackendSettings {
            provider: *self,
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| defaults.chat_completions_url.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| defaults.judge_model.to_string()),
            api_key,
            temperature: config.temperature,
        })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_overrides() {
        let settings = Provider::Grok
            .resolve_with_key(&ContentConfig::default(), Some("xai-key".to_string()))
            .unwrap();

        assert_eq!(settings.api_url, "https://api.x.ai/v1/chat/completions");
        assert_eq!(settings.model, "grok-4-fast");
        assert_eq!(settings.api_key, "xai-key");
        assert_eq!(settings.temperature, 0.3);
    }

    #[test]
    fn configured_gateway_and_model_win() {
        let config = ContentConfig {
            api_url: Some("http://localhost:8080/v1/chat/completions".to_string()),
            model: Some("local-judge".to_string()),
            ..ContentConfig::default()
        };
        let settings = Provider::Openai
            .resolve_with_key(&config, Some(" sk-test \n".to_string()))
            .unwrap();

        assert_eq!(settings.api_url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(settings.model, "local-judge");
        assert_eq!(settings.api_key, "sk-test");
    }

    #[test]
    fn blank_key_names_the_variable_to_set() {
        let err = Provider::Gemini
            .resolve_with_key(&ContentConfig::default(), Some("   ".to_string()))
            .unwrap_err();

        match err {
            BackendError::MissingApiKey { env_var, .. } => assert_eq!(env_var, "GEMINI_API_KEY"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn settings_debug_hides_the_key() {
        let settings = Provider::Gemini
            .resolve_with_key(&ContentConfig::default(), Some("top-secret".to_string()))
            .unwrap();
        assert!(!format!("{settings:?}").contains("top-secret"));
    }
}
