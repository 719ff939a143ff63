//! Google Gemini over the `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Turn, turns_for};
use crate::backend::{Backend, BackendProfile};
use crate::config::BackendConfig;
use crate::error::{CouncilError, ProviderError};
use crate::message::{BackendId, Transcript};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiBackend {
    id: BackendId,
    profile: BackendProfile,
    max_tokens: u32,
    api_base: String,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: &BackendConfig, api_key: &str) -> Result<Self, CouncilError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                CouncilError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            id: BackendId::new(&config.id),
            profile: BackendProfile::new(&config.display_name, &config.icon, &config.model),
            max_tokens: config.max_tokens,
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
            api_key: api_key.to_string(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.profile.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl Content {
    fn text(role: Option<&str>, text: String) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

/// Gemini gets the conversation as one prompt of labelled paragraphs.
fn flatten_prompt(own: &BackendId, transcript: &Transcript) -> String {
    turns_for(own, transcript)
        .into_iter()
        .map(|turn| match turn {
            Turn::User(text) => format!("User: {}", text),
            Turn::Assistant(text) => format!("Assistant: {}", text),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Backend for GeminiBackend {
    fn id(&self) -> &BackendId {
        &self.id
    }

    fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &Transcript,
    ) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            system_instruction: Content::text(None, system_prompt.to_string()),
            contents: vec![Content::text(Some("user"), flatten_prompt(&self.id, transcript))],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("no candidate text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_flatten_prompt_labels_turns() {
        let transcript = Transcript::from(vec![
            Message::user("Explain X"),
            Message::backend_reply("gemini", "X is a letter."),
            Message::user("Why?"),
        ]);

        assert_eq!(
            flatten_prompt(&BackendId::new("gemini"), &transcript),
            "User: Explain X\n\nAssistant: X is a letter.\n\nUser: Why?"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            system_instruction: Content::text(None, "Be brief.".to_string()),
            contents: vec![Content::text(Some("user"), "User: hi".to_string())],
            generation_config: GenerationConfig {
                max_output_tokens: 256,
            },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "systemInstruction": {"parts": [{"text": "Be brief."}]},
                "contents": [{"role": "user", "parts": [{"text": "User: hi"}]}],
                "generationConfig": {"maxOutputTokens": 256}
            })
        );
    }

    #[test]
    fn test_response_text_is_joined() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]}}]}"#,
        )
        .unwrap();
        let content = parsed.candidates.into_iter().next().unwrap().content.unwrap();
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn test_endpoint_uses_model() {
        let config = crate::config::default_config();
        let backend = GeminiBackend::new(&config.backends[1], "g-test").unwrap();
        assert_eq!(
            backend.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }
}
