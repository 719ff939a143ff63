//! OpenAI-compatible chat completions (OpenAI, xAI Grok, Doubao, local servers).

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;

use super::{Turn, turns_for};
use crate::backend::{Backend, BackendProfile};
use crate::config::BackendConfig;
use crate::error::{CouncilError, ProviderError};
use crate::message::{BackendId, Transcript};

pub struct OpenAiCompatibleBackend {
    id: BackendId,
    profile: BackendProfile,
    max_tokens: u32,
    client: Client<OpenAIConfig>,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: &BackendConfig, api_key: &str) -> Result<Self, CouncilError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                CouncilError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(api_base) = &config.api_base {
            openai_config = openai_config.with_api_base(api_base);
        }

        Ok(Self {
            id: BackendId::new(&config.id),
            profile: BackendProfile::new(&config.display_name, &config.icon, &config.model),
            max_tokens: config.max_tokens,
            client: Client::with_config(openai_config).with_http_client(http_client),
        })
    }
}

/// Build the chat history for one request, system prompt first.
fn chat_messages(
    own: &BackendId,
    system_prompt: &str,
    transcript: &Transcript,
) -> Vec<ChatCompletionRequestMessage> {
    let mut messages = vec![ChatCompletionRequestMessage::System(
        ChatCompletionRequestSystemMessage {
            content: system_prompt.to_string().into(),
            name: None,
        },
    )];

    messages.extend(turns_for(own, transcript).into_iter().map(|turn| match turn {
        Turn::User(text) => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: text.into(),
            name: None,
        }),
        Turn::Assistant(text) => {
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(text.into()),
                name: None,
                tool_calls: None,
                refusal: None,
                audio: None,
                function_call: None,
            })
        }
    }));

    messages
}

#[async_trait]
impl Backend for OpenAiCompatibleBackend {
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
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.profile.model)
            .max_completion_tokens(self.max_tokens)
            .messages(chat_messages(&self.id, system_prompt, transcript))
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("empty completion".to_string()))
    }
}
