//! The uniform capability every AI provider is wrapped in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{BackendId, Transcript};

/// Presentation metadata a transport uses when posting a backend's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    /// Name shown next to the reply (e.g., "GPT-5.2").
    pub display_name: String,
    /// Icon shown next to the reply (e.g., ":robot_face:").
    pub icon: String,
    /// Provider model the backend calls.
    pub model: String,
}

impl BackendProfile {
    pub fn new(
        display_name: impl Into<String>,
        icon: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            icon: icon.into(),
            model: model.into(),
        }
    }
}

/// One AI text-generation provider.
///
/// Implementations hold only configuration and credentials; nothing about
/// a conversation survives between calls. They do not retry, log, or
/// enforce timeouts; the caller bounds every call.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable identity used for routing and reply authorship.
    fn id(&self) -> &BackendId;

    fn profile(&self) -> &BackendProfile;

    /// Generate a reply to `transcript` (oldest first, at least one user
    /// message), steered by `system_prompt`.
    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &Transcript,
    ) -> Result<String, ProviderError>;
}
