//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CouncilError;
use crate::mode::Mode;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub council: CouncilSettings,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

/// Process-wide council settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CouncilSettings {
    /// Mode used when a request carries no inline override.
    #[serde(default)]
    pub default_mode: Mode,
    /// Upper bound on a single backend call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CouncilSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CouncilSettings {
    fn default() -> Self {
        Self {
            default_mode: Mode::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

/// Which client a backend is reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Any OpenAI-compatible chat completions endpoint.
    #[serde(alias = "openai-compatible")]
    OpenAi,
    /// Google Gemini `generateContent`.
    Gemini,
}

/// Configuration for one backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    pub kind: BackendKind,
    pub display_name: String,
    #[serde(default)]
    pub icon: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    1024
}

impl BackendConfig {
    /// Look up the API key; absent or blank means the backend is disabled.
    pub fn api_key(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        env(self.api_key_env.as_str()).filter(|key| !key.trim().is_empty())
    }

    /// Apply `<ID>_MODEL` and `<ID>_USERNAME` overrides.
    pub fn with_env_overrides(&self, env: impl Fn(&str) -> Option<String>) -> Self {
        let prefix = self.id.to_uppercase();
        let mut resolved = self.clone();
        if let Some(model) = env(format!("{prefix}_MODEL").as_str()).filter(|v| !v.is_empty()) {
            resolved.model = model;
        }
        if let Some(name) = env(format!("{prefix}_USERNAME").as_str()).filter(|v| !v.is_empty()) {
            resolved.display_name = name;
        }
        resolved
    }
}

/// System prompt templates; `{name}` is replaced by the backend's display name.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "default_compare_prompt")]
    pub compare: String,
    #[serde(default = "default_debate_prompt")]
    pub debate: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            compare: default_compare_prompt(),
            debate: default_debate_prompt(),
        }
    }
}

impl PromptsConfig {
    /// Get the system prompt for a backend in the given mode.
    pub fn render(&self, mode: Mode, name: &str) -> String {
        let template = match mode {
            Mode::Compare => &self.compare,
            Mode::Debate => &self.debate,
        };
        template.replace("{name}", name)
    }
}

fn default_compare_prompt() -> String {
    DEFAULT_COMPARE_PROMPT.to_string()
}

fn default_debate_prompt() -> String {
    DEFAULT_DEBATE_PROMPT.to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CouncilError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| CouncilError::ConfigError(format!("Failed to read config: {}", e)))?;

        content.parse()
    }
}

impl FromStr for Config {
    type Err = CouncilError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        toml::from_str(content)
            .map_err(|e| CouncilError::ConfigError(format!("Failed to parse config: {}", e)))
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        council: CouncilSettings::default(),
        prompts: PromptsConfig::default(),
        backends: vec![
            BackendConfig {
                id: "openai".to_string(),
                kind: BackendKind::OpenAi,
                display_name: "GPT-5.2".to_string(),
                icon: ":robot_face:".to_string(),
                model: "gpt-5.2".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                api_base: None,
                max_tokens: 2048,
            },
            BackendConfig {
                id: "gemini".to_string(),
                kind: BackendKind::Gemini,
                display_name: "Gemini-3-Flash-Preview".to_string(),
                icon: ":gem:".to_string(),
                model: "gemini-3-flash-preview".to_string(),
                api_key_env: "GOOGLE_API_KEY".to_string(),
                api_base: None,
                max_tokens: 2048,
            },
            BackendConfig {
                id: "grok".to_string(),
                kind: BackendKind::OpenAi,
                display_name: "Grok-3".to_string(),
                icon: ":lightning:".to_string(),
                model: "grok-3".to_string(),
                api_key_env: "XAI_API_KEY".to_string(),
                api_base: Some("https://api.x.ai/v1".to_string()),
                max_tokens: 1000,
            },
            BackendConfig {
                id: "doubao".to_string(),
                kind: BackendKind::OpenAi,
                display_name: "Doubao-Seed-1.8".to_string(),
                icon: ":coffee:".to_string(),
                model: "doubao-seed-1-8-251215".to_string(),
                api_key_env: "DOUBAO_API_KEY".to_string(),
                api_base: Some("https://ark.cn-beijing.volces.com/api/v3/bots".to_string()),
                max_tokens: 2048,
            },
        ],
    }
}

const DEFAULT_COMPARE_PROMPT: &str = "You are {name}, participating in a multi-AI comparison. \
Provide your perspective on the user's question. \
Be concise, helpful, and show your unique approach to problem-solving.";

const DEFAULT_DEBATE_PROMPT: &str = "You are {name}, participating in an AI debate. \
You will see arguments from other AI models. \
Respond thoughtfully, point out strengths and weaknesses in arguments, \
and build upon or challenge previous points constructively.";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_backends_in_order() {
        let config = default_config();
        let ids: Vec<_> = config.backends.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["openai", "gemini", "grok", "doubao"]);
        assert_eq!(config.council.default_mode, Mode::Compare);
        assert_eq!(config.council.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = r#"
            [council]
            default_mode = "debate"
            timeout_secs = 30

            [[backends]]
            id = "local"
            kind = "openai"
            display_name = "Local Llama"
            model = "llama3:8b"
            api_key_env = "LOCAL_KEY"
            api_base = "http://localhost:11434/v1"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.council.default_mode, Mode::Debate);
        assert_eq!(config.council.timeout_secs, 30);
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].kind, BackendKind::OpenAi);
        assert_eq!(config.backends[0].max_tokens, 1024);
        assert_eq!(config.prompts.compare, DEFAULT_COMPARE_PROMPT);
    }

    #[test]
    fn test_invalid_default_mode_is_rejected() {
        let err = "[council]\ndefault_mode = \"brawl\"\n"
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, CouncilError::ConfigError(_)));
    }

    #[test]
    fn test_render_prompt_per_mode() {
        let prompts = PromptsConfig::default();
        let compare = prompts.render(Mode::Compare, "Grok-3");
        assert!(compare.starts_with("You are Grok-3, participating in a multi-AI comparison."));
        let debate = prompts.render(Mode::Debate, "Grok-3");
        assert!(debate.starts_with("You are Grok-3, participating in an AI debate."));
    }

    #[test]
    fn test_api_key_lookup() {
        let config = default_config();
        let backend = &config.backends[0];
        assert_eq!(
            backend.api_key(env_of(&[("OPENAI_API_KEY", "sk-test")])),
            Some("sk-test".to_string())
        );
        assert_eq!(backend.api_key(env_of(&[("OPENAI_API_KEY", "  ")])), None);
        assert_eq!(backend.api_key(env_of(&[])), None);
    }

    #[test]
    fn test_env_overrides() {
        let config = default_config();
        let backend = &config.backends[2];
        let resolved = backend.with_env_overrides(env_of(&[
            ("GROK_MODEL", "grok-4"),
            ("GROK_USERNAME", "Grok-4"),
        ]));
        assert_eq!(resolved.model, "grok-4");
        assert_eq!(resolved.display_name, "Grok-4");

        let untouched = backend.with_env_overrides(env_of(&[]));
        assert_eq!(untouched.model, "grok-3");
    }
}
