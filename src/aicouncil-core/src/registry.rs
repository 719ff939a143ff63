//! The set of backends that could be configured at startup.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::Backend;
use crate::config::{BackendConfig, BackendKind, Config};
use crate::error::CouncilError;
use crate::message::BackendId;
use crate::providers::{GeminiBackend, OpenAiCompatibleBackend};

/// Read-only collection of active backends, in canonical order.
///
/// Canonical order is the order backends were configured in; both
/// strategies report results in it.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// Build from explicit adapter values. Later duplicates of an
    /// identity are dropped.
    pub fn from_backends(backends: impl IntoIterator<Item = Arc<dyn Backend>>) -> Self {
        let mut seen = HashSet::new();
        let backends = backends
            .into_iter()
            .filter(|backend| {
                let fresh = seen.insert(backend.id().clone());
                if !fresh {
                    warn!("Duplicate backend '{}', skipping", backend.id());
                }
                fresh
            })
            .collect();
        Self { backends }
    }

    /// Build from configuration, reading credentials from the process
    /// environment.
    pub fn from_config(config: &Config) -> Self {
        Self::from_config_with_env(config, |key| std::env::var(key).ok())
    }

    /// Build from configuration with an explicit environment lookup.
    ///
    /// Backends whose key is missing, or whose client cannot be built, are
    /// left out; an empty registry is not an error here.
    pub fn from_config_with_env(config: &Config, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut adapters: Vec<Arc<dyn Backend>> = Vec::new();

        for backend_config in &config.backends {
            let Some(api_key) = backend_config.api_key(&env) else {
                info!(
                    "Skipping {} backend: {} not set",
                    backend_config.id, backend_config.api_key_env
                );
                continue;
            };

            let resolved = backend_config.with_env_overrides(&env);
            match build_adapter(&resolved, &api_key) {
                Ok(adapter) => {
                    info!("Initialized {} backend ({})", resolved.id, resolved.model);
                    adapters.push(adapter);
                }
                Err(e) => warn!("Error initializing {} backend: {}", resolved.id, e),
            }
        }

        Self::from_backends(adapters)
    }

    /// Identities of all active backends, in canonical order.
    pub fn active_backends(&self) -> Vec<BackendId> {
        self.backends.iter().map(|b| b.id().clone()).collect()
    }

    pub fn adapter_for(&self, id: &BackendId) -> Result<Arc<dyn Backend>, CouncilError> {
        self.backends
            .iter()
            .find(|b| b.id() == id)
            .cloned()
            .ok_or_else(|| CouncilError::UnknownBackend(id.to_string()))
    }

    /// All adapters, in canonical order.
    pub fn adapters(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    /// Map a display name (as shown on a posted reply) back to its backend.
    pub fn identify(&self, display_name: &str) -> Option<BackendId> {
        self.backends
            .iter()
            .find(|b| b.profile().display_name == display_name)
            .map(|b| b.id().clone())
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.active_backends())
            .finish()
    }
}

fn build_adapter(config: &BackendConfig, api_key: &str) -> Result<Arc<dyn Backend>, CouncilError> {
    Ok(match config.kind {
        BackendKind::OpenAi => Arc::new(OpenAiCompatibleBackend::new(config, api_key)?),
        BackendKind::Gemini => Arc::new(GeminiBackend::new(config, api_key)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_all_keys_present() {
        let registry = BackendRegistry::from_config_with_env(
            &default_config(),
            env_of(&[
                ("OPENAI_API_KEY", "test-openai-key"),
                ("GOOGLE_API_KEY", "test-google-key"),
                ("XAI_API_KEY", "test-xai-key"),
                ("DOUBAO_API_KEY", "test-doubao-key"),
            ]),
        );

        let ids: Vec<_> = registry.active_backends().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["openai", "gemini", "grok", "doubao"]);
    }

    #[test]
    fn test_no_keys_means_empty_registry() {
        let registry = BackendRegistry::from_config_with_env(&default_config(), env_of(&[]));
        assert!(registry.is_empty());
        assert!(registry.active_backends().is_empty());
    }

    #[test]
    fn test_missing_key_excludes_only_that_backend() {
        let registry = BackendRegistry::from_config_with_env(
            &default_config(),
            env_of(&[("OPENAI_API_KEY", "k"), ("XAI_API_KEY", "k")]),
        );
        assert_eq!(
            registry.active_backends(),
            vec![BackendId::new("openai"), BackendId::new("grok")]
        );
    }

    #[test]
    fn test_adapter_lookup_and_display_config() {
        let registry =
            BackendRegistry::from_config_with_env(&default_config(), env_of(&[("OPENAI_API_KEY", "k")]));

        let adapter = registry.adapter_for(&BackendId::new("openai")).unwrap();
        assert_eq!(adapter.profile().display_name, "GPT-5.2");
        assert_eq!(adapter.profile().icon, ":robot_face:");

        let missing = registry.adapter_for(&BackendId::new("nonexistent"));
        assert!(matches!(missing, Err(CouncilError::UnknownBackend(ref id)) if id == "nonexistent"));
    }

    #[test]
    fn test_identify_by_display_name() {
        let registry = BackendRegistry::from_config_with_env(
            &default_config(),
            env_of(&[("GOOGLE_API_KEY", "k"), ("GEMINI_USERNAME", "Gemini")]),
        );
        assert_eq!(registry.identify("Gemini"), Some(BackendId::new("gemini")));
        assert_eq!(registry.identify("GPT-5.2"), None);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut config = default_config();
        let mut duplicate = config.backends[0].clone();
        duplicate.display_name = "Shadow".to_string();
        config.backends.push(duplicate);

        let registry = BackendRegistry::from_config_with_env(&config, env_of(&[("OPENAI_API_KEY", "k")]));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.identify("GPT-5.2"), Some(BackendId::new("openai")));
    }
}
