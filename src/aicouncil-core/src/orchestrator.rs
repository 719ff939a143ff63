//! Council orchestration.
//!
//! Resolves the mode for a request, checks that there is someone to ask,
//! and hands the run to the matching strategy.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, PromptsConfig};
use crate::error::CouncilError;
use crate::filter::ContextFilter;
use crate::message::{BackendId, Transcript};
use crate::mode::{Mode, ModeState};
use crate::registry::BackendRegistry;
use crate::strategy::{self, InvocationResult, RunContext, emit, invoke};

/// One request from the transport layer.
#[derive(Debug, Clone)]
pub struct CouncilRequest {
    /// The thread so far, with prior replies tagged by backend.
    pub transcript: Transcript,
    /// Raw one-off mode override as the user typed it (e.g. "debate").
    pub mode_override: Option<String>,
}

impl CouncilRequest {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            mode_override: None,
        }
    }

    pub fn with_mode_override(mut self, mode: impl Into<String>) -> Self {
        self.mode_override = Some(mode.into());
        self
    }
}

/// Callback for council events.
pub type EventCallback = Arc<dyn Fn(CouncilEvent) + Send + Sync>;

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouncilEvent {
    /// A run is starting with these backends, in canonical order.
    RunStarted { mode: Mode, backends: Vec<BackendId> },
    /// A backend is about to be asked.
    BackendStarted { backend: BackendId },
    /// A backend has answered or failed.
    BackendFinished { backend: BackendId, success: bool },
    /// Every backend has been accounted for.
    RunFinished,
}

/// Entry point used by a transport.
pub struct CouncilOrchestrator {
    registry: Arc<BackendRegistry>,
    filter: ContextFilter,
    prompts: PromptsConfig,
    mode: ModeState,
    timeout: Duration,
    callback: Option<EventCallback>,
}

impl CouncilOrchestrator {
    pub fn new(registry: Arc<BackendRegistry>, default_mode: Mode) -> Self {
        Self {
            registry,
            filter: ContextFilter::new(),
            prompts: PromptsConfig::default(),
            mode: ModeState::new(default_mode),
            timeout: Duration::from_secs(120),
            callback: None,
        }
    }

    /// Build an orchestrator whose mode, timeout and prompts come from `config`.
    pub fn from_config(config: &Config, registry: Arc<BackendRegistry>) -> Self {
        Self::new(registry, config.council.default_mode)
            .with_timeout(config.council.timeout())
            .with_prompts(config.prompts.clone())
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptsConfig) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set a callback for council events.
    pub fn with_callback(mut self, callback: EventCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Get the global mode.
    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    /// Set the global mode; applies to runs that start afterwards.
    pub fn set_mode(&self, mode: Mode) {
        info!("Global mode set to {}", mode);
        self.mode.set(mode);
    }

    /// Run a request to completion.
    pub async fn run(&self, request: CouncilRequest) -> Result<Vec<InvocationResult>, CouncilError> {
        self.run_with_cancellation(request, CancellationToken::new()).await
    }

    /// Run a request that can be abandoned through `cancel`.
    ///
    /// On cancellation every in-flight call is stopped and
    /// [`CouncilError::Cancelled`] carries the results of the backends that
    /// had already finished.
    pub async fn run_with_cancellation(
        &self,
        request: CouncilRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<InvocationResult>, CouncilError> {
        let mode = self.resolve_mode(request.mode_override.as_deref())?;

        let backends = self.registry.active_backends();
        if backends.is_empty() {
            return Err(CouncilError::NoBackendsConfigured);
        }
        if !request.transcript.has_user_message() {
            return Err(CouncilError::EmptyTranscript);
        }

        info!(
            "Starting {} run with {} backend(s), {} message(s) in thread",
            mode,
            backends.len(),
            request.transcript.len()
        );
        emit(
            &self.callback,
            CouncilEvent::RunStarted { mode, backends },
        );

        let ctx = RunContext {
            transcript: &request.transcript,
            registry: &self.registry,
            filter: &self.filter,
            prompts: &self.prompts,
            timeout: self.timeout,
            cancel,
            events: self.callback.clone(),
        };

        let results = strategy::strategy_for(mode).run(&ctx).await?;

        info!(
            "{} run finished: {}/{} backend(s) succeeded",
            mode,
            results.iter().filter(|r| r.is_success()).count(),
            results.len()
        );
        emit(&self.callback, CouncilEvent::RunFinished);
        Ok(results)
    }

    /// Ask a single backend to follow up, isolated from its peers.
    pub async fn follow_up(
        &self,
        transcript: &Transcript,
        backend: &BackendId,
    ) -> Result<InvocationResult, CouncilError> {
        let adapter = self.registry.adapter_for(backend)?;
        if !transcript.has_user_message() {
            return Err(CouncilError::EmptyTranscript);
        }

        let view = self.filter.filter(transcript, backend, Mode::Compare);
        let system_prompt = self
            .prompts
            .render(Mode::Compare, &adapter.profile().display_name);

        emit(
            &self.callback,
            CouncilEvent::BackendStarted {
                backend: backend.clone(),
            },
        );
        let outcome = invoke(
            adapter.as_ref(),
            &system_prompt,
            &view,
            self.timeout,
            &CancellationToken::new(),
        )
        .await;
        if let Err(e) = &outcome {
            warn!("{} follow-up failed: {}", backend, e);
        }
        emit(
            &self.callback,
            CouncilEvent::BackendFinished {
                backend: backend.clone(),
                success: outcome.is_ok(),
            },
        );

        Ok(InvocationResult {
            backend: backend.clone(),
            outcome,
        })
    }

    fn resolve_mode(&self, mode_override: Option<&str>) -> Result<Mode, CouncilError> {
        match mode_override {
            Some(raw) => {
                let mode = raw.parse()?;
                info!("Using inline mode '{}' for this request", mode);
                Ok(mode)
            }
            None => Ok(self.mode.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mode_prefers_override() {
        let orchestrator = CouncilOrchestrator::new(Arc::new(BackendRegistry::default()), Mode::Compare);
        assert_eq!(orchestrator.resolve_mode(None).unwrap(), Mode::Compare);
        assert_eq!(orchestrator.resolve_mode(Some("debate")).unwrap(), Mode::Debate);
        assert_eq!(orchestrator.mode(), Mode::Compare);
    }

    #[test]
    fn test_resolve_mode_rejects_unknown_override() {
        let orchestrator = CouncilOrchestrator::new(Arc::new(BackendRegistry::default()), Mode::Debate);
        let err = orchestrator.resolve_mode(Some("shout")).unwrap_err();
        assert!(matches!(err, CouncilError::InvalidMode(ref v) if v == "shout"));
    }

    #[test]
    fn test_set_mode_is_global() {
        let orchestrator = CouncilOrchestrator::new(Arc::new(BackendRegistry::default()), Mode::Compare);
        orchestrator.set_mode(Mode::Debate);
        assert_eq!(orchestrator.mode(), Mode::Debate);
        assert_eq!(orchestrator.resolve_mode(None).unwrap(), Mode::Debate);
    }

    #[test]
    fn test_from_config_applies_settings() {
        let mut config = crate::config::default_config();
        config.council.default_mode = Mode::Debate;
        config.council.timeout_secs = 5;

        let orchestrator =
            CouncilOrchestrator::from_config(&config, Arc::new(BackendRegistry::default()));
        assert_eq!(orchestrator.mode(), Mode::Debate);
        assert_eq!(orchestrator.timeout, Duration::from_secs(5));
    }
}
