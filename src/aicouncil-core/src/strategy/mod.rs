//! The two ways a run can drive its backends.

mod compare;
mod debate;

pub use compare::CompareStrategy;
pub use debate::DebateStrategy;

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::backend::Backend;
use crate::config::PromptsConfig;
use crate::error::{CouncilError, ProviderError};
use crate::filter::ContextFilter;
use crate::message::{BackendId, Transcript};
use crate::mode::Mode;
use crate::orchestrator::{CouncilEvent, EventCallback};
use crate::registry::BackendRegistry;

/// Outcome of asking one backend during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    pub backend: BackendId,
    #[serde(with = "outcome_serde")]
    pub outcome: Result<String, ProviderError>,
}

impl InvocationResult {
    pub fn success(backend: BackendId, text: impl Into<String>) -> Self {
        Self {
            backend,
            outcome: Ok(text.into()),
        }
    }

    pub fn failure(backend: BackendId, error: ProviderError) -> Self {
        Self {
            backend,
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Reply text, if the backend answered.
    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }
}

mod outcome_serde {
    use serde::ser::SerializeMap;
    use serde::{Serialize, Serializer};

    use crate::error::ProviderError;

    #[derive(Serialize)]
    struct Failure<'a> {
        kind: &'a str,
        message: String,
    }

    pub fn serialize<S: Serializer>(
        outcome: &Result<String, ProviderError>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match outcome {
            Ok(text) => map.serialize_entry("success", text)?,
            Err(error) => map.serialize_entry(
                "failure",
                &Failure {
                    kind: error.kind(),
                    message: error.to_string(),
                },
            )?,
        }
        map.end()
    }
}

/// Everything one run needs, borrowed from the orchestrator for its duration.
pub struct RunContext<'a> {
    pub transcript: &'a Transcript,
    pub registry: &'a BackendRegistry,
    pub filter: &'a ContextFilter,
    pub prompts: &'a PromptsConfig,
    /// Upper bound on each backend call.
    pub timeout: Duration,
    pub cancel: CancellationToken,
    pub events: Option<EventCallback>,
}

impl RunContext<'_> {
    pub(crate) fn emit(&self, event: CouncilEvent) {
        emit(&self.events, event);
    }
}

pub(crate) fn emit(events: &Option<EventCallback>, event: CouncilEvent) {
    if let Some(callback) = events {
        callback(event);
    }
}

/// A dispatch strategy over all active backends.
#[async_trait]
pub trait ModeStrategy: Send + Sync {
    fn mode(&self) -> Mode;

    /// Ask every active backend once and return one result per backend in
    /// canonical order.
    async fn run(&self, ctx: &RunContext<'_>) -> Result<Vec<InvocationResult>, CouncilError>;
}

/// Get the strategy implementing `mode`.
pub fn strategy_for(mode: Mode) -> Box<dyn ModeStrategy> {
    match mode {
        Mode::Compare => Box::new(CompareStrategy),
        Mode::Debate => Box::new(DebateStrategy),
    }
}

/// Call one backend, bounded by `timeout` and abandoned on `cancel`.
///
/// A panic inside the adapter is reported as [`ProviderError::TaskFailed`]
/// for that backend alone.
pub(crate) async fn invoke(
    backend: &dyn Backend,
    system_prompt: &str,
    transcript: &Transcript,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, ProviderError> {
    let call = AssertUnwindSafe(backend.generate(system_prompt, transcript))
        .catch_unwind()
        .map(|caught| {
            caught.unwrap_or_else(|payload| {
                Err(ProviderError::TaskFailed(panic_message(payload.as_ref())))
            })
        });

    tokio::select! {
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        outcome = tokio::time::timeout(timeout, call) => {
            outcome.unwrap_or(Err(ProviderError::Timeout(timeout)))
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "backend panicked".to_string()
    }
}
