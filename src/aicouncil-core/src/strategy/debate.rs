//! Sequential turns over a growing transcript.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{InvocationResult, ModeStrategy, RunContext, invoke};
use crate::error::{CouncilError, ProviderError};
use crate::message::Message;
use crate::mode::Mode;
use crate::orchestrator::CouncilEvent;

/// Backends answer one after another in canonical order.
///
/// Each successful reply is appended to the run's working copy of the
/// transcript before the next backend is asked. A failed or panicking
/// backend simply contributes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebateStrategy;

#[async_trait]
impl ModeStrategy for DebateStrategy {
    fn mode(&self) -> Mode {
        Mode::Debate
    }

    async fn run(&self, ctx: &RunContext<'_>) -> Result<Vec<InvocationResult>, CouncilError> {
        let mut working = ctx.transcript.clone();
        let mut results = Vec::with_capacity(ctx.registry.len());

        for backend in ctx.registry.adapters() {
            if ctx.cancel.is_cancelled() {
                return Err(CouncilError::Cancelled { completed: results });
            }

            let view = ctx.filter.filter(&working, backend.id(), Mode::Debate);
            let system_prompt = ctx
                .prompts
                .render(Mode::Debate, &backend.profile().display_name);

            debug!("Sending {} message(s) to {}", view.len(), backend.id());
            ctx.emit(CouncilEvent::BackendStarted {
                backend: backend.id().clone(),
            });

            let outcome =
                invoke(backend.as_ref(), &system_prompt, &view, ctx.timeout, &ctx.cancel).await;
            if outcome == Err(ProviderError::Cancelled) {
                return Err(CouncilError::Cancelled { completed: results });
            }

            ctx.emit(CouncilEvent::BackendFinished {
                backend: backend.id().clone(),
                success: outcome.is_ok(),
            });

            match &outcome {
                Ok(text) => working.push(Message::backend_reply(backend.id().clone(), text.clone())),
                Err(e) => warn!("{} failed, debate continues without it: {}", backend.id(), e),
            }

            results.push(InvocationResult {
                backend: backend.id().clone(),
                outcome,
            });
        }

        Ok(results)
    }
}
