//! Concurrent, isolated fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use super::{InvocationResult, ModeStrategy, RunContext, emit, invoke};
use crate::error::{CouncilError, ProviderError};
use crate::mode::Mode;
use crate::orchestrator::CouncilEvent;

/// Every backend answers at once, each from its own isolated view.
///
/// Views are built before anything is spawned, so no backend can see a
/// reply a peer produces during the same run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareStrategy;

#[async_trait]
impl ModeStrategy for CompareStrategy {
    fn mode(&self) -> Mode {
        Mode::Compare
    }

    async fn run(&self, ctx: &RunContext<'_>) -> Result<Vec<InvocationResult>, CouncilError> {
        // Cancelled when this run finishes or its future is dropped.
        let run_token = ctx.cancel.child_token();
        let _cancel_on_drop = run_token.clone().drop_guard();

        let mut backends = Vec::with_capacity(ctx.registry.len());
        let mut handles = Vec::with_capacity(ctx.registry.len());

        for backend in ctx.registry.adapters() {
            let backend = Arc::clone(backend);
            let view = ctx.filter.filter(ctx.transcript, backend.id(), Mode::Compare);
            let system_prompt = ctx
                .prompts
                .render(Mode::Compare, &backend.profile().display_name);
            let timeout = ctx.timeout;
            let token = run_token.clone();
            let events = ctx.events.clone();

            debug!("Sending {} message(s) to {}", view.len(), backend.id());
            ctx.emit(CouncilEvent::BackendStarted {
                backend: backend.id().clone(),
            });
            backends.push(backend.id().clone());

            handles.push(tokio::spawn(async move {
                let outcome = invoke(backend.as_ref(), &system_prompt, &view, timeout, &token).await;
                emit(
                    &events,
                    CouncilEvent::BackendFinished {
                        backend: backend.id().clone(),
                        success: outcome.is_ok(),
                    },
                );
                outcome
            }));
        }

        let joined = join_all(handles).await;

        let results: Vec<InvocationResult> = backends
            .into_iter()
            .zip(joined)
            .map(|(backend, joined)| {
                let outcome =
                    joined.unwrap_or_else(|e| Err(ProviderError::TaskFailed(e.to_string())));
                if let Err(e) = &outcome {
                    warn!("{} failed: {}", backend, e);
                }
                InvocationResult { backend, outcome }
            })
            .collect();

        if ctx.cancel.is_cancelled() {
            let completed = results
                .into_iter()
                .filter(|r| r.outcome != Err(ProviderError::Cancelled))
                .collect();
            return Err(CouncilError::Cancelled { completed });
        }

        Ok(results)
    }
}
