//! Request lifecycle: at most one completion request in flight
//!
//! A submission runs in three steps. [`RequestOrchestrator::begin`] flips to
//! `AwaitingResponse` synchronously and builds the request body,
//! the caller performs the HTTP call (inline or on a spawned task), and
//! [`RequestOrchestrator::finish`] records the outcome and always returns the
//! orchestrator to `Idle`. [`RequestOrchestrator::submit`] does all three.

use regex::Regex;

use crate::client::{CompletionBackend, CompletionRequest, CompletionResponse};
use crate::conversation::ConversationStore;
use crate::error::{ChatError, Result};
use crate::state::{GenerationState, Mode, RequestParameters, Turn};
use crate::template::PromptTemplate;

/// A request that has been started but not yet settled
#[derive(Debug)]
pub struct PendingRequest {
    request: CompletionRequest,
    mode: Mode,
    rollback: Option<Vec<Turn>>,
}

impl PendingRequest {
    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Empty input, or a request was already in flight
    Ignored,
    /// Cleaned model output
    Reply(String),
    /// Error text, shown as a system message
    Failed(String),
}

#[derive(Debug)]
pub struct RequestOrchestrator {
    state: GenerationState,
    template: PromptTemplate,
    echo_pattern: Option<Regex>,
}

impl Default for RequestOrchestrator {
    fn default() -> Self {
        Self::new(PromptTemplate::default())
    }
}

impl RequestOrchestrator {
    pub fn new(template: PromptTemplate) -> Self {
        let echo_pattern = template.echo_pattern();
        Self {
            state: GenerationState::Idle,
            template,
            echo_pattern,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn is_generating(&self) -> bool {
        self.state == GenerationState::AwaitingResponse
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Start a request. Returns `None` without touching any state when the
    /// message is blank or a request is already outstanding.
    pub fn begin(
        &mut self,
        message: &str,
        mode: Mode,
        params: RequestParameters,
        store: &mut ConversationStore,
    ) -> Option<PendingRequest> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        if self.is_generating() {
            tracing::debug!("submission dropped: request already in flight");
            return None;
        }

        self.state = GenerationState::AwaitingResponse;

        let (request, rollback) = match mode {
            Mode::Chat => {
                let rollback = store.snapshot();
                store.append(Turn::user(message));
                let request = CompletionRequest {
                    prompt: store.build_chat_prompt(&self.template),
                    max_tokens: params.max_tokens,
                    temperature: params.temperature.min(self.template.chat_temperature_ceiling),
                    stop: self.template.chat_stop.clone(),
                };
                (request, Some(rollback))
            }
            Mode::Continuation => {
                let request = CompletionRequest {
                    prompt: message.to_string(),
                    max_tokens: params.max_tokens,
                    temperature: params.temperature,
                    stop: self.template.continuation_stop.clone(),
                };
                (request, None)
            }
        };

        tracing::info!(
            mode = mode.label(),
            prompt_len = request.prompt.len(),
            "completion request started"
        );

        Some(PendingRequest {
            request,
            mode,
            rollback,
        })
    }

    /// Settle a request started by [`begin`](Self::begin). Always leaves the
    /// orchestrator `Idle`. On failure the history is put back exactly as it
    /// was before `begin`.
    pub fn finish(
        &mut self,
        pending: PendingRequest,
        result: Result<CompletionResponse>,
        store: &mut ConversationStore,
    ) -> SubmitOutcome {
        let mode = pending.mode;
        self.settle(pending, result, mode, Some(store))
    }

    /// Settle a request after the mode was switched while it was in flight.
    /// The history it was built from is gone, so it is neither extended nor
    /// rolled back; the reply is cleaned for `live_mode`.
    pub fn finish_detached(
        &mut self,
        pending: PendingRequest,
        result: Result<CompletionResponse>,
        live_mode: Mode,
    ) -> SubmitOutcome {
        tracing::debug!(
            started_in = pending.mode.label(),
            live_mode = live_mode.label(),
            "mode switched while request was in flight"
        );
        self.settle(pending, result, live_mode, None)
    }

    fn settle(
        &mut self,
        pending: PendingRequest,
        result: Result<CompletionResponse>,
        mode: Mode,
        store: Option<&mut ConversationStore>,
    ) -> SubmitOutcome {
        self.state = GenerationState::Idle;

        let text = result.and_then(|response| response.first_text().map(str::to_owned));

        match text {
            Ok(text) => {
                let reply = self.clean_reply(&text, mode);
                if let (true, Some(store)) = (mode.is_chat(), store) {
                    store.append(Turn::assistant(reply.clone()));
                }
                tracing::info!(reply_len = reply.len(), "completion request finished");
                SubmitOutcome::Reply(reply)
            }
            Err(e) => {
                if let (Some(turns), Some(store)) = (pending.rollback, store) {
                    store.restore(turns);
                }
                tracing::warn!("completion request failed: {}", e);
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run a full request cycle against `backend`.
    pub async fn submit<B>(
        &mut self,
        backend: &B,
        message: &str,
        mode: Mode,
        params: RequestParameters,
        store: &mut ConversationStore,
    ) -> SubmitOutcome
    where
        B: CompletionBackend + ?Sized,
    {
        let Some(pending) = self.begin(message, mode, params, store) else {
            return SubmitOutcome::Ignored;
        };

        let request = pending.request.clone();
        let mut in_flight = InFlight {
            orchestrator: self,
            store,
            pending: Some(pending),
        };

        let result = backend.complete(&request).await;
        in_flight.settle(result)
    }

    /// Trim the model output and, in chat mode, drop one echoed role label.
    pub fn clean_reply(&self, text: &str, mode: Mode) -> String {
        let text = text.trim();
        if !mode.is_chat() {
            return text.to_string();
        }

        match &self.echo_pattern {
            Some(re) => re.replace(text, "").trim().to_string(),
            None => text.to_string(),
        }
    }
}

/// Settles the pending request as cancelled if the submitting future is
/// dropped before the response arrives.
struct InFlight<'a> {
    orchestrator: &'a mut RequestOrchestrator,
    store: &'a mut ConversationStore,
    pending: Option<PendingRequest>,
}

impl InFlight<'_> {
    fn settle(&mut self, result: Result<CompletionResponse>) -> SubmitOutcome {
        match self.pending.take() {
            Some(pending) => self.orchestrator.finish(pending, result, self.store),
            None => SubmitOutcome::Ignored,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.pending.is_some() {
            self.settle(Err(ChatError::Cancelled));
        }
    }
}
