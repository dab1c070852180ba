//! One chat session: the explicit instance a front end owns and drives
//!
//! Front ends only call the operations here and render what comes back.
//! They never reach into the history or the mode flag directly.

use std::sync::Arc;

use crate::client::{CompletionBackend, CompletionResponse, CompletionsClient};
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::error::Result;
use crate::mode::ModeController;
use crate::orchestrator::{PendingRequest, RequestOrchestrator, SubmitOutcome};
use crate::state::{Mode, RequestParameters, Turn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Checking,
    Connected,
    Failed(String),
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Checking => "Checking AI server connection...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Failed(_) => "Connection failed",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

pub struct ChatSession {
    backend: Arc<dyn CompletionBackend>,
    base_url: String,
    mode: ModeController,
    store: ConversationStore,
    orchestrator: RequestOrchestrator,
    status: ConnectionStatus,
    // Toggle count when the outstanding request began
    begun_at_switch: u64,
}

impl ChatSession {
    /// Session talking to the server named in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = CompletionsClient::new(&config.base_url, config.timeout())?;
        Ok(Self::with_backend(Arc::new(client), config))
    }

    pub fn with_backend(backend: Arc<dyn CompletionBackend>, config: &Config) -> Self {
        Self {
            backend,
            base_url: config.base_url.clone(),
            mode: ModeController::new(),
            store: ConversationStore::new(config.retention),
            orchestrator: RequestOrchestrator::new(config.template.clone()),
            status: ConnectionStatus::Checking,
            begun_at_switch: 0,
        }
    }

    /// Shared handle to the backend, for running a request on another task
    pub fn backend(&self) -> Arc<dyn CompletionBackend> {
        Arc::clone(&self.backend)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn current_mode(&self) -> Mode {
        self.mode.current_mode()
    }

    pub fn current_mode_label(&self) -> &'static str {
        self.mode.label()
    }

    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn history(&self) -> &[Turn] {
        self.store.turns()
    }

    pub fn is_generating(&self) -> bool {
        self.orchestrator.is_generating()
    }

    /// Flip the mode and return the system messages announcing it.
    pub fn toggle_mode(&mut self) -> Vec<String> {
        match self.mode.toggle(&mut self.store) {
            Mode::Chat => vec![
                "Switched to chat mode".to_string(),
                "I will remember the conversation context".to_string(),
            ],
            Mode::Continuation => vec![
                "Switched to continuation mode".to_string(),
                "I will continue the text you type".to_string(),
            ],
        }
    }

    pub async fn submit_user_message(
        &mut self,
        text: &str,
        params: RequestParameters,
    ) -> SubmitOutcome {
        let backend = Arc::clone(&self.backend);
        let mode = self.mode.current_mode();
        self.orchestrator
            .submit(backend.as_ref(), text, mode, params, &mut self.store)
            .await
    }

    /// First half of a submission, for callers that run the HTTP call on
    /// their own task. Must be paired with [`finish_submit`](Self::finish_submit).
    pub fn begin_submit(&mut self, text: &str, params: RequestParameters) -> Option<PendingRequest> {
        let mode = self.mode.current_mode();
        let pending = self.orchestrator.begin(text, mode, params, &mut self.store)?;
        self.begun_at_switch = self.mode.switches();
        Some(pending)
    }

    /// Settle a request from [`begin_submit`](Self::begin_submit). If the
    /// mode was toggled meanwhile, the history is left as the toggle left it.
    pub fn finish_submit(
        &mut self,
        pending: PendingRequest,
        result: Result<CompletionResponse>,
    ) -> SubmitOutcome {
        if self.mode.switches() == self.begun_at_switch {
            self.orchestrator.finish(pending, result, &mut self.store)
        } else {
            let live_mode = self.mode.current_mode();
            self.orchestrator.finish_detached(pending, result, live_mode)
        }
    }

    /// Probe the server and return the system messages to show.
    pub async fn check_connection(&mut self) -> Vec<String> {
        self.status = ConnectionStatus::Checking;
        let result = self.backend.probe().await;
        self.apply_probe_result(result)
    }

    /// Record a probe result obtained elsewhere (e.g. on a spawned task).
    pub fn apply_probe_result(&mut self, result: Result<()>) -> Vec<String> {
        match result {
            Ok(()) => {
                tracing::info!(base_url = %self.base_url, "connected to AI server");
                self.status = ConnectionStatus::Connected;
                vec![
                    "System started".to_string(),
                    format!("Current mode: {}", self.current_mode_label()),
                    "Use the mode switch to change modes".to_string(),
                ]
            }
            Err(e) => {
                tracing::warn!(base_url = %self.base_url, "connection check failed: {}", e);
                self.status = ConnectionStatus::Failed(e.to_string());
                self.connection_diagnostics()
            }
        }
    }

    fn connection_diagnostics(&self) -> Vec<String> {
        vec![
            "Cannot connect to the AI server. Please check:".to_string(),
            "1. Is llama-server running on the server host?".to_string(),
            "2. Is the network connection working?".to_string(),
            format!("3. Server address: {}", self.base_url),
        ]
    }
}
