pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod mode;
pub mod orchestrator;
pub mod session;
pub mod state;
pub mod template;

// Re-export main types for convenience
pub use client::{CompletionBackend, CompletionRequest, CompletionResponse, CompletionsClient};
pub use config::Config;
pub use conversation::{ConversationStore, RetentionPolicy};
pub use error::{ChatError, Result};
pub use mode::ModeController;
pub use orchestrator::{PendingRequest, RequestOrchestrator, SubmitOutcome};
pub use session::{ChatSession, ConnectionStatus};
pub use state::{GenerationState, Mode, RequestParameters, Role, Turn};
pub use template::PromptTemplate;
