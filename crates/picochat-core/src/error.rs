use thiserror::Error;

/// Everything that can go wrong talking to the completions server.
///
/// None of these are fatal: the session reports them as system messages
/// and returns to a submittable state.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Cannot reach the AI server: {0}")]
    Connectivity(String),

    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request task failed: {0}")]
    Task(String),

    #[error("Request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ChatError>;
