//! UI-agnostic session state types
//!
//! Plain data shared between the core components and whatever front end
//! renders them. Nothing here depends on a UI framework.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// One message in the conversation, attributed to the user or the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a turn's author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Interaction mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Extend the user's raw text without dialogue framing
    #[default]
    Continuation,
    /// Keep a turn history and frame prompts as a dialogue transcript
    Chat,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Continuation => Mode::Chat,
            Mode::Chat => Mode::Continuation,
        }
    }

    pub fn is_chat(self) -> bool {
        self == Mode::Chat
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Continuation => "Continuation",
            Mode::Chat => "Chat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationState {
    #[default]
    Idle,
    AwaitingResponse,
}

/// Per-call generation options. Never persisted with the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestParameters {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl RequestParameters {
    /// Zero max tokens or a non-finite temperature fall back to the
    /// defaults; temperature is clamped into [0, 1].
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        let max_tokens = if max_tokens == 0 {
            DEFAULT_MAX_TOKENS
        } else {
            max_tokens
        };
        let temperature = if temperature.is_finite() {
            temperature.clamp(0.0, 1.0)
        } else {
            DEFAULT_TEMPERATURE
        };
        Self {
            max_tokens,
            temperature,
        }
    }

    /// Build from raw input text. Unparseable or zero values use the default.
    pub fn from_inputs(max_tokens: &str, temperature: &str) -> Self {
        let max_tokens = max_tokens
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let temperature = temperature
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|v| *v != 0.0)
            .unwrap_or(DEFAULT_TEMPERATURE);
        Self::new(max_tokens, temperature)
    }
}
