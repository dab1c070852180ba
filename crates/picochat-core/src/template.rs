//! Prompt format literals
//!
//! The role labels, preambles and stop sequences are a contract with the
//! few-shot format the remote model expects. They live here as data so they
//! can be tuned from the config file without touching prompt logic.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PromptTemplate {
    /// Opens a chat that has no prior turns
    pub greeting_preamble: String,
    /// Opens a chat that replays earlier turns
    pub dialogue_preamble: String,
    pub user_label: String,
    pub assistant_label: String,
    /// Includes `"AI:"` to stop the model speaking the next turn. Update it
    /// together with `assistant_label`; it is not derived from the label.
    pub chat_stop: Vec<String>,
    pub continuation_stop: Vec<String>,
    /// Labels the model may echo at the start of a chat reply
    pub echo_labels: Vec<String>,
    pub chat_temperature_ceiling: f32,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            greeting_preamble: "You are a helpful AI assistant. Please talk with the user in a natural, friendly conversational style.".to_string(),
            dialogue_preamble: "Please continue the following dialogue:".to_string(),
            user_label: "User".to_string(),
            assistant_label: "AI".to_string(),
            chat_stop: ["用户:", "AI:", "\n\n", "。", "！", "？"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            continuation_stop: ["\n\n", "。", "！", "？"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            echo_labels: ["AI", "assistant", "bot"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            chat_temperature_ceiling: 0.8,
        }
    }
}

impl PromptTemplate {
    /// Case-insensitive `^(label1|label2|...):\s*` over the echo labels.
    /// Returns `None` when there is nothing to strip.
    pub fn echo_pattern(&self) -> Option<Regex> {
        let labels: Vec<String> = self
            .echo_labels
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| regex::escape(l))
            .collect();

        if labels.is_empty() {
            return None;
        }

        let pattern = format!(r"(?i)^(?:{}):\s*", labels.join("|"));
        match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("invalid echo label pattern {:?}: {}", pattern, e);
                None
            }
        }
    }
}
