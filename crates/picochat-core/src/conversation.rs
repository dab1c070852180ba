//! Bounded chat history and the prompt built from it

use serde::{Deserialize, Serialize};

use crate::state::{Role, Turn};
use crate::template::PromptTemplate;

/// How much history survives an append.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Trim once the history grows past this many turns
    pub max_turns: usize,
    /// Number of most recent turns kept by a trim
    pub keep_turns: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_turns: 8,
            keep_turns: 6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
    policy: RetentionPolicy,
}

impl ConversationStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            turns: Vec::new(),
            policy,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);

        if self.turns.len() > self.policy.max_turns {
            // A trim must land at or under the maximum
            let keep = self.policy.keep_turns.min(self.policy.max_turns);
            let dropped = self.turns.len() - keep;
            self.turns.drain(..dropped);
            tracing::debug!(dropped, kept = self.turns.len(), "trimmed chat history");
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Copy of the current history, for putting it back after a failed request
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn restore(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    /// Render the history as a dialogue prompt. The pending user message is
    /// expected to be the last turn already.
    pub fn build_chat_prompt(&self, template: &PromptTemplate) -> String {
        let user = &template.user_label;
        let assistant = &template.assistant_label;

        if self.turns.len() <= 1 {
            let message = self
                .turns
                .first()
                .map(|t| t.content.as_str())
                .unwrap_or_default();
            return format!(
                "{}\n\n{}: {}\n\n{}:",
                template.greeting_preamble, user, message, assistant
            );
        }

        let mut prompt = String::new();
        prompt.push_str(&template.dialogue_preamble);
        prompt.push_str("\n\n");

        let (last, earlier) = match self.turns.split_last() {
            Some(split) => split,
            None => return prompt,
        };

        for turn in earlier {
            let label = match turn.role {
                Role::User => user,
                Role::Assistant => assistant,
            };
            prompt.push_str(&format!("{}: {}\n\n", label, turn.content));
        }

        // The model completes starting right after the trailing "AI: "
        prompt.push_str(&format!("{}: {}\n\n{}: ", user, last.content, assistant));

        prompt
    }
}
