use crate::conversation::ConversationStore;
use crate::state::Mode;

/// Owns the active mode. Leaving chat mode wipes the history so earlier
/// dialogue cannot leak into a plain continuation.
#[derive(Debug, Clone, Default)]
pub struct ModeController {
    mode: Mode,
    switches: u64,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_mode(&self) -> Mode {
        self.mode
    }

    pub fn label(&self) -> &'static str {
        self.mode.label()
    }

    /// Number of toggles so far
    pub fn switches(&self) -> u64 {
        self.switches
    }

    pub fn toggle(&mut self, store: &mut ConversationStore) -> Mode {
        self.mode = self.mode.toggled();
        self.switches += 1;
        if self.mode == Mode::Continuation {
            store.clear();
        }
        tracing::info!(mode = self.mode.label(), "mode toggled");
        self.mode
    }
}
