use picochat_core::{
    ChatError, ChatSession, CompletionResponse, Config, Mode, PendingRequest, RequestParameters,
    SubmitOutcome,
};
use tokio::task::JoinHandle;

const TEMPERATURE_STEP: f32 = 0.1;
const MAX_TOKENS_STEP: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
    System,
}

/// One entry in the on-screen message log
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub kind: MessageKind,
    pub content: String,
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,
    pub params: RequestParameters,

    // Input box
    pub input: String,
    pub cursor: usize, // char index into input

    // Message log
    pub messages: Vec<LogMessage>,
    pub placeholder: Option<usize>, // index of the "Thinking..." entry
    pub scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Background work
    pub query_task: Option<JoinHandle<picochat_core::Result<CompletionResponse>>>,
    pub pending: Option<PendingRequest>,
    pub probe_task: Option<JoinHandle<picochat_core::Result<()>>>,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let session = ChatSession::new(config)?;

        Ok(Self {
            should_quit: false,
            session,
            params: config.request_parameters(),

            input: String::new(),
            cursor: 0,

            messages: Vec::new(),
            placeholder: None,
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,

            query_task: None,
            pending: None,
            probe_task: None,
        })
    }

    /// Kick off the `/models` probe on a background task
    pub fn start_connection_check(&mut self) {
        let backend = self.session.backend();
        self.probe_task = Some(tokio::spawn(async move { backend.probe().await }));
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_generating()
    }

    pub fn can_send(&self) -> bool {
        !self.input.trim().is_empty() && !self.is_busy()
    }

    pub fn send_message(&mut self) {
        if !self.can_send() {
            return;
        }

        let text = self.input.trim().to_string();
        let Some(pending) = self.session.begin_submit(&text, self.params) else {
            return;
        };

        self.push_message(MessageKind::User, text);
        self.input.clear();
        self.cursor = 0;

        let waiting = match pending.mode() {
            Mode::Chat => "Thinking",
            Mode::Continuation => "Generating",
        };
        self.placeholder = Some(self.messages.len());
        self.push_message(MessageKind::Assistant, waiting.to_string());

        let backend = self.session.backend();
        let request = pending.request().clone();
        self.query_task = Some(tokio::spawn(async move { backend.complete(&request).await }));
        self.pending = Some(pending);
    }

    pub fn toggle_mode(&mut self) {
        for message in self.session.toggle_mode() {
            self.push_message(MessageKind::System, message);
        }
    }

    /// Collect results from background tasks that have finished
    pub async fn poll_tasks(&mut self) {
        if self.query_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let (Some(task), Some(pending)) = (self.query_task.take(), self.pending.take()) {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(ChatError::Task(e.to_string())),
                };
                let outcome = self.session.finish_submit(pending, result);
                self.settle_placeholder(outcome);
            }
        }

        if self.probe_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.probe_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(ChatError::Task(e.to_string())),
                };
                for message in self.session.apply_probe_result(result) {
                    self.push_message(MessageKind::System, message);
                }
            }
        }
    }

    fn settle_placeholder(&mut self, outcome: SubmitOutcome) {
        let Some(idx) = self.placeholder.take() else {
            return;
        };
        if idx >= self.messages.len() {
            return;
        }

        match outcome {
            SubmitOutcome::Reply(text) => {
                self.messages[idx] = LogMessage {
                    kind: MessageKind::Assistant,
                    content: text,
                };
            }
            SubmitOutcome::Failed(error) => {
                self.messages[idx] = LogMessage {
                    kind: MessageKind::System,
                    content: format!("Sorry, something went wrong: {}", error),
                };
            }
            SubmitOutcome::Ignored => {
                self.messages.remove(idx);
            }
        }
        self.scroll_to_bottom();
    }

    pub fn push_message(&mut self, kind: MessageKind, content: String) {
        self.messages.push(LogMessage { kind, content });
        self.scroll_to_bottom();
    }

    pub fn adjust_temperature(&mut self, steps: i32) {
        let temperature = self.params.temperature + TEMPERATURE_STEP * steps as f32;
        // Round to one decimal so repeated steps don't drift
        let temperature = (temperature * 10.0).round() / 10.0;
        self.params = RequestParameters::new(self.params.max_tokens, temperature);
    }

    pub fn adjust_max_tokens(&mut self, steps: i32) {
        let max_tokens = i64::from(self.params.max_tokens) + MAX_TOKENS_STEP * i64::from(steps);
        let max_tokens = max_tokens.clamp(MAX_TOKENS_STEP, 4096) as u32;
        self.params = RequestParameters::new(max_tokens, self.params.temperature);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_lines().saturating_sub(self.visible_height());
        self.scroll = self.scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.total_lines().saturating_sub(self.visible_height());
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered height of the log: a label line, the wrapped content and a
    /// blank separator per message.
    pub fn total_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: usize = 0;
        for msg in &self.messages {
            total += 1;
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                total += char_count / wrap_width + 1;
            }
            total += 1;
        }

        total.min(u16::MAX as usize) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Nothing listens on the discard port, so requests fail fast
    fn unreachable_app() -> App {
        let mut config = Config::new();
        config.base_url = "http://127.0.0.1:9/v1".to_string();
        config.timeout_secs = 5;
        App::new(&config).unwrap()
    }

    async fn wait_until_idle(app: &mut App) {
        for _ in 0..250 {
            app.poll_tasks().await;
            if !app.is_busy() && app.probe_task.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("request never settled");
    }

    #[tokio::test]
    async fn test_failed_request_becomes_system_message() {
        let mut app = unreachable_app();
        app.toggle_mode();
        app.messages.clear();
        app.input = "Hello".to_string();

        app.send_message();
        assert!(app.is_busy());
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.session.history().len(), 1);

        // Dropped while the first request is outstanding
        app.input = "Again".to_string();
        app.send_message();
        assert_eq!(app.messages.len(), 2);

        wait_until_idle(&mut app).await;

        assert_eq!(app.messages[1].kind, MessageKind::System);
        assert!(app.messages[1].content.starts_with("Sorry, something went wrong"));
        assert!(app.session.history().is_empty());
        assert!(app.placeholder.is_none());
    }

    #[tokio::test]
    async fn test_failed_probe_shows_diagnostics() {
        let mut app = unreachable_app();
        app.start_connection_check();
        wait_until_idle(&mut app).await;

        assert!(!app.session.connection_status().is_connected());
        assert_eq!(app.messages.len(), 4);
        assert!(app.messages.iter().all(|m| m.kind == MessageKind::System));
    }

    #[test]
    fn test_scroll_stays_in_range() {
        let mut app = App::new(&Config::new()).unwrap();
        app.chat_height = 4;
        app.chat_width = 20;
        for i in 0..5 {
            app.push_message(MessageKind::System, format!("line {}", i));
        }
        // 5 messages * 3 lines each
        assert_eq!(app.total_lines(), 15);
        assert_eq!(app.scroll, 11);

        app.scroll_down(10);
        assert_eq!(app.scroll, 11);
        app.scroll_up(20);
        assert_eq!(app.scroll, 0);
    }
}
