use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use picochat_core::{
    ChatError, ChatSession, CompletionBackend, CompletionRequest, CompletionResponse, Config,
    ConnectionStatus, Mode, RequestParameters, Result, Role, SubmitOutcome,
};

enum Scripted {
    Reply(&'static str),
    Status(u16),
    NoChoices,
    Hang,
}

/// Backend that answers from a script and remembers every request it saw
#[derive(Default)]
struct FakeServer {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<CompletionRequest>>,
    reachable: bool,
}

impl FakeServer {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
            reachable: true,
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for FakeServer {
    async fn probe(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(ChatError::Connectivity("connection refused".to_string()))
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.seen.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(text)) => Ok(CompletionResponse::from_text(text)),
            Some(Scripted::Status(status)) => Err(ChatError::Http { status }),
            Some(Scripted::NoChoices) => Ok(CompletionResponse { choices: Vec::new() }),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(ChatError::Connectivity("connection reset".to_string())),
        }
    }
}

fn chat_session(server: &Arc<FakeServer>) -> ChatSession {
    let mut session = ChatSession::with_backend(server.clone(), &Config::new());
    session.toggle_mode();
    assert_eq!(session.current_mode(), Mode::Chat);
    session
}

#[tokio::test]
async fn test_chat_exchange_records_both_turns() {
    let server = FakeServer::new(vec![Scripted::Reply(" AI: I'm fine, thanks. ")]);
    let mut session = chat_session(&server);

    let outcome = session
        .submit_user_message("How are you?", RequestParameters::default())
        .await;

    assert_eq!(outcome, SubmitOutcome::Reply("I'm fine, thanks.".to_string()));
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].content, "I'm fine, thanks.");
    assert!(!session.is_generating());
}

#[tokio::test]
async fn test_second_turn_prompt_replays_dialogue() {
    let server = FakeServer::new(vec![Scripted::Reply("Hello!"), Scripted::Reply("Good.")]);
    let mut session = chat_session(&server);

    session.submit_user_message("Hi", RequestParameters::default()).await;
    session
        .submit_user_message("How are you?", RequestParameters::default())
        .await;

    let requests = server.requests();
    assert!(requests[0].prompt.ends_with("User: Hi\n\nAI:"));
    assert_eq!(
        requests[1].prompt,
        "Please continue the following dialogue:\n\nUser: Hi\n\nAI: Hello!\n\nUser: How are you?\n\nAI: "
    );
}

#[tokio::test]
async fn test_temperature_capped_only_in_chat() {
    let server = FakeServer::new(vec![Scripted::Reply("a"), Scripted::Reply("b")]);
    let mut session = chat_session(&server);
    let hot = RequestParameters::new(200, 0.95);

    session.submit_user_message("chat", hot).await;
    session.toggle_mode();
    session.submit_user_message("story", hot).await;

    let requests = server.requests();
    assert_eq!(requests[0].temperature, 0.8);
    assert_eq!(requests[1].temperature, 0.95);
    assert_eq!(requests[1].prompt, "story");
    assert_eq!(requests[1].max_tokens, 200);
}

#[tokio::test]
async fn test_continuation_keeps_no_history() {
    let server = FakeServer::new(vec![Scripted::Reply("AI: and then it rained")]);
    let mut session = ChatSession::with_backend(server.clone(), &Config::new());

    let outcome = session
        .submit_user_message("It was a dark night", RequestParameters::default())
        .await;

    // Echo stripping is chat-only
    assert_eq!(outcome, SubmitOutcome::Reply("AI: and then it rained".to_string()));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_network_failure_leaves_history_unchanged() {
    let server = FakeServer::new(vec![Scripted::Reply("Hello!")]);
    let mut session = chat_session(&server);
    session.submit_user_message("Hi", RequestParameters::default()).await;
    let before = session.history().to_vec();

    // Script is exhausted, so the next call fails at the transport level
    let outcome = session
        .submit_user_message("Still there?", RequestParameters::default())
        .await;

    assert!(matches!(outcome, SubmitOutcome::Failed(ref msg) if msg.contains("connection reset")));
    assert_eq!(session.history(), before.as_slice());
    assert!(!session.is_generating());
}

#[tokio::test]
async fn test_http_and_malformed_errors_are_reported() {
    let server = FakeServer::new(vec![Scripted::Status(503), Scripted::NoChoices]);
    let mut session = chat_session(&server);

    let first = session.submit_user_message("one", RequestParameters::default()).await;
    let second = session.submit_user_message("two", RequestParameters::default()).await;

    assert_eq!(first, SubmitOutcome::Failed("HTTP error: 503".to_string()));
    assert!(matches!(second, SubmitOutcome::Failed(ref msg) if msg.starts_with("Malformed response")));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_submit_while_awaiting_is_dropped() {
    let server = FakeServer::new(vec![Scripted::Reply("late reply")]);
    let mut session = chat_session(&server);

    let pending = session
        .begin_submit("first", RequestParameters::default())
        .unwrap();
    let history_len = session.history().len();

    let outcome = session
        .submit_user_message("second", RequestParameters::default())
        .await;

    assert_eq!(outcome, SubmitOutcome::Ignored);
    assert!(server.requests().is_empty());
    assert_eq!(session.history().len(), history_len);
    assert!(session.is_generating());

    let result = server.complete(pending.request()).await;
    let outcome = session.finish_submit(pending, result);
    assert_eq!(outcome, SubmitOutcome::Reply("late reply".to_string()));
    assert!(!session.is_generating());
}

#[tokio::test]
async fn test_blank_submission_is_ignored() {
    let server = FakeServer::new(vec![]);
    let mut session = chat_session(&server);

    let outcome = session.submit_user_message(" \t\n", RequestParameters::default()).await;

    assert_eq!(outcome, SubmitOutcome::Ignored);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_submission_returns_to_idle() {
    let server = FakeServer::new(vec![Scripted::Hang]);
    let mut session = chat_session(&server);

    let submit = session.submit_user_message("hello?", RequestParameters::default());
    let timed_out = tokio::time::timeout(Duration::from_millis(20), submit).await;

    assert!(timed_out.is_err());
    assert!(!session.is_generating());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_history_stays_bounded_over_long_chat() {
    let replies = (0..9).map(|_| Scripted::Reply("ok")).collect();
    let server = FakeServer::new(replies);
    let mut session = chat_session(&server);

    for i in 0..9 {
        session
            .submit_user_message(&format!("message {}", i), RequestParameters::default())
            .await;
        assert!(session.history().len() <= 8);
    }

    let last = session.history().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(session.history().len(), 6);
}

#[tokio::test]
async fn test_toggle_back_to_continuation_clears_history() {
    let server = FakeServer::new(vec![Scripted::Reply("Hello!")]);
    let mut session = chat_session(&server);
    session.submit_user_message("Hi", RequestParameters::default()).await;
    assert_eq!(session.history().len(), 2);

    session.toggle_mode();

    assert_eq!(session.current_mode(), Mode::Continuation);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_reply_after_mode_switch_is_not_recorded() {
    let server = FakeServer::new(vec![Scripted::Reply("AI: hi")]);
    let mut session = chat_session(&server);

    let pending = session.begin_submit("Hello", RequestParameters::default()).unwrap();
    session.toggle_mode();
    let result = server.complete(pending.request()).await;
    let outcome = session.finish_submit(pending, result);

    // Cleaned as a continuation now, so the label stays
    assert_eq!(outcome, SubmitOutcome::Reply("AI: hi".to_string()));
    assert_eq!(session.current_mode(), Mode::Continuation);
    assert!(session.history().is_empty());
    assert!(!session.is_generating());
}

#[tokio::test]
async fn test_failure_after_mode_switch_does_not_restore_history() {
    let server = FakeServer::new(vec![Scripted::Reply("hey"), Scripted::Status(500)]);
    let mut session = chat_session(&server);
    session.submit_user_message("Hello", RequestParameters::default()).await;
    assert_eq!(session.history().len(), 2);

    let pending = session.begin_submit("still there?", RequestParameters::default()).unwrap();
    session.toggle_mode();
    let result = server.complete(pending.request()).await;
    let outcome = session.finish_submit(pending, result);

    assert_eq!(outcome, SubmitOutcome::Failed("HTTP error: 500".to_string()));
    assert_eq!(session.current_mode(), Mode::Continuation);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_round_trip_toggle_during_request_keeps_fresh_chat() {
    let server = FakeServer::new(vec![Scripted::Reply("Hello!"), Scripted::Reply("late")]);
    let mut session = chat_session(&server);
    session.submit_user_message("Hi", RequestParameters::default()).await;

    let pending = session.begin_submit("And you?", RequestParameters::default()).unwrap();
    session.toggle_mode();
    session.toggle_mode();
    let result = server.complete(pending.request()).await;
    session.finish_submit(pending, result);

    assert_eq!(session.current_mode(), Mode::Chat);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_connection_check() {
    let server = FakeServer::new(vec![]);
    let mut session = ChatSession::with_backend(server, &Config::new());
    let messages = session.check_connection().await;
    assert_eq!(session.connection_status(), &ConnectionStatus::Connected);
    assert_eq!(messages[1], "Current mode: Continuation");

    let down = Arc::new(FakeServer {
        reachable: false,
        ..Default::default()
    });
    let mut session = ChatSession::with_backend(down, &Config::new());
    let messages = session.check_connection().await;
    assert!(matches!(session.connection_status(), ConnectionStatus::Failed(_)));
    assert_eq!(messages[0], "Cannot connect to the AI server. Please check:");
}
