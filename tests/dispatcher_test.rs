// ABOUTME: Integration tests for the response dispatcher with a scripted mock provider
// ABOUTME: Covers mode handling, degraded mode, error absorption, and stream termination guarantees
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! Dispatcher Tests
//!
//! These tests script the upstream provider so every dispatch path can be
//! exercised without network access: success in both modes, pre-stream and
//! mid-stream failures, degraded mode, and input validation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_stream::StreamExt;

use aplyfly_server::chat::{
    ChatDispatcher, ChatMessage, ChatRequest, ChatResponse, ChatStream, DispatchMode,
    DispatchResult, GenerativeProvider, RawTurn, ReplyEvent, StreamChunk, HISTORY_WINDOW,
};
use aplyfly_server::config::ChatParams;
use aplyfly_server::errors::{AppError, ErrorCode};

const CONTACT: &str = "contacto@aplifly.com";

// ============================================================================
// Mock Provider
// ============================================================================

/// What the mock should do when called
#[derive(Clone)]
enum Script {
    /// `complete` succeeds with this text; `complete_stream` yields these chunks
    Reply(Vec<&'static str>),
    /// Both calls fail immediately
    FailImmediately,
    /// Stream yields these chunks then fails mid-flight
    FailAfter(Vec<&'static str>),
    /// Stream yields these chunks and ends without a final marker
    EndWithoutFinal(Vec<&'static str>),
}

struct MockProvider {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, request: &ChatRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
    }

    fn chunk(delta: &str, is_final: bool) -> StreamChunk {
        StreamChunk {
            delta: delta.to_owned(),
            is_final,
            finish_reason: is_final.then(|| "stop".to_owned()),
        }
    }
}

#[async_trait]
impl GenerativeProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.record(request);
        match &self.script {
            Script::Reply(fragments) => Ok(ChatResponse {
                content: fragments.concat(),
                model: "mock-model".to_owned(),
                finish_reason: Some("stop".to_owned()),
            }),
            _ => Err(AppError::external_service("mock", "scripted failure")),
        }
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        self.record(request);
        let items: Vec<Result<StreamChunk, AppError>> = match &self.script {
            Script::Reply(fragments) => fragments
                .iter()
                .map(|f| Ok(Self::chunk(f, false)))
                .chain(std::iter::once(Ok(Self::chunk("", true))))
                .collect(),
            Script::FailImmediately => {
                return Err(AppError::external_service("mock", "scripted failure"));
            }
            Script::FailAfter(fragments) => fragments
                .iter()
                .map(|f| Ok(Self::chunk(f, false)))
                .chain(std::iter::once(Err(AppError::external_service(
                    "mock",
                    "scripted mid-stream failure",
                ))))
                .collect(),
            Script::EndWithoutFinal(fragments) => {
                fragments.iter().map(|f| Ok(Self::chunk(f, false))).collect()
            }
        };
        Ok(Box::pin(tokio_stream::iter(items)))
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// Newtype so a shared `Arc<MockProvider>` can be handed to the dispatcher
/// without running afoul of the orphan rule.
struct SharedMock(Arc<MockProvider>);

#[async_trait]
impl GenerativeProvider for SharedMock {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn model(&self) -> &str {
        self.0.model()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.0.complete(request).await
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        self.0.complete_stream(request).await
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        self.0.health_check().await
    }
}

fn dispatcher_with(mock: Arc<MockProvider>) -> ChatDispatcher {
    ChatDispatcher::with_provider(Box::new(SharedMock(mock)), ChatParams::default())
}

async fn collect(result: DispatchResult) -> Vec<ReplyEvent> {
    match result {
        DispatchResult::Stream(mut stream) => {
            let mut events = Vec::new();
            while let Some(event) = stream.next().await {
                events.push(event);
            }
            events
        }
        DispatchResult::Single(_) => panic!("expected a stream"),
    }
}

fn single(result: DispatchResult) -> String {
    match result {
        DispatchResult::Single(text) => text,
        DispatchResult::Stream(_) => panic!("expected a single reply"),
    }
}

// ============================================================================
// Input validation
// ============================================================================

#[tokio::test]
async fn test_empty_message_rejected_before_any_upstream_call() {
    let mock = MockProvider::new(Script::Reply(vec!["unused"]));
    let dispatcher = dispatcher_with(Arc::clone(&mock));

    for message in ["", "   ", "\n\t "] {
        let err = dispatcher
            .dispatch(message, &[], DispatchMode::Single)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Single mode
// ============================================================================

#[tokio::test]
async fn test_single_mode_returns_complete_reply() {
    let mock = MockProvider::new(Script::Reply(vec!["Hola, ", "¿en qué puedo ayudarte?"]));
    let dispatcher = dispatcher_with(mock);

    let result = dispatcher
        .dispatch("hola", &[], DispatchMode::Single)
        .await
        .unwrap();
    assert_eq!(single(result), "Hola, ¿en qué puedo ayudarte?");
}

#[tokio::test]
async fn test_single_mode_upstream_failure_becomes_apology() {
    let mock = MockProvider::new(Script::FailImmediately);
    let dispatcher = dispatcher_with(mock);

    let result = dispatcher
        .dispatch("hola", &[], DispatchMode::Single)
        .await
        .unwrap();
    let text = single(result);
    assert!(text.contains(CONTACT), "apology must carry contact: {text}");
    assert!(
        !text.contains("scripted failure"),
        "raw upstream error leaked: {text}"
    );
}

// ============================================================================
// Streaming mode
// ============================================================================

#[tokio::test]
async fn test_stream_preserves_order_and_ends_with_terminal() {
    let mock = MockProvider::new(Script::Reply(vec!["Hola", ", ", "mundo"]));
    let dispatcher = dispatcher_with(mock);

    let result = dispatcher
        .dispatch("hola", &[], DispatchMode::Streaming)
        .await
        .unwrap();
    let events = collect(result).await;

    assert_eq!(
        events,
        vec![
            ReplyEvent::Content("Hola".to_owned()),
            ReplyEvent::Content(", ".to_owned()),
            ReplyEvent::Content("mundo".to_owned()),
            ReplyEvent::End,
        ]
    );
}

#[tokio::test]
async fn test_stream_concatenation_matches_single_reply() {
    let fragments = vec!["Desarrollamos ", "apps ", "web."];
    let mock = MockProvider::new(Script::Reply(fragments));

    let dispatcher = dispatcher_with(Arc::clone(&mock));
    let single_text = single(
        dispatcher
            .dispatch("web", &[], DispatchMode::Single)
            .await
            .unwrap(),
    );

    let events = collect(
        dispatcher
            .dispatch("web", &[], DispatchMode::Streaming)
            .await
            .unwrap(),
    )
    .await;

    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            ReplyEvent::Content(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, single_text);
}

#[tokio::test]
async fn test_pre_stream_failure_yields_apology_then_end() {
    let mock = MockProvider::new(Script::FailImmediately);
    let dispatcher = dispatcher_with(mock);

    let result = dispatcher
        .dispatch("hola", &[], DispatchMode::Streaming)
        .await
        .unwrap();
    let events = collect(result).await;

    assert_eq!(events.len(), 2);
    match &events[0] {
        ReplyEvent::Content(text) => assert!(text.contains(CONTACT)),
        other => panic!("expected apology content, got {other:?}"),
    }
    assert_eq!(events[1], ReplyEvent::End);
}

#[tokio::test]
async fn test_mid_stream_failure_flushes_fragments_then_error_terminal() {
    let mock = MockProvider::new(Script::FailAfter(vec!["Hola", ", "]));
    let dispatcher = dispatcher_with(mock);

    let result = dispatcher
        .dispatch("hola", &[], DispatchMode::Streaming)
        .await
        .unwrap();
    let events = collect(result).await;

    assert_eq!(events[0], ReplyEvent::Content("Hola".to_owned()));
    assert_eq!(events[1], ReplyEvent::Content(", ".to_owned()));
    match events.last().unwrap() {
        ReplyEvent::Error(text) => {
            assert!(text.contains(CONTACT));
            assert!(!text.contains("mid-stream failure"));
        }
        other => panic!("expected error terminal, got {other:?}"),
    }
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn test_stream_without_final_chunk_still_terminates() {
    let mock = MockProvider::new(Script::EndWithoutFinal(vec!["Hola"]));
    let dispatcher = dispatcher_with(mock);

    let result = dispatcher
        .dispatch("hola", &[], DispatchMode::Streaming)
        .await
        .unwrap();
    let events = collect(result).await;

    assert_eq!(
        events,
        vec![ReplyEvent::Content("Hola".to_owned()), ReplyEvent::End]
    );
}

// ============================================================================
// History handling
// ============================================================================

#[tokio::test]
async fn test_prompt_carries_windowed_history() {
    let mock = MockProvider::new(Script::Reply(vec!["ok"]));
    let dispatcher = dispatcher_with(Arc::clone(&mock));

    let history: Vec<RawTurn> = (0..15)
        .map(|i| RawTurn::new("user", format!("turn {i}")))
        .collect();

    dispatcher
        .dispatch("último mensaje", &history, DispatchMode::Single)
        .await
        .unwrap();

    let requests = mock.requests.lock().unwrap();
    let messages: &[ChatMessage] = &requests[0].messages;

    // system prompt + windowed history + current message
    assert_eq!(messages.len(), 1 + HISTORY_WINDOW + 1);
    assert_eq!(messages[1].content, "turn 5");
    assert_eq!(messages.last().unwrap().content, "último mensaje");
}

#[tokio::test]
async fn test_malformed_history_never_errors() {
    let mock = MockProvider::new(Script::Reply(vec!["ok"]));
    let dispatcher = dispatcher_with(Arc::clone(&mock));

    let history = vec![
        RawTurn::default(),
        RawTurn::new("wizard", "unknown role"),
        RawTurn::new("user", ""),
    ];

    let result = dispatcher
        .dispatch("hola", &history, DispatchMode::Single)
        .await;
    assert!(result.is_ok());

    let requests = mock.requests.lock().unwrap();
    // system prompt + current message only, all junk dropped
    assert_eq!(requests[0].messages.len(), 2);
}

// ============================================================================
// Degraded mode
// ============================================================================

#[tokio::test]
async fn test_unavailable_dispatcher_answers_from_fallback() {
    let dispatcher = ChatDispatcher::unavailable("AZURE_OPENAI_ENDPOINT not set");
    assert!(!dispatcher.status().available);

    let result = dispatcher
        .dispatch("¿qué servicios ofrecen?", &[], DispatchMode::Single)
        .await
        .unwrap();
    let text = single(result);

    assert!(text.contains("¿Prefieres hablar con una persona?"));
    assert!(text.contains(CONTACT));
}

#[tokio::test]
async fn test_unavailable_dispatcher_streams_content_then_end() {
    let dispatcher = ChatDispatcher::unavailable("no credentials");

    let result = dispatcher
        .dispatch("hola", &[], DispatchMode::Streaming)
        .await
        .unwrap();
    let events = collect(result).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], ReplyEvent::Content(text) if !text.is_empty()));
    assert_eq!(events[1], ReplyEvent::End);
}

#[tokio::test]
async fn test_unavailable_dispatcher_remembers_name_from_history() {
    let dispatcher = ChatDispatcher::unavailable("no credentials");

    let history = vec![
        RawTurn::new("user", "hola, me llamo Pedro"),
        RawTurn::new("assistant", "¡Mucho gusto Pedro!"),
    ];

    let result = dispatcher
        .dispatch("¿cuál es mi nombre?", &history, DispatchMode::Single)
        .await
        .unwrap();
    assert!(single(result).contains("Te llamas Pedro"));
}

#[tokio::test]
async fn test_unavailable_dispatcher_still_rejects_empty_message() {
    let dispatcher = ChatDispatcher::unavailable("no credentials");

    let err = dispatcher
        .dispatch("  ", &[], DispatchMode::Single)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_health_check_absent_without_provider() {
    let dispatcher = ChatDispatcher::unavailable("no credentials");
    assert!(dispatcher.health_check().await.is_none());
}
