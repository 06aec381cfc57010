// ABOUTME: Chat widget route handlers bridging HTTP requests to the response dispatcher
// ABOUTME: Serves the dispatch endpoint (JSON or SSE) and the capability diagnostics endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! Chat routes for the website widget
//!
//! The widget posts `{message, history, streaming}` to `/api/chat`. With
//! `streaming: false` the reply is one JSON object; with `streaming: true`
//! the reply is an SSE stream of `content` events closed by an `end` event
//! (or an `error` event on failure). `/api/chat/status` exposes the
//! capability probe result for operators, never for end users.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

use crate::chat::{ChatDispatcher, DispatchMode, DispatchResult, RawTurn, ReplyEvent};
use crate::errors::AppError;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body posted by the chat widget
#[derive(Debug, Deserialize)]
pub struct ChatApiRequest {
    /// Current user message
    pub message: String,
    /// Full conversation transcript as the widget tracks it
    #[serde(default)]
    pub history: Vec<RawTurn>,
    /// Whether the widget wants an SSE reply
    #[serde(default)]
    pub streaming: bool,
}

/// Non-streaming reply body
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiResponse {
    /// Complete reply text
    pub response: String,
}

/// Diagnostics body for the status endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatStatusResponse {
    /// Whether the generative upstream is usable
    pub available: bool,
    /// Why it is not, when it is not
    pub reason: Option<String>,
    /// Deployment the dispatcher addresses
    pub model: String,
    /// Configured completion length cap
    pub max_tokens: u32,
    /// Configured sampling temperature
    pub temperature: f32,
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    #[must_use]
    pub fn routes(dispatcher: Arc<ChatDispatcher>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::dispatch))
            .route("/api/chat/status", get(Self::status))
            .with_state(dispatcher)
    }

    /// Dispatch one widget message, streaming or single-shot
    async fn dispatch(
        State(dispatcher): State<Arc<ChatDispatcher>>,
        Json(request): Json<ChatApiRequest>,
    ) -> Result<Response, AppError> {
        let mode = if request.streaming {
            DispatchMode::Streaming
        } else {
            DispatchMode::Single
        };

        let result = dispatcher
            .dispatch(&request.message, &request.history, mode)
            .await?;

        match result {
            DispatchResult::Single(text) => {
                Ok(Json(ChatApiResponse { response: text }).into_response())
            }
            DispatchResult::Stream(reply_stream) => {
                Ok(Self::sse_response(reply_stream).into_response())
            }
        }
    }

    /// Translate reply events into the widget's SSE wire format
    fn sse_response(
        mut reply_stream: crate::chat::ReplyStream,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let stream = async_stream::stream! {
            while let Some(event) = reply_stream.next().await {
                let payload = match event {
                    ReplyEvent::Content(chunk) => serde_json::json!({
                        "type": "content",
                        "chunk": chunk,
                    }),
                    ReplyEvent::End => serde_json::json!({ "type": "end" }),
                    ReplyEvent::Error(message) => serde_json::json!({
                        "type": "error",
                        "error": message,
                    }),
                };
                yield Ok(Event::default().data(payload.to_string()));
            }
        };

        Sse::new(stream).keep_alive(KeepAlive::default())
    }

    /// Capability probe result plus the tuning parameters in effect
    async fn status(State(dispatcher): State<Arc<ChatDispatcher>>) -> Json<ChatStatusResponse> {
        let status = dispatcher.status();
        let params = dispatcher.params();

        Json(ChatStatusResponse {
            available: status.available,
            reason: status.reason.clone(),
            model: dispatcher.model().to_owned(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        })
    }
}
