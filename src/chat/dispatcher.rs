// ABOUTME: Conversational response dispatcher routing between the generative upstream and the fallback responder
// ABOUTME: Probes upstream availability once at construction and normalizes both paths to streaming or single output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # Response Dispatcher
//!
//! Turns an inbound message plus client-supplied history into either a
//! streamed sequence of text fragments or one complete reply. The upstream
//! capability is probed exactly once, when the dispatcher is constructed;
//! probing never fails, it only downgrades the dispatcher to fallback mode.
//!
//! Per-call guarantees:
//!
//! - An empty message is rejected before any I/O.
//! - With the upstream unavailable, no network I/O happens and the fallback
//!   responder always answers.
//! - Streams always end with a terminal marker, even on upstream failure.
//! - Raw upstream errors never reach the caller; they are logged and replaced
//!   with a fixed apology carrying the contact address.

use std::pin::Pin;

use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::fallback::{ConversationContext, FallbackResponder};
use super::history::{sanitize_history, RawTurn};
use super::prompts::{business_system_prompt, APOLOGY_MESSAGE, CONTACT_EMAIL};
use super::{
    AzureOpenAiProvider, CapabilityStatus, ChatMessage, ChatRequest, ChatStream,
    GenerativeProvider,
};
use crate::config::{ChatParams, UpstreamCredentials};
use crate::errors::AppError;

/// Output shape the caller wants, declared before dispatch begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Lazy ordered sequence of fragments with a terminal marker
    Streaming,
    /// One complete reply string
    Single,
}

/// One event in a streamed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    /// A text fragment, in emission order
    Content(String),
    /// Terminal marker after the last fragment
    End,
    /// Terminal marker on failure, carrying user-presentable text
    Error(String),
}

/// Stream type for streamed replies
pub type ReplyStream = Pin<Box<dyn Stream<Item = ReplyEvent> + Send>>;

/// Result of a dispatch call, shaped by the requested mode
pub enum DispatchResult {
    /// Complete reply (single mode)
    Single(String),
    /// Lazy reply stream (streaming mode)
    Stream(ReplyStream),
}

impl std::fmt::Debug for DispatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(text) => f.debug_tuple("Single").field(text).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

/// The conversational response dispatcher.
///
/// Construct once at process startup and share behind the composition root;
/// all per-call state is local to each `dispatch` invocation, so concurrent
/// calls never interfere.
pub struct ChatDispatcher {
    provider: Option<Box<dyn GenerativeProvider>>,
    status: CapabilityStatus,
    params: ChatParams,
    fallback: FallbackResponder,
}

impl ChatDispatcher {
    /// Construct the dispatcher, probing the upstream configuration once.
    ///
    /// Never fails: missing or broken configuration downgrades the dispatcher
    /// to fallback mode and records the reason for the diagnostics endpoint.
    #[must_use]
    pub fn from_env() -> Self {
        let params = match ChatParams::from_env() {
            Ok(params) => params,
            Err(e) => {
                warn!("Chat parameters invalid, falling back to canned responses: {e}");
                return Self::unavailable(e.to_string());
            }
        };

        let credentials = match UpstreamCredentials::from_env() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("Upstream credentials not configured, falling back to canned responses: {e}");
                return Self {
                    provider: None,
                    status: CapabilityStatus::unavailable(e.to_string()),
                    params,
                    fallback: FallbackResponder::new(),
                };
            }
        };

        match AzureOpenAiProvider::new(credentials, params.clone()) {
            Ok(provider) => {
                info!(
                    deployment = %params.deployment,
                    "Chat dispatcher initialized with upstream provider"
                );
                Self {
                    provider: Some(Box::new(provider)),
                    status: CapabilityStatus::available(),
                    params,
                    fallback: FallbackResponder::new(),
                }
            }
            Err(e) => {
                warn!("Upstream client construction failed, falling back to canned responses: {e}");
                Self {
                    provider: None,
                    status: CapabilityStatus::unavailable(e.to_string()),
                    params,
                    fallback: FallbackResponder::new(),
                }
            }
        }
    }

    /// Construct a dispatcher around an explicit provider, for composition
    /// roots and tests that supply their own upstream
    #[must_use]
    pub fn with_provider(provider: Box<dyn GenerativeProvider>, params: ChatParams) -> Self {
        Self {
            provider: Some(provider),
            status: CapabilityStatus::available(),
            params,
            fallback: FallbackResponder::new(),
        }
    }

    /// Construct a dispatcher with no upstream at all
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            provider: None,
            status: CapabilityStatus::unavailable(reason),
            params: ChatParams::default(),
            fallback: FallbackResponder::new(),
        }
    }

    /// Result of the one-time capability probe
    #[must_use]
    pub const fn status(&self) -> &CapabilityStatus {
        &self.status
    }

    /// Tuning parameters in effect
    #[must_use]
    pub const fn params(&self) -> &ChatParams {
        &self.params
    }

    /// Model or deployment the upstream addresses
    #[must_use]
    pub fn model(&self) -> &str {
        self.provider
            .as_ref()
            .map_or(self.params.deployment.as_str(), |p| p.model())
    }

    /// Live reachability check against the upstream, for diagnostics only.
    ///
    /// Returns `None` when no upstream is configured.
    pub async fn health_check(&self) -> Option<Result<bool, AppError>> {
        match &self.provider {
            Some(provider) => Some(provider.health_check().await),
            None => None,
        }
    }

    /// Dispatch one message.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the message is empty after trimming. All
    /// other failure modes are absorbed into the reply itself.
    pub async fn dispatch(
        &self,
        message: &str,
        history: &[RawTurn],
        mode: DispatchMode,
    ) -> Result<DispatchResult, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::invalid_input("message must not be empty"));
        }

        let history = sanitize_history(history);

        let Some(provider) = &self.provider else {
            return Ok(self.respond_fallback(message, &history, mode));
        };

        let request = self.build_request(message, history, mode);

        match mode {
            DispatchMode::Single => Ok(DispatchResult::Single(
                Self::respond_single(provider.as_ref(), &request).await,
            )),
            DispatchMode::Streaming => Ok(DispatchResult::Stream(
                Self::respond_stream(provider.as_ref(), &request).await,
            )),
        }
    }

    fn build_request(
        &self,
        message: &str,
        history: Vec<ChatMessage>,
        mode: DispatchMode,
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(business_system_prompt()));
        messages.extend(history);
        messages.push(ChatMessage::user(message));

        let request = ChatRequest::new(messages)
            .with_temperature(self.params.temperature)
            .with_max_tokens(self.params.max_tokens);

        if mode == DispatchMode::Streaming {
            request.with_streaming()
        } else {
            request
        }
    }

    /// Degraded-mode reply, no I/O involved
    fn respond_fallback(
        &self,
        message: &str,
        history: &[ChatMessage],
        mode: DispatchMode,
    ) -> DispatchResult {
        debug!("Answering via fallback responder");

        let context = ConversationContext::from_history(history);
        let body = self
            .fallback
            .respond(message, &context, &mut rand::thread_rng());
        let text = format!("{body}\n\n📩 ¿Prefieres hablar con una persona? Escríbenos a {CONTACT_EMAIL}.");

        match mode {
            DispatchMode::Single => DispatchResult::Single(text),
            DispatchMode::Streaming => DispatchResult::Stream(Box::pin(tokio_stream::iter([
                ReplyEvent::Content(text),
                ReplyEvent::End,
            ]))),
        }
    }

    async fn respond_single(provider: &dyn GenerativeProvider, request: &ChatRequest) -> String {
        match provider.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                error!("Upstream completion failed: {e}");
                APOLOGY_MESSAGE.to_owned()
            }
        }
    }

    /// Streamed upstream reply.
    ///
    /// The upstream call is awaited before the reply stream is built, so the
    /// returned stream owns everything it needs. Failure before any fragment
    /// is emitted becomes an apology plus end marker; failure after emission
    /// becomes an error marker, with everything already produced flushed
    /// ahead of it. Either way the stream terminates.
    async fn respond_stream(
        provider: &dyn GenerativeProvider,
        request: &ChatRequest,
    ) -> ReplyStream {
        let upstream: Result<ChatStream, AppError> = provider.complete_stream(request).await;

        Box::pin(async_stream::stream! {
            let mut upstream = match upstream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Upstream streaming request failed: {e}");
                    yield ReplyEvent::Content(APOLOGY_MESSAGE.to_owned());
                    yield ReplyEvent::End;
                    return;
                }
            };

            let mut emitted = false;
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        if !chunk.delta.is_empty() {
                            emitted = true;
                            yield ReplyEvent::Content(chunk.delta);
                        }
                        if chunk.is_final {
                            yield ReplyEvent::End;
                            return;
                        }
                    }
                    Err(e) => {
                        error!("Upstream stream failed mid-flight: {e}");
                        if emitted {
                            yield ReplyEvent::Error(APOLOGY_MESSAGE.to_owned());
                        } else {
                            yield ReplyEvent::Content(APOLOGY_MESSAGE.to_owned());
                            yield ReplyEvent::End;
                        }
                        return;
                    }
                }
            }

            // Upstream ended without a final chunk, still close the stream
            yield ReplyEvent::End;
        })
    }
}
