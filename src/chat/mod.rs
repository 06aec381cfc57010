// ABOUTME: Chat subsystem contract for pluggable generative text providers with streaming support
// ABOUTME: Defines message types, the provider trait, and the capability probe result shared by the dispatcher
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # Conversational Response Subsystem
//!
//! This module defines the contract between the response dispatcher and the
//! upstream generative service, plus the deterministic fallback path used when
//! no upstream is configured.
//!
//! ## Key Concepts
//!
//! - **`GenerativeProvider`**: Async trait for chat completion with streaming support
//! - **`ChatMessage`**: Role-based message structure for conversations
//! - **`CapabilityStatus`**: Result of the one-time availability probe
//! - **`FallbackResponder`**: Canned business responses when no upstream exists
//!
//! ## Example
//!
//! ```rust,no_run
//! use aplyfly_server::chat::{ChatDispatcher, DispatchMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aplyfly_server::errors::AppError> {
//!     let dispatcher = ChatDispatcher::from_env();
//!     let reply = dispatcher
//!         .dispatch("Hola, que servicios ofrecen?", &[], DispatchMode::Single)
//!         .await?;
//!     println!("{reply:?}");
//!     Ok(())
//! }
//! ```

mod azure;
mod dispatcher;
mod fallback;
mod history;
mod prompts;
mod sse;

pub use azure::AzureOpenAiProvider;
pub use dispatcher::{ChatDispatcher, DispatchMode, DispatchResult, ReplyEvent, ReplyStream};
pub use fallback::{detect_name, Category, ConversationContext, FallbackResponder, Topic};
pub use history::{sanitize_history, RawTurn, HISTORY_WINDOW};
pub use prompts::{business_system_prompt, CONTACT_EMAIL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::errors::AppError;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a wire-format role string, rejecting anything unknown
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Configuration for a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Temperature for response randomness (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Whether to stream the response
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new chat request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Set the temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable streaming
    #[must_use]
    pub const fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Response from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated message content
    pub content: String,
    /// Model used for generation
    pub model: String,
    /// Finish reason (stop, length, etc.)
    pub finish_reason: Option<String>,
}

/// A chunk of a streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content delta for this chunk
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason if final
    pub finish_reason: Option<String>,
}

/// Stream type for chat completion responses
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AppError>> + Send>>;

// ============================================================================
// Capability Probe
// ============================================================================

/// Outcome of the one-time upstream capability probe.
///
/// Computed exactly once when the dispatcher is constructed. An unavailable
/// status carries a machine-checkable reason for the diagnostics endpoint; it
/// is never shown verbatim to end users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityStatus {
    /// Whether the generative upstream can be used
    pub available: bool,
    /// Why the upstream is unavailable, when it is
    pub reason: Option<String>,
}

impl CapabilityStatus {
    /// An available upstream
    #[must_use]
    pub const fn available() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    /// An unavailable upstream with a diagnostic reason
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Generative text provider trait for chat completion
///
/// Implement this trait to plug a new upstream completion service into the
/// dispatcher. The design follows the async trait pattern for compatibility
/// with the tokio runtime.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Unique provider identifier (e.g., "azure_openai")
    fn name(&self) -> &'static str;

    /// Model or deployment this provider addresses
    fn model(&self) -> &str;

    /// Perform a chat completion (non-streaming)
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError>;

    /// Perform a streaming chat completion
    ///
    /// Returns a stream of chunks that can be consumed incrementally.
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError>;

    /// Check if the provider is reachable and the API key is valid
    async fn health_check(&self) -> Result<bool, AppError>;
}
