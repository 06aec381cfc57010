// ABOUTME: Conversation history sanitization and windowing for upstream chat requests
// ABOUTME: Drops malformed client-supplied turns and bounds the prompt to the most recent exchanges
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # History Window
//!
//! Clients send their full conversation transcript with every request. This
//! module turns that untrusted list into the bounded, well-formed message
//! sequence the upstream prompt is built from. Malformed turns are dropped
//! silently so a buggy widget can never take the chat down.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, MessageRole};

/// Maximum number of prior turns forwarded upstream
pub const HISTORY_WINDOW: usize = 10;

/// A conversation turn as received from the client, before validation.
///
/// Every field is optional because the wire format is whatever the browser
/// sends. Validation happens in [`sanitize_history`], not in serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTurn {
    /// Speaker role ("user" or "assistant")
    #[serde(default)]
    pub role: Option<String>,
    /// Message text
    #[serde(default)]
    pub content: Option<String>,
}

impl RawTurn {
    /// Build a well-formed turn, for tests and internal callers
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
        }
    }
}

/// Validate and window the client-supplied history.
///
/// A turn survives only if it has a user or assistant role and non-empty
/// content. The system role is rejected here so a client transcript can never
/// inject instructions ahead of the server-owned system prompt. Of the
/// surviving turns, only the most recent [`HISTORY_WINDOW`] are kept, so the
/// upstream prompt stays bounded no matter how long the client transcript
/// grows.
#[must_use]
pub fn sanitize_history(turns: &[RawTurn]) -> Vec<ChatMessage> {
    let well_formed: Vec<ChatMessage> = turns
        .iter()
        .filter_map(|turn| {
            let role = MessageRole::parse(turn.role.as_deref()?)?;
            if role == MessageRole::System {
                return None;
            }
            let content = turn.content.as_deref()?;
            if content.trim().is_empty() {
                return None;
            }
            Some(ChatMessage::new(role, content))
        })
        .collect();

    let dropped = turns.len() - well_formed.len();
    if dropped > 0 {
        debug!("Dropped {dropped} malformed history turns");
    }

    let skip = well_formed.len().saturating_sub(HISTORY_WINDOW);
    well_formed.into_iter().skip(skip).collect()
}
