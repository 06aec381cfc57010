// ABOUTME: Line-buffering SSE (Server-Sent Events) parser for upstream streaming responses
// ABOUTME: Handles partial lines across TCP boundaries and multiple events per chunk
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # SSE Stream Parser
//!
//! A line-buffering parser for the Server-Sent Events framing used by the
//! upstream completion API. Solves two correctness issues:
//!
//! 1. **Multiple events per TCP chunk**: When network buffers batch several
//!    SSE events into a single `bytes_stream()` chunk, all events are emitted.
//!
//! 2. **Partial JSON across TCP boundaries**: When a JSON payload is split
//!    across two TCP chunks, the line buffer accumulates partial data until a
//!    complete line arrives.
//!
//! The caller supplies a `parse_data` closure that converts raw JSON strings
//! into `StreamChunk` values. The SSE framing (line buffering, `data:` prefix
//! stripping, `[DONE]` detection) is handled once here.

use std::mem;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use super::{ChatStream, StreamChunk};
use crate::errors::AppError;

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the JSON string (prefix stripped)
    Data(String),
    /// The `[DONE]` termination signal (OpenAI convention)
    Done,
}

/// Line-buffering SSE parser that handles partial lines across TCP chunk boundaries
///
/// SSE streams are newline-delimited. TCP does not guarantee alignment
/// between network chunks and SSE event boundaries. This parser buffers
/// incomplete lines and emits complete events only when a full line
/// (terminated by `\n`) is available.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Accumulated bytes not yet terminated by a newline
    buffer: String,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feed raw bytes from a TCP chunk into the buffer, returning any complete SSE events
    ///
    /// Bytes are appended to the internal buffer. Complete lines (terminated
    /// by `\n`) are extracted, parsed as SSE events, and returned. Any
    /// trailing partial line remains in the buffer for the next `feed()` call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let text = String::from_utf8_lossy(bytes);
        self.buffer.push_str(&text);

        let mut events = Vec::new();

        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].trim_end_matches('\r').to_owned();
            self.buffer = self.buffer[newline_pos + 1..].to_owned();

            if let Some(event) = Self::parse_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush any remaining buffered content as a final event
    ///
    /// Called when the byte stream ends. If there is a partial line in the
    /// buffer (no trailing newline), attempt to parse it as an SSE event.
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        Self::parse_line(&remaining).into_iter().collect()
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        let trimmed = line.trim();

        // Empty lines are SSE event separators
        if trimmed.is_empty() {
            return None;
        }

        if trimmed == "data: [DONE]" {
            return Some(SseEvent::Done);
        }

        // Ignore non-data SSE fields (event:, id:, retry:, comments starting with :)
        let data = trimmed.strip_prefix("data: ")?;
        if data.trim().is_empty() {
            None
        } else {
            Some(SseEvent::Data(data.to_owned()))
        }
    }
}

/// Create a properly-buffered chunk stream from a raw SSE byte stream
///
/// Wraps a `reqwest` byte stream with SSE line buffering. The `parse_data`
/// closure converts upstream-specific JSON strings into `StreamChunk`
/// values; it returns `None` to skip events that produce no output (empty
/// deltas, metadata-only chunks).
pub fn create_sse_stream<S, F>(
    byte_stream: S,
    parse_data: F,
    provider_name: &'static str,
) -> ChatStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut parser = SseLineBuffer::new();

        while let Some(next) = byte_stream.next().await {
            match next {
                Ok(bytes) => {
                    for result in convert_events(parser.feed(&bytes), &parse_data) {
                        yield result;
                    }
                }
                Err(e) => {
                    yield Err(AppError::external_service(
                        provider_name,
                        format!("Stream read error: {e}"),
                    ));
                    return;
                }
            }
        }

        // Byte stream ended, flush any partial trailing line
        for result in convert_events(parser.flush(), &parse_data) {
            yield result;
        }
    };

    // Drop empty deltas unless they carry the final marker
    let filtered = stream.filter(|result| {
        futures_util::future::ready(
            result
                .as_ref()
                .map_or(true, |chunk| !chunk.delta.is_empty() || chunk.is_final),
        )
    });

    Box::pin(filtered)
}

fn convert_events<F>(events: Vec<SseEvent>, parse_data: &F) -> Vec<Result<StreamChunk, AppError>>
where
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>>,
{
    let mut results = Vec::new();
    for event in events {
        match event {
            SseEvent::Data(json_str) => {
                if let Some(result) = parse_data(&json_str) {
                    results.push(result);
                }
            }
            SseEvent::Done => {
                results.push(Ok(StreamChunk {
                    delta: String::new(),
                    is_final: true,
                    finish_reason: Some("stop".to_owned()),
                }));
            }
        }
    }
    results
}
