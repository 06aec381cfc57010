// ABOUTME: Azure OpenAI chat completion provider with streaming and single-shot modes
// ABOUTME: Maps upstream HTTP and protocol failures onto the application error taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # Azure OpenAI Provider
//!
//! Talks to an Azure-hosted OpenAI deployment via its REST API. Azure differs
//! from the vanilla OpenAI API in two ways this module encapsulates: the
//! deployment name lives in the URL path rather than the request body, and
//! authentication uses an `api-key` header rather than a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::sse::create_sse_stream;
use super::{ChatMessage, ChatRequest, ChatResponse, ChatStream, GenerativeProvider, StreamChunk};
use crate::config::{ChatParams, UpstreamCredentials};
use crate::errors::{AppError, ErrorCode};

const PROVIDER_NAME: &str = "AzureOpenAI";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Wire Types
// ============================================================================

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct AzureRequest {
    messages: Vec<AzureMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Message structure on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AzureMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for AzureMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

/// Chat completions response structure
#[derive(Debug, Deserialize)]
struct AzureResponse {
    choices: Vec<AzureChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzureChoice {
    message: AzureResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzureResponseMessage {
    content: Option<String>,
}

/// Streaming chunk structure
#[derive(Debug, Deserialize)]
struct AzureStreamChunk {
    #[serde(default)]
    choices: Vec<AzureStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct AzureStreamChoice {
    delta: AzureDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzureDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct AzureErrorResponse {
    error: AzureErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AzureErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Azure OpenAI chat completion provider
pub struct AzureOpenAiProvider {
    client: Client,
    credentials: UpstreamCredentials,
    params: ChatParams,
}

impl AzureOpenAiProvider {
    /// Create a new provider with the given credentials and tuning parameters
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(credentials: UpstreamCredentials, params: ChatParams) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            params,
        })
    }

    /// Build the chat completions URL for the configured deployment
    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.credentials.endpoint, self.params.deployment, self.params.api_version
        )
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<AzureMessage> {
        messages.iter().map(AzureMessage::from).collect()
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> AzureRequest {
        AzureRequest {
            messages: Self::convert_messages(&request.messages),
            temperature: request.temperature.or(Some(self.params.temperature)),
            max_tokens: request.max_tokens.or(Some(self.params.max_tokens)),
            stream,
        }
    }

    /// Map a transport-level failure onto the error taxonomy
    fn map_send_error(error: &reqwest::Error) -> AppError {
        if error.is_connect() || error.is_timeout() {
            AppError::external_unavailable(PROVIDER_NAME, format!("Cannot reach endpoint: {error}"))
        } else {
            AppError::external_service(PROVIDER_NAME, format!("Request failed: {error}"))
        }
    }

    /// Parse a non-success HTTP response from the API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        let detail = serde_json::from_str::<AzureErrorResponse>(body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |parsed| {
                let code = parsed.error.code.unwrap_or_else(|| "unknown".to_owned());
                format!("{code}: {}", parsed.error.message)
            },
        );

        match status.as_u16() {
            401 | 403 => AppError::new(
                ErrorCode::ExternalAuthFailed,
                format!("{PROVIDER_NAME}: authentication failed: {detail}"),
            ),
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                format!("{PROVIDER_NAME}: rate limit exceeded: {detail}"),
            ),
            404 => AppError::external_service(
                PROVIDER_NAME,
                format!("deployment or endpoint not found: {detail}"),
            ),
            500..=599 => AppError::external_unavailable(PROVIDER_NAME, detail),
            _ => AppError::external_service(PROVIDER_NAME, format!("API error ({status}): {detail}")),
        }
    }

    /// Parse one streaming SSE payload into a chunk, or skip it
    fn parse_stream_data(json_str: &str) -> Option<Result<StreamChunk, AppError>> {
        match serde_json::from_str::<AzureStreamChunk>(json_str) {
            Ok(chunk) => {
                // Azure's first event often carries only content-filter metadata
                let choice = chunk.choices.into_iter().next()?;
                Some(Ok(StreamChunk {
                    delta: choice.delta.content.unwrap_or_default(),
                    is_final: choice.finish_reason.is_some(),
                    finish_reason: choice.finish_reason,
                }))
            }
            Err(e) => Some(Err(AppError::external_protocol(
                PROVIDER_NAME,
                format!("Malformed stream chunk: {e}"),
            ))),
        }
    }
}

#[async_trait]
impl GenerativeProvider for AzureOpenAiProvider {
    fn name(&self) -> &'static str {
        "azure_openai"
    }

    fn model(&self) -> &str {
        &self.params.deployment
    }

    #[instrument(skip(self, request), fields(deployment = %self.params.deployment))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        debug!(
            "Sending chat completion request with {} messages",
            request.messages.len()
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.credentials.api_key)
            .header("Content-Type", "application/json")
            .json(&self.build_request(request, false))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request: {e}");
                Self::map_send_error(&e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::external_service(PROVIDER_NAME, format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &body));
        }

        let parsed: AzureResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse API response: {e}");
            AppError::external_protocol(PROVIDER_NAME, format!("Failed to parse response: {e}"))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            AppError::external_protocol(PROVIDER_NAME, "API returned no choices")
        })?;

        let content = choice.message.content.unwrap_or_default();

        debug!(
            "Received response: {} chars, finish_reason: {:?}",
            content.len(),
            choice.finish_reason
        );

        Ok(ChatResponse {
            content,
            model: parsed
                .model
                .unwrap_or_else(|| self.params.deployment.clone()),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(deployment = %self.params.deployment))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        debug!(
            "Sending streaming chat completion request with {} messages",
            request.messages.len()
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.credentials.api_key)
            .header("Content-Type", "application/json")
            .json(&self.build_request(request, true))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send streaming request: {e}");
                Self::map_send_error(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error_response(status, &body));
        }

        Ok(create_sse_stream(
            response.bytes_stream(),
            Self::parse_stream_data,
            PROVIDER_NAME,
        ))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        let url = format!(
            "{}/openai/models?api-version={}",
            self.credentials.endpoint, self.params.api_version
        );

        let response = self
            .client
            .get(url)
            .header("api-key", &self.credentials.api_key)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&e))?;

        Ok(response.status().is_success())
    }
}
