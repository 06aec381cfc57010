// ABOUTME: Environment-driven configuration for the HTTP server and upstream chat completion service
// ABOUTME: Separates credentials (whose absence is tolerated) from tuning parameters (whose corruption is not)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # Server Configuration
//!
//! All configuration comes from environment variables. Upstream credentials
//! and tuning parameters are deliberately split into two types because they
//! fail differently: missing credentials downgrade the chat feature to
//! fallback mode, while malformed tuning values are a deployment mistake that
//! should be reported loudly.

use crate::errors::{AppError, AppResult};
use std::env;

/// Endpoint URL for the Azure OpenAI resource
pub const AZURE_OPENAI_ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
/// API key for the Azure OpenAI resource
pub const AZURE_OPENAI_API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
/// REST API version sent on every upstream request
pub const AZURE_OPENAI_API_VERSION_ENV: &str = "AZURE_OPENAI_API_VERSION";
/// Name of the model deployment to address
pub const AZURE_OPENAI_DEPLOYMENT_ENV: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
/// Completion length cap forwarded to the upstream service
pub const CHAT_MAX_TOKENS_ENV: &str = "CHAT_MAX_TOKENS";
/// Sampling temperature forwarded to the upstream service
pub const CHAT_TEMPERATURE_ENV: &str = "CHAT_TEMPERATURE";
/// TCP port the HTTP server binds to
pub const HTTP_PORT_ENV: &str = "HTTP_PORT";

const DEFAULT_API_VERSION: &str = "2024-08-01-preview";
const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Credentials required to reach the upstream completion service.
///
/// Both fields are mandatory. Construction fails with `ConfigMissing` when
/// either is absent, and the caller decides whether that failure is fatal.
#[derive(Debug, Clone)]
pub struct UpstreamCredentials {
    /// Base URL of the Azure OpenAI resource, trailing slash stripped
    pub endpoint: String,
    /// API key sent in the `api-key` request header
    pub api_key: String,
}

impl UpstreamCredentials {
    /// Load credentials from the environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` naming the first absent or empty variable
    pub fn from_env() -> AppResult<Self> {
        let endpoint = require_env(AZURE_OPENAI_ENDPOINT_ENV)?;
        let api_key = require_env(AZURE_OPENAI_API_KEY_ENV)?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            api_key,
        })
    }
}

/// Tuning parameters for chat completion requests.
///
/// Every field has a default, so construction only fails when a variable is
/// present but unparseable.
#[derive(Debug, Clone)]
pub struct ChatParams {
    /// REST API version query parameter
    pub api_version: String,
    /// Deployment name addressed in the request path
    pub deployment: String,
    /// Maximum completion tokens per request
    pub max_tokens: u32,
    /// Sampling temperature per request
    pub temperature: f32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_owned(),
            deployment: DEFAULT_DEPLOYMENT.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl ChatParams {
    /// Load tuning parameters from the environment, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when a numeric variable is set but does not parse
    pub fn from_env() -> AppResult<Self> {
        let api_version =
            env::var(AZURE_OPENAI_API_VERSION_ENV).unwrap_or_else(|_| DEFAULT_API_VERSION.into());
        let deployment =
            env::var(AZURE_OPENAI_DEPLOYMENT_ENV).unwrap_or_else(|_| DEFAULT_DEPLOYMENT.into());

        let max_tokens = parse_env(CHAT_MAX_TOKENS_ENV, DEFAULT_MAX_TOKENS)?;
        let temperature = parse_env(CHAT_TEMPERATURE_ENV, DEFAULT_TEMPERATURE)?;

        Ok(Self {
            api_version,
            deployment,
            max_tokens,
            temperature,
        })
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port for the HTTP listener
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl ServerConfig {
    /// Load server configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when `HTTP_PORT` is set but is not a valid port
    pub fn from_env() -> AppResult<Self> {
        let http_port = parse_env(HTTP_PORT_ENV, DEFAULT_HTTP_PORT)?;
        Ok(Self { http_port })
    }
}

fn require_env(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::config_missing(format!(
            "{key} environment variable is not set"
        ))),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::config_invalid(format!("{key} has unparseable value: {raw}"))
        }),
        Err(_) => Ok(default),
    }
}
