// ABOUTME: Main library entry point for the Aplyfly site services
// ABOUTME: Provides the conversational response dispatcher, its HTTP surface, and SEO tooling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

#![deny(unsafe_code)]

//! # Aplyfly Server
//!
//! Backend services for the Aplyfly web site. The centerpiece is the
//! conversational response dispatcher behind the site's chat widget: it turns
//! an inbound message plus a bounded conversation history into either a
//! streamed sequence of text fragments or a single complete reply, using
//! Azure OpenAI when configured and a deterministic rule-based responder when
//! not.
//!
//! ## Architecture
//!
//! - **Chat**: provider abstraction, Azure OpenAI client, history window,
//!   fallback responder, and the dispatcher that ties them together
//! - **Routes**: axum handlers for the chat API, diagnostics, and health
//! - **SEO**: incremental sitemap and Google News sitemap builders
//! - **Config**: environment-only configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use aplyfly_server::chat::{ChatDispatcher, DispatchMode};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Probes the upstream configuration exactly once; never panics.
//!     let dispatcher = ChatDispatcher::from_env();
//!     let result = dispatcher
//!         .dispatch("Hola, ¿qué servicios ofrecen?", &[], DispatchMode::Single)
//!         .await;
//!     println!("{result:?}");
//! }
//! ```

/// Conversational response dispatcher and its collaborators
pub mod chat;

/// Environment-only configuration management
pub mod config;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Logging configuration and structured logging setup
pub mod logging;

/// HTTP routes for the chat API, diagnostics, and health checks
pub mod routes;

/// Sitemap and Google News sitemap construction
pub mod seo;
