// ABOUTME: Route module organization for the Aplyfly server HTTP endpoints
// ABOUTME: Provides centralized route definitions organized by domain with thin handlers over services
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! Route module for the Aplyfly server
//!
//! Each domain module contains only route definitions and thin handler
//! functions that delegate to the service layer.

/// Chat widget API routes (dispatch plus diagnostics)
pub mod chat;
/// Health check and system status routes
pub mod health;

pub use chat::ChatRoutes;
pub use health::HealthRoutes;
