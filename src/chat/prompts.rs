// ABOUTME: System prompt and fixed business copy loaded at compile time
// ABOUTME: Provides the AplyBot persona prompt plus the degraded-mode and apology messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # System Prompts and Business Copy
//!
//! The persona prompt is loaded at compile time from a markdown file for easy
//! maintenance. The fixed messages below are the only text end users ever see
//! when the upstream service is missing or failing.

/// AplyBot persona prompt sent as the leading system message on every
/// upstream request
pub const APLYBOT_SYSTEM_PROMPT: &str = include_str!("aplybot_system.md");

/// Contact address shown in degraded-mode replies.
///
/// The mailbox domain is spelled with an "i" (aplifly) while the website uses
/// a "y" (aplyfly). Intentional, do not "fix".
pub const CONTACT_EMAIL: &str = "contacto@aplifly.com";

/// Reply body when an upstream call fails mid-conversation
pub const APOLOGY_MESSAGE: &str = "🤖 Disculpa, hubo un error técnico. Por favor contacta directamente a contacto@aplifly.com para una respuesta inmediata. Estamos aquí para ayudarte! 🔧";

/// Get the system prompt for the AplyBot assistant
#[must_use]
pub const fn business_system_prompt() -> &'static str {
    APLYBOT_SYSTEM_PROMPT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apology_carries_contact_email() {
        assert!(APOLOGY_MESSAGE.contains(CONTACT_EMAIL));
    }

    #[test]
    fn test_system_prompt_names_the_persona() {
        assert!(business_system_prompt().contains("AplyBot"));
    }
}
