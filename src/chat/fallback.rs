// ABOUTME: Rule-based keyword classifier producing canned business replies when no upstream exists
// ABOUTME: Includes best-effort name and topic extraction from prior conversation turns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # Fallback Responder
//!
//! When the generative upstream is unconfigured, every chat message is
//! answered from fixed pools of business copy, selected by keyword matching.
//! The classifier is deterministic for a given message; only the pick within
//! the matched pool is randomized, through an injected random source so tests
//! can pin it down.
//!
//! Name extraction is a best-effort string heuristic, not entity extraction.
//! It scans for self-introduction phrases and a short list of common given
//! names, first match wins. It will misfire on inputs like "soy de Madrid"
//! and that is accepted.

use rand::{Rng, RngCore};

use super::{ChatMessage, MessageRole};

// ============================================================================
// Response Pools
// ============================================================================

/// Keyword category a message classifies into, tested in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Greeting,
    Services,
    WebDevelopment,
    AiAutomation,
    Mobile,
    Pricing,
    Contact,
    Recommendation,
    Default,
}

const GREETING_POOL: &[&str] = &[
    "¡Hola! 👋 Soy AplyBot de Aplyfly. Especialistas en desarrollo web, IA y apps móviles. ¿En qué proyecto puedo ayudarte? 🚀",
    "¡Bienvenido/a! Soy tu asistente virtual de Aplyfly. ¿Tienes algún proyecto de desarrollo en mente? 💻",
];

const SERVICES_POOL: &[&str] = &[
    "🚀 **Servicios Aplyfly:**\n• Apps Web (React/Django)\n• IA & Chatbots\n• Apps Móviles\n• APIs & Sistemas\n\n¿Qué tipo de proyecto tienes en mente?",
    "Somos especialistas en:\n✅ Desarrollo Web moderno\n✅ Inteligencia Artificial\n✅ Apps Móviles nativas\n✅ Sistemas empresariales\n\n¿Cuál te interesa más? 💡",
];

const WEB_POOL: &[&str] = &[
    "¡Perfecto! Desarrollamos apps web modernas con React, Vue.js y Django. PWAs, sistemas escalables. ¿Qué funcionalidad necesitas? 🌐",
    "Especialistas en desarrollo web: React, Vue, Django, APIs. ¿Tu proyecto es e-commerce, dashboard, o qué tipo de aplicación? 💻",
];

const AI_POOL: &[&str] = &[
    "¡Perfecto para IA! 🤖 Implementamos:\n• Chatbots inteligentes\n• Análisis de datos con ML\n• Automatización con GPT/Claude\n• Asistentes virtuales\n\n¿Para qué industria o proceso específico?",
    "¡Excelente elección! IA es nuestro fuerte:\n✅ Chatbots conversacionales\n✅ Análisis predictivo\n✅ Automatización inteligente\n✅ Integración OpenAI/Claude\n\n¿Qué quieres automatizar? 🧠",
];

const MOBILE_POOL: &[&str] = &[
    "Desarrollamos apps nativas y multiplataforma con React Native/Flutter. iOS, Android. ¿Qué tipo de app necesitas? 📱",
    "Apps móviles nativas y cross-platform. React Native, Flutter. ¿Es para iOS, Android o ambas? ¿Qué funcionalidad? 🚀",
];

const PRICING_POOL: &[&str] = &[
    "Los precios dependen del alcance y complejidad. Ofrezco consulta gratuita de 30min para analizar tu proyecto. ¿Te parece bien? 💰",
    "Cada proyecto es único. ¿Te gustaría una consulta gratuita para evaluar tu idea y darte un presupuesto personalizado? 📊",
];

const CONTACT_POOL: &[&str] = &[
    "¡Perfecto! Puedes contactarnos en contacto@aplifly.com. ¿Prefieres una llamada o empezamos por email? 📞",
    "Contacto directo: contacto@aplifly.com. También ofrezco consulta gratuita de 30min. ¿Cuándo te viene bien? ⏰",
];

const DEFAULT_POOL: &[&str] = &[
    "Interesante proyecto. En Aplyfly manejamos desarrollo web, IA, apps móviles y más. ¿Podrías contarme más detalles? 🤔",
    "¡Genial! Somos especialistas en soluciones tech personalizadas. ¿Qué tecnología o funcionalidad específica necesitas? 💡",
];

// Trigger keywords per category. Single tokens match on word boundaries,
// multi-word entries match as substrings.
const GREETING_KEYWORDS: &[&str] = &["hola", "hello", "hi", "buenas", "buenos"];
const SERVICES_KEYWORDS: &[&str] = &[
    "servicio",
    "servicios",
    "qué hacen",
    "que hacen",
    "qué ofrecen",
    "que ofrecen",
    "capaz",
    "haces",
];
const WEB_KEYWORDS: &[&str] = &["web", "página", "pagina", "sitio", "react", "django", "frontend"];
const AI_KEYWORDS: &[&str] = &[
    "ia",
    "inteligencia artificial",
    "chatbot",
    "bot",
    "ai",
    "machine learning",
    "ml",
];
const MOBILE_KEYWORDS: &[&str] = &[
    "móvil",
    "movil",
    "app",
    "aplicación",
    "aplicacion",
    "ios",
    "android",
    "flutter",
    "react native",
];
const PRICING_KEYWORDS: &[&str] = &[
    "precio",
    "costo",
    "cuánto",
    "cuanto",
    "presupuesto",
    "cotización",
    "cotizacion",
    "vale",
    "costar",
];
const CONTACT_KEYWORDS: &[&str] = &["contacto", "contactar", "llamar", "email", "whatsapp"];
const RECOMMENDATION_KEYWORDS: &[&str] = &[
    "recomienda",
    "recomiendas",
    "recomendación",
    "recomendacion",
    "consejo",
    "sugieres",
];

const NAME_RECALL_PHRASES: &[&str] = &[
    "mi nombre",
    "cómo me llamo",
    "como me llamo",
    "cuál es mi nombre",
    "cual es mi nombre",
];

const INTRO_PHRASES: &[&str] = &["mi nombre es ", "me llamo ", "my name is ", "soy "];

const COMMON_NAMES: &[&str] = &[
    "pedro",
    "juan",
    "maria",
    "ana",
    "carlos",
    "luis",
    "jose",
    "antonio",
    "francisco",
    "manuel",
    "david",
    "daniel",
    "rafael",
    "miguel",
    "alejandro",
];

// ============================================================================
// Conversation Context
// ============================================================================

/// Topic a prior user turn touched, used to tailor recommendation replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Web,
    Ai,
    Mobile,
}

/// Lightweight context extracted from prior user turns
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    /// User's name, if a self-introduction was spotted
    pub user_name: Option<String>,
    /// Topics mentioned so far, in first-mention order
    pub topics: Vec<Topic>,
}

impl ConversationContext {
    /// Extract context from sanitized history by scanning user turns
    #[must_use]
    pub fn from_history(messages: &[ChatMessage]) -> Self {
        let mut context = Self::default();

        for message in messages {
            if message.role != MessageRole::User {
                continue;
            }
            let content = message.content.to_lowercase();

            if context.user_name.is_none() {
                context.user_name = detect_name(&content);
            }

            for (keywords, topic) in [
                (&["web", "página", "pagina", "sitio"][..], Topic::Web),
                (&["ia", "inteligencia", "ai"][..], Topic::Ai),
                (&["móvil", "movil", "app", "aplicación"][..], Topic::Mobile),
            ] {
                if keywords.iter().any(|kw| contains_keyword(&content, kw))
                    && !context.topics.contains(&topic)
                {
                    context.topics.push(topic);
                }
            }
        }

        context
    }
}

/// Best-effort name detection in one lower-cased user message
#[must_use]
pub fn detect_name(content: &str) -> Option<String> {
    // Introduction phrases first: take up to two alphabetic words after the phrase
    for phrase in INTRO_PHRASES {
        if let Some(pos) = content.find(phrase) {
            let after = &content[pos + phrase.len()..];
            let name = take_name_words(after);
            if !name.is_empty() {
                return Some(name);
            }
        }
    }

    // Then a bare common given name, with an optional trailing surname
    let words: Vec<&str> = content.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let cleaned = word.trim_matches(|c: char| !c.is_alphabetic());
        if COMMON_NAMES.contains(&cleaned) {
            let mut name = capitalize(cleaned);
            if let Some(next) = words.get(i + 1) {
                let next_cleaned = next.replace(',', "");
                if !next_cleaned.is_empty() && next_cleaned.chars().all(char::is_alphabetic) {
                    name.push(' ');
                    name.push_str(&capitalize(&next_cleaned));
                }
            }
            return Some(name);
        }
    }

    None
}

fn take_name_words(after: &str) -> String {
    after
        .split_whitespace()
        .take_while(|w| {
            w.trim_matches(|c: char| !c.is_alphabetic())
                .chars()
                .all(char::is_alphabetic)
        })
        .take(2)
        .map(|w| capitalize(w.trim_matches(|c: char| !c.is_alphabetic())))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

/// Word-boundary match for single tokens, substring match for phrases
fn contains_keyword(message: &str, keyword: &str) -> bool {
    if keyword.contains(' ') {
        return message.contains(keyword);
    }
    message
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == keyword)
}

fn matches_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| contains_keyword(message, kw))
}

// ============================================================================
// Responder
// ============================================================================

/// Deterministic-by-category canned responder for degraded mode
#[derive(Debug, Clone, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    /// Create a new responder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classify a message into its response category.
    ///
    /// Categories are tested in a fixed priority order; the first hit wins.
    /// Name-recall and self-introduction are handled before classification
    /// in [`respond`](Self::respond), not here.
    #[must_use]
    pub fn classify(message: &str) -> Category {
        let message = message.to_lowercase();
        let checks: &[(&[&str], Category)] = &[
            (GREETING_KEYWORDS, Category::Greeting),
            (SERVICES_KEYWORDS, Category::Services),
            (WEB_KEYWORDS, Category::WebDevelopment),
            (AI_KEYWORDS, Category::AiAutomation),
            (MOBILE_KEYWORDS, Category::Mobile),
            (PRICING_KEYWORDS, Category::Pricing),
            (CONTACT_KEYWORDS, Category::Contact),
            (RECOMMENDATION_KEYWORDS, Category::Recommendation),
        ];

        for (keywords, category) in checks {
            if matches_any(&message, keywords) {
                return *category;
            }
        }
        Category::Default
    }

    /// The canned pool backing a category, exposed so tests can assert
    /// membership rather than exact text
    #[must_use]
    pub const fn pool(category: Category) -> &'static [&'static str] {
        match category {
            Category::Greeting => GREETING_POOL,
            Category::Services => SERVICES_POOL,
            Category::WebDevelopment => WEB_POOL,
            Category::AiAutomation => AI_POOL,
            Category::Mobile => MOBILE_POOL,
            Category::Pricing => PRICING_POOL,
            Category::Contact => CONTACT_POOL,
            Category::Recommendation | Category::Default => DEFAULT_POOL,
        }
    }

    /// Produce a reply for a message in degraded mode.
    ///
    /// The random source only influences which string is picked from the
    /// matched pool; everything else is deterministic for a given message
    /// and context.
    #[must_use]
    pub fn respond(
        &self,
        message: &str,
        context: &ConversationContext,
        rng: &mut dyn RngCore,
    ) -> String {
        let message = message.to_lowercase();
        let user_name = context.user_name.as_deref();

        // A self-introduction gets a direct welcome. Checked before recall
        // because "mi nombre es Pedro" contains the recall phrase "mi nombre".
        if INTRO_PHRASES.iter().any(|p| message.contains(p)) {
            if let Some(name) = detect_name(&message) {
                return format!("¡Mucho gusto {name}! 😊 ¿En qué proyecto puedo ayudarte hoy?");
            }
        }

        // Name recall outranks every keyword category
        if NAME_RECALL_PHRASES.iter().any(|p| message.contains(p)) {
            return user_name.map_or_else(
                || "No me has dicho tu nombre aún. ¿Cómo te llamas? 😊".to_owned(),
                |name| format!("Te llamas {name}, ¿verdad? 😊 ¿En qué proyecto puedo ayudarte?"),
            );
        }

        let category = Self::classify(&message);

        if category == Category::Recommendation {
            return Self::recommendation_reply(context);
        }

        if category == Category::Default {
            if let Some(name) = user_name {
                return format!(
                    "Entiendo {name}. En Aplyfly manejamos desarrollo web, IA, apps móviles y sistemas empresariales. ¿Podrías contarme más detalles sobre lo que necesitas? 🤔"
                );
            }
        }

        let pool = Self::pool(category);
        let pick = pool[rng.gen_range(0..pool.len())];

        if category == Category::Greeting {
            if let Some(name) = user_name {
                return format!("¡Hola {name}! {pick}");
            }
        }

        pick.to_owned()
    }

    fn recommendation_reply(context: &ConversationContext) -> String {
        let name_prefix = context
            .user_name
            .as_deref()
            .map_or_else(String::new, |name| format!("{name}, "));

        if context.topics.contains(&Topic::Ai) {
            return format!(
                "Para IA {name_prefix}te recomiendo empezar con un chatbot inteligente para tu web. ¿Qué industria es tu negocio? 🤖"
            );
        }
        if context.topics.contains(&Topic::Web) {
            return format!(
                "Para web {name_prefix}recomiendo React + Django para máximo rendimiento. ¿Qué funcionalidades necesitas? 💻"
            );
        }

        context.user_name.as_deref().map_or_else(
            || {
                "Te recomiendo empezar con una consulta gratuita para evaluar tu proyecto específico. ¿Cuál es tu industria o tipo de negocio? 💡".to_owned()
            },
            |name| {
                format!(
                    "¡Perfecto {name}! Te recomiendo empezar con una consulta gratuita de 30min para entender mejor tu proyecto. ¿Te parece bien? 💡"
                )
            },
        )
    }
}
