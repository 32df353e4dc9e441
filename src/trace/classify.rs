//! Display classification of the model that actually served a trace.
//!
//! The router reports the model it used as a free-form label. The console
//! maps it onto a [`RouteFamily`] with an ordered rule table (first match
//! wins, case-sensitive substring), and derives the display label, tint and
//! complexity badge from the family.
//!
//! [`Complexity`] is a console-side heuristic keyed on the family. The router
//! never reports a complexity score; the badge only says which kind of model
//! was chosen, and should not be read as the router's own assessment.
use std::borrow::Cow;

/// Which known route a model id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteFamily {
    OpenAiGpt4,
    LocalMythomax,
    GroqLlama,
    Unrecognized,
}

/// Color slot for a route. The renderer maps slots to terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tint {
    /// Tint A: premium remote model.
    Purple,
    /// Tint B: local model.
    Indigo,
    /// Tint C: fast hosted model.
    Primary,
    Neutral,
}

/// Badge shown next to the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Complexity {
    High,
    Low,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

struct Rule {
    marker: &'static str,
    family: RouteFamily,
}

/// Priority order matters: `cached-gpt-4o-llama` is a GPT-4 route.
const RULES: [Rule; 3] = [
    Rule {
        marker: "gpt-4",
        family: RouteFamily::OpenAiGpt4,
    },
    Rule {
        marker: "mythomax",
        family: RouteFamily::LocalMythomax,
    },
    Rule {
        marker: "llama",
        family: RouteFamily::GroqLlama,
    },
];

/// Substring the router adds to model labels served from its cache.
const CACHE_MARKER: &str = "cached";

/// Map a server-reported model id to its route family.
pub fn classify(model_id: &str) -> RouteFamily {
    RULES
        .iter()
        .find(|rule| model_id.contains(rule.marker))
        .map(|rule| rule.family)
        .unwrap_or(RouteFamily::Unrecognized)
}

/// Whether the router served this response from its cache.
///
/// The router appends ` (Cached)` to the label; other deployments prefix
/// `cached-`. Both are matched case-insensitively.
pub fn is_cached_model(model_id: &str) -> bool {
    model_id.to_ascii_lowercase().contains(CACHE_MARKER)
}

impl RouteFamily {
    /// Display label; unrecognized models show their raw id.
    pub fn label(self, model_id: &str) -> Cow<'_, str> {
        match self {
            Self::OpenAiGpt4 => Cow::Borrowed("OpenAI GPT-4o"),
            Self::LocalMythomax => Cow::Borrowed("Local Mythomax 13B"),
            Self::GroqLlama => Cow::Borrowed("Groq Llama-3"),
            Self::Unrecognized => Cow::Owned(model_id.to_string()),
        }
    }

    pub fn tint(self) -> Tint {
        match self {
            Self::OpenAiGpt4 => Tint::Purple,
            Self::LocalMythomax => Tint::Indigo,
            Self::GroqLlama => Tint::Primary,
            Self::Unrecognized => Tint::Neutral,
        }
    }

    pub fn complexity(self) -> Complexity {
        match self {
            Self::OpenAiGpt4 | Self::LocalMythomax => Complexity::High,
            Self::GroqLlama | Self::Unrecognized => Complexity::Low,
        }
    }
}

/// Everything the renderer shows about a model id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDisplay {
    pub family: RouteFamily,
    pub label: String,
    pub tint: Tint,
    pub complexity: Complexity,
    pub is_cached: bool,
}

pub fn describe(model_id: &str) -> RouteDisplay {
    let family = classify(model_id);
    RouteDisplay {
        family,
        label: family.label(model_id).into_owned(),
        tint: family.tint(),
        complexity: family.complexity(),
        is_cached: is_cached_model(model_id),
    }
}
