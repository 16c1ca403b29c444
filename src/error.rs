//! Structured error types for the Carta layout engine.
//!
//! Every failure the pipeline can produce is a distinct variant here. Nothing
//! in the engine is retried internally: each failure is deterministic given
//! the same inputs, so callers either fix the input or pick another template.

use thiserror::Error;

use crate::capacity::CompatStatus;
use crate::validate::Violation;

/// The unified error type returned by all public Carta API functions.
#[derive(Debug, Error)]
pub enum CartaError {
    /// The raw menu failed validation before any placement began.
    #[error("Invalid menu: {0}")]
    MenuValidation(String),

    /// The menu structurally cannot fit the chosen template. Carries the
    /// evaluator's verdict and a message with the concrete numbers so the
    /// caller can choose another template.
    #[error("Menu is incompatible with template: {message}")]
    Compatibility {
        status: CompatStatus,
        message: String,
    },

    /// An internal placement impossibility, e.g. a template with zero
    /// item-capable slots. Indicates a malformed template, not bad user data.
    #[error("Layout generation failed: {0}")]
    Generation(String),

    /// The finished document failed the post-generation audit. Fatal and
    /// never retried; intended to fail CI and dev builds, not end users.
    #[error("Layout invariants violated: {} violation(s)", .violations.len())]
    InvariantViolation { violations: Vec<Violation> },

    /// No template with this id is registered.
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// The template description itself is malformed.
    #[error("Invalid template: {0}")]
    TemplateValidation(String),

    /// JSON input failed to parse as a menu, template, or request document.
    #[error("Failed to parse input: {source}{}", format_hint(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for CartaError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the Carta schema. Check field names and types."
                    .to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        CartaError::Parse { source: e, hint }
    }
}
