//! Reply Rendering
//!
//! Prepares a final response for display: normalises escaped newlines
//! and splits out the embedded reasoning segment. Actual text-to-markup
//! conversion is a collaborator behind [`MarkupRenderer`]; this crate
//! only ships a plain-text passthrough.

use crate::protocol::FinalResponse;

/// Marker pair delimiting the model's reasoning segment.
const REASONING_START: &str = "<think>";
const REASONING_END: &str = "</think>";

/// A final response prepared for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedReply {
    /// Reasoning segment, shown in a visually distinct block before
    /// the answer when present.
    pub reasoning: Option<String>,
    /// The answer body.
    pub answer: String,
    /// Whether to show the web-search badge.
    pub has_search_results: bool,
}

impl RenderedReply {
    /// Prepare a final response for display.
    #[must_use]
    pub fn from_final(response: &FinalResponse) -> Self {
        let text = normalize_escapes(&response.text);
        let (reasoning, answer) = split_reasoning(&text);
        Self {
            reasoning,
            answer,
            has_search_results: response.has_search_results,
        }
    }
}

/// Replace literal `\n` escapes with real newlines.
///
/// Some model backends serialise their output with escaped newlines
/// intact; they would otherwise render verbatim.
#[must_use]
pub fn normalize_escapes(text: &str) -> String {
    text.replace("\\n", "\n")
}

/// Split an embedded `<think>...</think>` segment from the answer.
///
/// Both markers must be present; otherwise the text is returned
/// untouched as the answer. Only the first segment is extracted.
#[must_use]
pub fn split_reasoning(text: &str) -> (Option<String>, String) {
    let Some(start) = text.find(REASONING_START) else {
        return (None, text.trim().to_string());
    };
    let body_start = start + REASONING_START.len();
    let Some(end_offset) = text[body_start..].find(REASONING_END) else {
        return (None, text.trim().to_string());
    };
    let body_end = body_start + end_offset;

    let reasoning = text[body_start..body_end].trim();
    let mut answer = String::with_capacity(text.len());
    answer.push_str(&text[..start]);
    answer.push_str(&text[body_end + REASONING_END.len()..]);

    let reasoning = (!reasoning.is_empty()).then(|| reasoning.to_string());
    (reasoning, answer.trim().to_string())
}

/// Text-to-markup collaborator (markdown renderer, etc.).
pub trait MarkupRenderer {
    /// Convert message text to display markup.
    fn render(&self, text: &str) -> String;

    /// Highlight a code block. Defaults to the code untouched.
    fn highlight(&self, code: &str, _language: Option<&str>) -> String {
        code.to_string()
    }
}

/// Passthrough renderer for plain-text surfaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainMarkup;

impl MarkupRenderer for PlainMarkup {
    fn render(&self, text: &str) -> String {
        text.to_string()
    }
}
