//! Wire Protocol
//!
//! Types exchanged with the chat server, plus the decoded stream events
//! the dispatcher consumes.
//!
//! # Streamed response format
//!
//! `POST /api/send` answers with a stream of newline-delimited JSON
//! records:
//!
//! ```text
//! {"type": "search_progress", "title": "..."}        zero or more
//! {"type": "final_response", "response": "...",
//!  "has_search_results": false,
//!  "conversation_id": "chat_20250101_120000"}        exactly one
//! {"type": "error", "error": "..."}                  instead of a final
//! ```
//!
//! Servers that skip progress streaming reply with a single untagged
//! object carrying a `response` field; that shape is accepted as a
//! final response too.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/send`.
#[derive(Clone, Debug, Serialize)]
pub struct OutgoingRequest {
    /// The user's message (non-empty after trimming).
    pub message: String,
    /// Whether the server should search the web before answering.
    pub enable_web_search: bool,
    /// Whether the server should stream search progress records.
    pub return_search_progress: bool,
}

impl OutgoingRequest {
    /// Build a request for a trimmed, non-empty message.
    ///
    /// Progress streaming is always requested; the server decides
    /// whether to honor it.
    #[must_use]
    pub fn new(message: impl Into<String>, enable_web_search: bool) -> Self {
        Self {
            message: message.into(),
            enable_web_search,
            return_search_progress: true,
        }
    }
}

/// The terminal record of a response stream.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FinalResponse {
    /// The complete answer text, possibly with an embedded
    /// `<think>...</think>` reasoning segment.
    #[serde(rename = "response")]
    pub text: String,
    /// Whether the answer was grounded in web search results.
    #[serde(default)]
    pub has_search_results: bool,
    /// Server-assigned conversation id for this exchange.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// One decoded record from the response stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// Non-terminal search progress notification.
    SearchProgress {
        /// Title of the page currently being searched/read.
        title: String,
    },
    /// Terminal record carrying the complete answer.
    Final(FinalResponse),
    /// Terminal record reporting a server-side failure mid-stream.
    ServerError {
        /// Error description from the server.
        message: String,
    },
    /// A record that did not parse as anything known. Never fatal.
    Unrecognized {
        /// The raw record text, kept for logging.
        raw: String,
    },
}

impl StreamEvent {
    /// Interpret one framed record.
    ///
    /// Parse failures degrade to [`StreamEvent::Unrecognized`]; this
    /// function never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let unrecognized = || Self::Unrecognized {
            raw: raw.to_string(),
        };

        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            return unrecognized();
        };

        match value.get("type").and_then(serde_json::Value::as_str) {
            Some("search_progress") => match value.get("title").and_then(|t| t.as_str()) {
                Some(title) => Self::SearchProgress {
                    title: title.to_string(),
                },
                None => unrecognized(),
            },
            Some("final_response") => match serde_json::from_value::<FinalResponse>(value) {
                Ok(response) => Self::Final(response),
                Err(_) => unrecognized(),
            },
            Some("error") => Self::ServerError {
                message: value
                    .get("error")
                    .and_then(|e| e.as_str())
                    .unwrap_or("the server reported an error")
                    .to_string(),
            },
            Some(_) => unrecognized(),
            // Untagged final: the server replies with a plain object when
            // progress streaming is off.
            None if value.get("response").is_some() => {
                match serde_json::from_value::<FinalResponse>(value) {
                    Ok(response) => Self::Final(response),
                    Err(_) => unrecognized(),
                }
            }
            None => unrecognized(),
        }
    }
}

/// Error body of a non-OK response: `{"error": "..."}`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message, if the server provided one.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response body of `GET /api/new`.
#[derive(Clone, Debug, Deserialize)]
pub struct NewConversation {
    /// The freshly created conversation id.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// One entry of the conversation index (`GET /api/history`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    /// Opaque conversation id.
    pub id: String,
    /// Display title, derived by the server from the first message.
    pub title: String,
    /// Creation timestamp as `YYYY-MM-DD HH:MM:SS`, possibly empty.
    #[serde(default)]
    pub timestamp: String,
}

impl HistoryEntry {
    /// The date part of the timestamp, for compact display.
    #[must_use]
    pub fn date(&self) -> &str {
        self.timestamp
            .split_whitespace()
            .next()
            .unwrap_or_default()
    }
}

/// One user/bot exchange of a stored conversation
/// (`GET /api/history/<id>`).
#[derive(Clone, Debug, Deserialize)]
pub struct ExchangeRecord {
    /// The user's message.
    pub user: String,
    /// The bot's reply.
    pub bot: String,
    /// Raw search results attached to the exchange, shape unspecified.
    #[serde(default)]
    pub search_results: Option<serde_json::Value>,
}

impl ExchangeRecord {
    /// Whether the stored exchange was grounded in web search results.
    ///
    /// The server stores either a formatted-results string or nothing,
    /// so this mirrors JSON truthiness rather than a fixed shape.
    #[must_use]
    pub fn has_search_results(&self) -> bool {
        match &self.search_results {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(serde_json::Value::Array(a)) => !a.is_empty(),
            Some(serde_json::Value::Bool(b)) => *b,
            Some(_) => true,
        }
    }
}
