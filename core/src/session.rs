//! Session Tracking
//!
//! Tracks which server-side conversation the client is currently in,
//! so a completed exchange is reconciled into the right history entry.
//! Conversation ids are opaque strings minted by the server.

/// Pointer to the current server-side conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationRef {
    /// Opaque server-assigned id.
    pub id: String,
}

/// Tracks the active conversation across exchanges.
#[derive(Debug, Default)]
pub struct SessionController {
    current: Option<ConversationRef>,
}

impl SessionController {
    /// Create a controller with no active conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current conversation, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ConversationRef> {
        self.current.as_ref()
    }

    /// Whether `id` is the current conversation.
    #[must_use]
    pub fn is_current(&self, id: &str) -> bool {
        self.current.as_ref().is_some_and(|c| c.id == id)
    }

    /// Reconcile a completed exchange.
    ///
    /// Returns `true` when a new id was adopted, meaning the history
    /// list should be refreshed. An absent id or the current id leaves
    /// the session untouched.
    pub fn on_final(&mut self, conversation_id: Option<&str>) -> bool {
        match conversation_id {
            Some(id) if !self.is_current(id) => {
                tracing::debug!(conversation = id, "adopting conversation id");
                self.adopt(id);
                true
            }
            _ => false,
        }
    }

    /// Switch to a known conversation (new chat, history selection).
    pub fn adopt(&mut self, id: &str) {
        self.current = Some(ConversationRef { id: id.to_string() });
    }

    /// Forget the current conversation.
    ///
    /// Callers must ensure no request is in flight; this is not
    /// guarded here.
    pub fn start_new_session(&mut self) {
        self.current = None;
    }
}
