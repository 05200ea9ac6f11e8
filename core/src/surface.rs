//! Chat Surface
//!
//! The UI side-effect sink. Surfaces are dumb renderers: the client
//! tells them what happened and they draw it. Nothing in the core
//! depends on how a surface is implemented, so the same client drives
//! a terminal, a GUI, or a recording fake in tests.

use crate::protocol::{ExchangeRecord, HistoryEntry};
use crate::render::RenderedReply;

/// Rendering operations a UI must provide.
pub trait ChatSurface {
    /// Append the user's message to the conversation view.
    fn append_user_message(&mut self, text: &str);

    /// Show the transient progress indicator for a submitted query.
    ///
    /// `web_search` selects the searching vs. thinking presentation.
    fn show_progress(&mut self, query: &str, web_search: bool);

    /// Update the progress indicator's text to reference `title`.
    fn update_progress(&mut self, title: &str);

    /// Remove the progress indicator and release any animation
    /// resource. Must be idempotent.
    fn clear_progress(&mut self);

    /// Append a completed reply to the conversation view.
    fn append_reply(&mut self, reply: &RenderedReply);

    /// Append a visible error message to the conversation view.
    fn append_error(&mut self, message: &str);

    /// Replace the sidebar history list.
    fn render_history(&mut self, entries: &[HistoryEntry]);

    /// Clear the conversation view (new or switched conversation).
    fn reset_conversation(&mut self);

    /// Show a stored conversation after a reset.
    fn show_conversation(&mut self, exchanges: &[ExchangeRecord]);
}
