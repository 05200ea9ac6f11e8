//! Test Surface
//!
//! A recording [`ChatSurface`] shared by the unit tests.

use crate::protocol::{ExchangeRecord, HistoryEntry};
use crate::render::RenderedReply;
use crate::surface::ChatSurface;

/// Records every surface call for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub user_messages: Vec<String>,
    pub progress_shown: Vec<(String, bool)>,
    pub progress_updates: Vec<String>,
    pub progress_clears: u32,
    pub replies: Vec<RenderedReply>,
    pub errors: Vec<String>,
    pub history_renders: Vec<Vec<HistoryEntry>>,
    pub resets: u32,
    pub shown_conversations: Vec<usize>,
}

impl RecordingSurface {
    /// Whether a progress indicator is currently visible.
    pub fn progress_visible(&self) -> bool {
        self.progress_shown.len() as u32 > self.progress_clears
    }
}

impl ChatSurface for RecordingSurface {
    fn append_user_message(&mut self, text: &str) {
        self.user_messages.push(text.to_string());
    }

    fn show_progress(&mut self, query: &str, web_search: bool) {
        self.progress_shown.push((query.to_string(), web_search));
    }

    fn update_progress(&mut self, title: &str) {
        self.progress_updates.push(title.to_string());
    }

    fn clear_progress(&mut self) {
        self.progress_clears += 1;
    }

    fn append_reply(&mut self, reply: &RenderedReply) {
        self.replies.push(reply.clone());
    }

    fn append_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.history_renders.push(entries.to_vec());
    }

    fn reset_conversation(&mut self) {
        self.resets += 1;
    }

    fn show_conversation(&mut self, exchanges: &[ExchangeRecord]) {
        self.shown_conversations.push(exchanges.len());
    }
}
