//! Chat Client
//!
//! The orchestrator: owns the transport, the session controller, and
//! the processing guard, and sequences one exchange from submission to
//! cleanup.
//!
//! # Exchange lifecycle
//!
//! ```text
//! guard (Idle + non-empty) -> show progress -> AwaitingResponse
//!   -> transport.send -> decode/dispatch until terminal
//!   -> [always] clear progress, back to Idle
//!   -> append reply / error, reconcile session, refresh history
//! ```
//!
//! The cleanup step runs on every exit path: success, structured
//! server error, network failure, and end-of-stream without a final
//! record. Errors never escape to the caller; they become visible
//! chat messages, and the user resubmits if they want a retry.

use crate::config::ClientConfig;
use crate::decode::StreamDecoder;
use crate::dispatch::{Dispatcher, ExchangeOutcome};
use crate::error::ClientError;
use crate::progress::SimulatedProgress;
use crate::protocol::OutgoingRequest;
use crate::render::RenderedReply;
use crate::session::SessionController;
use crate::surface::ChatSurface;
use crate::transport::Transport;

/// Whether a request is currently in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingState {
    /// Ready for a new submission.
    Idle,
    /// A request is in flight; submissions are rejected, not queued.
    AwaitingResponse,
}

/// A chat client bound to one surface's worth of state.
pub struct ChatClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    session: SessionController,
    processing: ProcessingState,
    web_search: bool,
}

impl<T: Transport> ChatClient<T> {
    /// Create a client over a transport.
    #[must_use]
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let web_search = config.enable_web_search;
        Self {
            transport,
            config,
            session: SessionController::new(),
            processing: ProcessingState::Idle,
            web_search,
        }
    }

    /// Current processing state.
    #[must_use]
    pub fn processing_state(&self) -> ProcessingState {
        self.processing
    }

    /// The session controller (current conversation pointer).
    #[must_use]
    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Whether web search is currently enabled for submissions.
    #[must_use]
    pub fn web_search(&self) -> bool {
        self.web_search
    }

    /// Submit a message and consume the streamed response.
    ///
    /// A blank message or a submission while a request is in flight is
    /// a logged no-op. Failures are appended to the surface as error
    /// messages rather than returned.
    pub async fn send_message<S: ChatSurface>(&mut self, text: &str, surface: &mut S) {
        let message = text.trim();
        if message.is_empty() {
            tracing::debug!("ignoring empty submission");
            return;
        }
        if self.processing == ProcessingState::AwaitingResponse {
            tracing::debug!("a request is already in flight, ignoring submission");
            return;
        }

        let request = OutgoingRequest::new(message, self.web_search);
        surface.append_user_message(message);
        surface.show_progress(message, self.web_search);

        self.processing = ProcessingState::AwaitingResponse;
        let result = self.run_exchange(&request, surface).await;

        // Finally-equivalent: runs on every exit path before any
        // terminal message is appended.
        surface.clear_progress();
        self.processing = ProcessingState::Idle;

        match result {
            Ok(outcome) => self.conclude(outcome, surface).await,
            Err(err) => {
                tracing::warn!(error = %err, "exchange failed");
                surface.append_error(&err.to_string());
            }
        }
    }

    /// The fallible part of an exchange: send, decode, dispatch.
    async fn run_exchange<S: ChatSurface>(
        &mut self,
        request: &OutgoingRequest,
        surface: &mut S,
    ) -> Result<ExchangeOutcome, ClientError> {
        let stream = self.transport.send(request).await?;
        let mut decoder = StreamDecoder::new(stream);

        let simulation = (request.enable_web_search && self.config.progress.simulate).then(|| {
            SimulatedProgress::new(
                &request.message,
                self.config.progress.initial_delay,
                self.config.progress.cadence,
            )
        });

        Dispatcher::new(simulation).run(&mut decoder, surface).await
    }

    /// Apply the terminal outcome: reply, error, or protocol gap.
    async fn conclude<S: ChatSurface>(&mut self, outcome: ExchangeOutcome, surface: &mut S) {
        if let Some(message) = outcome.server_error {
            surface.append_error(&message);
            return;
        }

        let Some(response) = outcome.final_response else {
            // The stream ended without a terminal record. Non-fatal,
            // but worth telling the user instead of hanging a spinner.
            tracing::warn!("stream ended without a final response");
            surface.append_error("the server closed the stream before answering");
            return;
        };

        surface.append_reply(&RenderedReply::from_final(&response));

        if self.session.on_final(response.conversation_id.as_deref()) {
            self.refresh_history(surface).await;
        }
    }

    /// Re-fetch the conversation index and hand it to the surface.
    ///
    /// Failures are logged, not surfaced; the list simply goes stale.
    pub async fn refresh_history<S: ChatSurface>(&self, surface: &mut S) {
        match self.transport.history_index().await {
            Ok(entries) => surface.render_history(&entries),
            Err(err) => tracing::warn!(error = %err, "failed to refresh history list"),
        }
    }

    /// Start a fresh conversation: ask the server for a new id, clear
    /// the conversation view, and refresh the history list.
    pub async fn new_conversation<S: ChatSurface>(&mut self, surface: &mut S) {
        match self.transport.new_conversation().await {
            Ok(Some(id)) => {
                surface.reset_conversation();
                self.session.adopt(&id);
                self.refresh_history(surface).await;
            }
            Ok(None) => tracing::warn!("server did not return a conversation id"),
            Err(err) => tracing::warn!(error = %err, "failed to create a new conversation"),
        }
    }

    /// Load a stored conversation into the view.
    ///
    /// Ignored while a request is in flight. An empty conversation
    /// leaves the view untouched.
    pub async fn load_conversation<S: ChatSurface>(&mut self, id: &str, surface: &mut S) {
        if self.processing == ProcessingState::AwaitingResponse {
            tracing::debug!("a request is in flight, not switching conversations");
            return;
        }

        match self.transport.conversation(id).await {
            Ok(exchanges) if exchanges.is_empty() => {
                tracing::debug!(conversation = id, "conversation has no messages");
            }
            Ok(exchanges) => {
                surface.reset_conversation();
                surface.show_conversation(&exchanges);
                self.session.adopt(id);
            }
            Err(err) => {
                tracing::warn!(conversation = id, error = %err, "failed to load conversation");
            }
        }
    }

    /// Toggle web search for future submissions and persist the
    /// preference server-side (best effort).
    pub async fn set_web_search(&mut self, enabled: bool) {
        self.web_search = enabled;
        if let Err(err) = self.transport.set_web_search(enabled).await {
            tracing::warn!(error = %err, "failed to persist web search preference");
        }
    }
}
