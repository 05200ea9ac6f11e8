//! Event Dispatcher
//!
//! The streaming-response state machine. Consumes decoded
//! [`StreamEvent`]s in arrival order and drives surface side effects:
//!
//! ```text
//! Listening --SearchProgress--> Listening   (update progress text)
//! Listening --Unrecognized----> Listening   (log, ignore)
//! Listening --Final-----------> Terminated  (record outcome)
//! Listening --ServerError-----> Terminated  (record outcome)
//! ```
//!
//! The dispatcher owns the per-request context: its state and the
//! optional simulated-progress ticker. Dropping it (on any exit path)
//! releases the ticker. Terminal side effects - removing the progress
//! indicator, appending the reply or error, reconciling the session -
//! are sequenced by [`crate::client::ChatClient`] after the dispatcher
//! returns, so they run exactly once on every exit path.

use crate::decode::StreamDecoder;
use crate::error::ClientError;
use crate::progress::SimulatedProgress;
use crate::protocol::{FinalResponse, StreamEvent};
use crate::surface::ChatSurface;

/// Dispatcher state for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    /// Consuming events.
    Listening,
    /// A terminal event arrived; further events are ignored.
    Terminated,
}

/// What the stream produced, once it concluded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeOutcome {
    /// The terminal answer, if one arrived.
    pub final_response: Option<FinalResponse>,
    /// A mid-stream server error, if one arrived instead.
    pub server_error: Option<String>,
}

impl ExchangeOutcome {
    /// Whether the stream ended without any terminal record.
    #[must_use]
    pub fn is_protocol_gap(&self) -> bool {
        self.final_response.is_none() && self.server_error.is_none()
    }
}

/// Per-request event dispatcher.
pub struct Dispatcher {
    state: DispatchState,
    outcome: ExchangeOutcome,
    progress: Option<SimulatedProgress>,
}

impl Dispatcher {
    /// Create a dispatcher, optionally with a simulated progress
    /// source to run until real progress arrives.
    #[must_use]
    pub fn new(progress: Option<SimulatedProgress>) -> Self {
        Self {
            state: DispatchState::Listening,
            outcome: ExchangeOutcome::default(),
            progress,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Pump the decoder until a terminal event or end-of-stream,
    /// interleaving simulated progress ticks between reads.
    ///
    /// Errors are transport failures only; malformed records never
    /// surface here.
    pub async fn run<S: ChatSurface>(
        mut self,
        decoder: &mut StreamDecoder,
        surface: &mut S,
    ) -> Result<ExchangeOutcome, ClientError> {
        while self.state == DispatchState::Listening {
            let event = match &mut self.progress {
                Some(sim) if sim.is_active() => {
                    tokio::select! {
                        event = decoder.next_event() => event?,
                        title = sim.tick() => {
                            surface.update_progress(&title);
                            continue;
                        }
                    }
                }
                _ => decoder.next_event().await?,
            };

            match event {
                Some(event) => self.handle_event(event, surface),
                None => break,
            }
        }

        Ok(self.outcome)
    }

    /// Apply one event to the state machine.
    pub fn handle_event<S: ChatSurface>(&mut self, event: StreamEvent, surface: &mut S) {
        if self.state == DispatchState::Terminated {
            tracing::debug!("ignoring stream record after terminal event");
            return;
        }

        match event {
            StreamEvent::SearchProgress { title } => {
                // Real progress arrived; the simulation stands down.
                if let Some(sim) = &mut self.progress {
                    sim.suppress();
                }
                surface.update_progress(&title);
            }
            StreamEvent::Final(response) => {
                tracing::debug!(
                    chars = response.text.len(),
                    searched = response.has_search_results,
                    "final response received"
                );
                self.outcome.final_response = Some(response);
                self.state = DispatchState::Terminated;
            }
            StreamEvent::ServerError { message } => {
                self.outcome.server_error = Some(message);
                self.state = DispatchState::Terminated;
            }
            StreamEvent::Unrecognized { raw } => {
                tracing::warn!(record = %raw, "ignoring unparseable stream record");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::RecordingSurface;
    use bytes::Bytes;
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn decoder_for(records: &[&str]) -> StreamDecoder {
        let items: Vec<Result<Bytes, ClientError>> = records
            .iter()
            .map(|r| Ok(Bytes::from(format!("{r}\n"))))
            .collect();
        StreamDecoder::new(stream::iter(items).boxed())
    }

    fn final_event(text: &str) -> StreamEvent {
        StreamEvent::Final(FinalResponse {
            text: text.to_string(),
            has_search_results: false,
            conversation_id: None,
        })
    }

    #[test]
    fn test_progress_updates_track_latest_title() {
        let mut dispatcher = Dispatcher::new(None);
        let mut surface = RecordingSurface::default();

        for title in ["foo", "foo", "baz"] {
            dispatcher.handle_event(
                StreamEvent::SearchProgress {
                    title: title.to_string(),
                },
                &mut surface,
            );
        }

        assert_eq!(dispatcher.state(), DispatchState::Listening);
        assert_eq!(surface.progress_updates, vec!["foo", "foo", "baz"]);
        assert_eq!(surface.progress_updates.last().unwrap(), "baz");
    }

    #[test]
    fn test_final_terminates() {
        let mut dispatcher = Dispatcher::new(None);
        let mut surface = RecordingSurface::default();

        dispatcher.handle_event(final_event("bar"), &mut surface);

        assert_eq!(dispatcher.state(), DispatchState::Terminated);
    }

    #[test]
    fn test_second_final_is_noop() {
        let mut dispatcher = Dispatcher::new(None);
        let mut surface = RecordingSurface::default();

        dispatcher.handle_event(final_event("first"), &mut surface);
        dispatcher.handle_event(final_event("second"), &mut surface);
        dispatcher.handle_event(
            StreamEvent::SearchProgress {
                title: "late".to_string(),
            },
            &mut surface,
        );

        assert_eq!(
            dispatcher.outcome.final_response.as_ref().unwrap().text,
            "first"
        );
        assert!(surface.progress_updates.is_empty());
    }

    #[test]
    fn test_unrecognized_is_self_loop() {
        let mut dispatcher = Dispatcher::new(None);
        let mut surface = RecordingSurface::default();

        dispatcher.handle_event(
            StreamEvent::Unrecognized {
                raw: "garbage".to_string(),
            },
            &mut surface,
        );

        assert_eq!(dispatcher.state(), DispatchState::Listening);
        assert!(surface.progress_updates.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_at_final() {
        let mut decoder = decoder_for(&[
            r#"{"type":"search_progress","title":"foo"}"#,
            r#"{"type":"final_response","response":"bar"}"#,
            r#"{"type":"search_progress","title":"after the end"}"#,
        ]);
        let mut surface = RecordingSurface::default();

        let outcome = Dispatcher::new(None)
            .run(&mut decoder, &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome.final_response.unwrap().text, "bar");
        assert_eq!(surface.progress_updates, vec!["foo"]);
    }

    #[tokio::test]
    async fn test_run_end_of_stream_without_final_is_gap() {
        let mut decoder = decoder_for(&[r#"{"type":"search_progress","title":"foo"}"#]);
        let mut surface = RecordingSurface::default();

        let outcome = Dispatcher::new(None)
            .run(&mut decoder, &mut surface)
            .await
            .unwrap();

        assert!(outcome.is_protocol_gap());
    }

    #[tokio::test]
    async fn test_run_server_error_record() {
        let mut decoder = decoder_for(&[r#"{"type":"error","error":"search failed"}"#]);
        let mut surface = RecordingSurface::default();

        let outcome = Dispatcher::new(None)
            .run(&mut decoder, &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome.server_error.as_deref(), Some("search failed"));
        assert!(outcome.final_response.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_progress_ticks_while_stream_is_quiet() {
        // A stream that stays silent; the simulation should fill in.
        let items: Vec<Result<Bytes, ClientError>> = vec![Ok(Bytes::from_static(
            b"{\"type\":\"final_response\",\"response\":\"bar\"}\n",
        ))];
        let quiet = stream::iter(items)
            .then(|item| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                item
            })
            .boxed();
        let mut decoder = StreamDecoder::new(quiet);
        let mut surface = RecordingSurface::default();

        let sim = SimulatedProgress::new(
            "rust",
            Duration::from_secs(1),
            Duration::from_secs(3),
        );
        let outcome = Dispatcher::new(Some(sim))
            .run(&mut decoder, &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome.final_response.unwrap().text, "bar");
        // Ticks at 1s, 4s, 7s, 10s before the stream answers.
        assert!(
            surface.progress_updates.len() >= 3,
            "updates: {:?}",
            surface.progress_updates
        );
        assert!(surface.progress_updates[0].contains("rust"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_progress_suppresses_simulation() {
        let items: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(
                b"{\"type\":\"search_progress\",\"title\":\"real title\"}\n",
            )),
            Ok(Bytes::from_static(
                b"{\"type\":\"final_response\",\"response\":\"bar\"}\n",
            )),
        ];
        // First record immediately, final after a long pause during
        // which the (suppressed) simulation must stay quiet.
        let mut delayed = false;
        let slow_tail = stream::iter(items)
            .then(move |item| {
                let wait = if delayed { Duration::from_secs(30) } else { Duration::ZERO };
                delayed = true;
                async move {
                    tokio::time::sleep(wait).await;
                    item
                }
            })
            .boxed();
        let mut decoder = StreamDecoder::new(slow_tail);
        let mut surface = RecordingSurface::default();

        let sim = SimulatedProgress::new(
            "rust",
            Duration::from_secs(1),
            Duration::from_secs(3),
        );
        let outcome = Dispatcher::new(Some(sim))
            .run(&mut decoder, &mut surface)
            .await
            .unwrap();

        assert!(outcome.final_response.is_some());
        assert_eq!(surface.progress_updates, vec!["real title"]);
    }
}
