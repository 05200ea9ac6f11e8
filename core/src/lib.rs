//! Tidechat Core - Streaming chat client library
//!
//! Everything needed to talk to a tidechat server: the HTTP transport,
//! the newline-delimited JSON stream decoder, the per-request event
//! dispatcher, and the session/history plumbing. Frontends implement
//! [`surface::ChatSurface`] and drive a [`client::ChatClient`].
//!
//! # Architecture
//!
//! ```text
//! ChatClient
//!   |-- Transport (reqwest)  -> byte chunks
//!   |-- StreamDecoder        -> framed records -> StreamEvents
//!   |-- Dispatcher           -> state machine + simulated progress
//!   |-- SessionController    -> conversation id reconciliation
//!   `-- ChatSurface          -> frontend side effects
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod progress;
pub mod protocol;
pub mod render;
pub mod session;
pub mod surface;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_util;

pub use client::{ChatClient, ProcessingState};
pub use config::{load_config, ClientConfig};
pub use error::ClientError;
pub use protocol::{ExchangeRecord, FinalResponse, HistoryEntry, StreamEvent};
pub use render::RenderedReply;
pub use surface::ChatSurface;
pub use transport::{HttpTransport, Transport};
