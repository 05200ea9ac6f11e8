//! Stream Decoder
//!
//! Turns the raw byte stream of a response body into a sequence of
//! [`StreamEvent`]s.
//!
//! Records are newline-delimited JSON. Chunk boundaries carry no
//! meaning: a record may span chunks and a chunk may carry several
//! records, so the decoder buffers decoded text and frames on `\n`.
//! A trailing record without a final newline is flushed at
//! end-of-stream, which keeps servers that emit one bare record per
//! chunk working.
//!
//! UTF-8 decoding is stateful: a multi-byte character split across
//! chunk boundaries is held back until its remaining bytes arrive.

use bytes::Bytes;
use futures::StreamExt;

use crate::error::ClientError;
use crate::protocol::StreamEvent;
use crate::transport::ByteStream;

/// Incremental decoder over a response byte stream.
pub struct StreamDecoder {
    chunks: ByteStream,
    /// Decoded text not yet framed into a record.
    text: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    eof: bool,
}

impl StreamDecoder {
    /// Wrap a response byte stream.
    #[must_use]
    pub fn new(chunks: ByteStream) -> Self {
        Self {
            chunks,
            text: String::new(),
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Produce the next event, or `None` once the stream is exhausted.
    ///
    /// Unparseable records are returned as
    /// [`StreamEvent::Unrecognized`], never as errors. The only error
    /// is a transport failure mid-stream.
    ///
    /// Cancel-safe: the only await point is the underlying stream read.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>, ClientError> {
        loop {
            if let Some(event) = self.take_framed_event() {
                return Ok(Some(event));
            }

            if self.eof {
                let rest = self.text.trim();
                if rest.is_empty() {
                    return Ok(None);
                }
                let event = StreamEvent::parse(rest);
                self.text.clear();
                return Ok(Some(event));
            }

            match self.chunks.next().await {
                Some(Ok(bytes)) => self.push_bytes(&bytes),
                Some(Err(err)) => return Err(err),
                None => {
                    self.eof = true;
                    if !self.pending.is_empty() {
                        // The stream ended inside a multi-byte character.
                        let tail = std::mem::take(&mut self.pending);
                        self.text.push_str(&String::from_utf8_lossy(&tail));
                    }
                }
            }
        }
    }

    /// Pop the next complete newline-terminated record, skipping blank
    /// lines.
    fn take_framed_event(&mut self) -> Option<StreamEvent> {
        while let Some(pos) = self.text.find('\n') {
            let line: String = self.text.drain(..=pos).collect();
            let line = line.trim();
            if !line.is_empty() {
                return Some(StreamEvent::parse(line));
            }
        }
        None
    }

    /// Append a chunk, carrying an incomplete trailing UTF-8 sequence
    /// over to the next chunk.
    fn push_bytes(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let buffered = std::mem::take(&mut self.pending);
        let mut rest = buffered.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    return;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&rest[..valid_len]));
                    match err.error_len() {
                        // Invalid bytes in the middle: replace and keep going.
                        Some(bad_len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid_len + bad_len..];
                        }
                        // Incomplete sequence at the tail: wait for more bytes.
                        None => {
                            self.pending = rest[valid_len..].to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FinalResponse;
    use futures::stream;
    use pretty_assertions::assert_eq;

    fn decoder_for(chunks: Vec<&'static [u8]>) -> StreamDecoder {
        let items: Vec<Result<Bytes, ClientError>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        StreamDecoder::new(stream::iter(items).boxed())
    }

    async fn drain(decoder: &mut StreamDecoder) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = decoder.next_event().await.unwrap() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_one_record_per_chunk() {
        let mut decoder = decoder_for(vec![
            b"{\"type\":\"search_progress\",\"title\":\"foo\"}\n",
            b"{\"type\":\"final_response\",\"response\":\"bar\"}\n",
        ]);

        let events = drain(&mut decoder).await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::SearchProgress {
                title: "foo".to_string()
            }
        );
        assert!(matches!(&events[1], StreamEvent::Final(f) if f.text == "bar"));
    }

    #[tokio::test]
    async fn test_record_split_across_chunks() {
        let mut decoder = decoder_for(vec![
            b"{\"type\":\"search_pro",
            b"gress\",\"title\":\"foo\"}\n{\"type\":\"final_response\",",
            b"\"response\":\"bar\"}\n",
        ]);

        let events = drain(&mut decoder).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::SearchProgress {
                    title: "foo".to_string()
                },
                StreamEvent::Final(FinalResponse {
                    text: "bar".to_string(),
                    has_search_results: false,
                    conversation_id: None,
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        // "搜索" = e6 90 9c  e7 b4 a2, split inside the second character.
        let mut decoder = decoder_for(vec![
            b"{\"type\":\"search_progress\",\"title\":\"\xe6\x90\x9c\xe7",
            b"\xb4\xa2\"}\n",
        ]);

        let events = drain(&mut decoder).await;
        assert_eq!(
            events,
            vec![StreamEvent::SearchProgress {
                title: "搜索".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_unterminated_final_record_flushed_at_eof() {
        // One bare record per chunk, no trailing newline.
        let mut decoder = decoder_for(vec![b"{\"type\":\"final_response\",\"response\":\"bar\"}"]);

        let events = drain(&mut decoder).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Final(f) if f.text == "bar"));
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_abort_stream() {
        let mut decoder = decoder_for(vec![
            b"this is not json\n",
            b"{\"type\":\"final_response\",\"response\":\"bar\"}\n",
        ]);

        let events = drain(&mut decoder).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Unrecognized { .. }));
        assert!(matches!(&events[1], StreamEvent::Final(f) if f.text == "bar"));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let mut decoder = decoder_for(vec![
            b"\n\n{\"type\":\"final_response\",\"response\":\"bar\"}\n\n",
        ]);

        let events = drain(&mut decoder).await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream_propagates() {
        let items: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(
                b"{\"type\":\"search_progress\",\"title\":\"foo\"}\n",
            )),
            Err(ClientError::Network("connection reset".to_string())),
        ];
        let mut decoder = StreamDecoder::new(stream::iter(items).boxed());

        assert!(matches!(
            decoder.next_event().await.unwrap(),
            Some(StreamEvent::SearchProgress { .. })
        ));
        assert!(matches!(
            decoder.next_event().await,
            Err(ClientError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_bytes_replaced_not_fatal() {
        let mut decoder = decoder_for(vec![
            b"{\"bogus\": \"\xff\xfe\"}\n",
            b"{\"type\":\"final_response\",\"response\":\"bar\"}\n",
        ]);

        let events = drain(&mut decoder).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], StreamEvent::Final(f) if f.text == "bar"));
    }

    #[tokio::test]
    async fn test_empty_stream_yields_nothing() {
        let mut decoder = decoder_for(vec![]);
        assert!(decoder.next_event().await.unwrap().is_none());
        // Repeated polls after exhaustion stay exhausted.
        assert!(decoder.next_event().await.unwrap().is_none());
    }
}
