// ABOUTME: Shared SSE (Server-Sent Events) line-buffering parser for model streaming replies
// ABOUTME: Handles partial lines across TCP boundaries and multiple events per chunk
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! # SSE Stream Parser
//!
//! A line-buffering parser for the Server-Sent Events framing used by
//! OpenAI-compatible streaming endpoints. Solves two correctness issues:
//!
//! 1. **Multiple events per TCP chunk**: when network buffers batch several
//!    SSE events into a single `bytes_stream()` chunk, all events are emitted
//!    (not just the first).
//!
//! 2. **Partial JSON across TCP boundaries**: when a JSON payload is split
//!    across two TCP chunks, the line buffer accumulates partial data until a
//!    complete line arrives.
//!
//! The `parse_data` closure supplied to [`create_delta_stream`] converts raw
//! JSON strings into deltas; the SSE framing (line buffering, `data:` prefix
//! stripping, `[DONE]` detection) is handled once here.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{Stream, StreamExt};
use tracing::warn;

use super::{ModelStream, StreamDelta};

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the JSON string (prefix stripped)
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Line-buffering SSE parser that handles partial lines across TCP chunk boundaries
///
/// SSE streams are newline-delimited. TCP does not guarantee alignment between
/// network chunks and SSE event boundaries. This parser buffers incomplete
/// lines and emits complete events only when a full line (terminated by `\n`)
/// is available.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Accumulated bytes not yet terminated by a newline
    buffer: String,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from a TCP chunk, returning any complete SSE events
    ///
    /// Complete lines are extracted and parsed; any trailing partial line
    /// remains buffered for the next `feed()` call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let text = String::from_utf8_lossy(bytes);
        self.buffer.push_str(&text);

        let mut events = Vec::new();

        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].trim_end_matches('\r').to_owned();
            self.buffer = self.buffer[newline_pos + 1..].to_owned();

            if let Some(event) = Self::parse_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush any remaining buffered content as a final event
    ///
    /// Called when the byte stream ends with a partial line still buffered
    /// (no trailing newline).
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        Self::parse_line(&remaining).into_iter().collect()
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        let trimmed = line.trim();

        // Empty lines are SSE event separators
        if trimmed.is_empty() {
            return None;
        }

        if trimmed == "data: [DONE]" {
            return Some(SseEvent::Done);
        }

        if let Some(data) = trimmed.strip_prefix("data: ") {
            if !data.trim().is_empty() {
                return Some(SseEvent::Data(data.to_owned()));
            }
        }

        // Non-data SSE fields (event:, id:, retry:, comments) are ignored
        None
    }
}

/// Internal state for the SSE stream unfold
struct SseStreamState {
    parser: SseLineBuffer,
    pending: VecDeque<StreamDelta>,
    stream_ended: bool,
}

/// Create a properly-buffered delta stream from a raw byte stream
///
/// Wraps a `reqwest` byte stream with SSE line buffering. The `parse_data`
/// closure converts endpoint JSON strings into deltas; return `None` to skip
/// events that carry no text. Read errors are logged and end the stream: the
/// gateway contract has no mid-stream error channel, whatever arrived so far
/// is the reply.
pub fn create_delta_stream<S, F>(byte_stream: S, parse_data: F) -> ModelStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<StreamDelta> + Send + 'static,
{
    let state = SseStreamState {
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        stream_ended: false,
    };

    // Unfold maintains parser state across async iterations. Each iteration
    // either drains a pending delta or reads the next TCP chunk.
    let stream = unfold(
        (
            Box::pin(byte_stream)
                as Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
            state,
            parse_data,
        ),
        |(mut byte_stream, mut state, parse_data)| async move {
            loop {
                // Drain pending deltas first (multiple SSE events per TCP chunk)
                if let Some(delta) = state.pending.pop_front() {
                    return Some((delta, (byte_stream, state, parse_data)));
                }

                if state.stream_ended {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        for event in state.parser.feed(&bytes) {
                            match event {
                                SseEvent::Data(json_str) => {
                                    if let Some(delta) = parse_data(&json_str) {
                                        state.pending.push_back(delta);
                                    }
                                }
                                SseEvent::Done => {
                                    state.stream_ended = true;
                                }
                            }
                        }
                        // Loop to drain pending deltas
                    }
                    Some(Err(e)) => {
                        warn!("Model stream read error, ending stream: {e}");
                        state.stream_ended = true;
                    }
                    None => {
                        // Byte stream ended without [DONE]; flush the buffer
                        state.stream_ended = true;
                        for event in state.parser.flush() {
                            if let SseEvent::Data(json_str) = event {
                                if let Some(delta) = parse_data(&json_str) {
                                    state.pending.push_back(delta);
                                }
                            }
                        }
                    }
                }
            }
        },
    );

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_event() {
        let mut buffer = SseLineBuffer::new();
        let events = buffer.feed(b"data: {\"x\":1}\n\n");
        assert_eq!(events, vec![SseEvent::Data("{\"x\":1}".to_owned())]);
    }

    #[test]
    fn test_multiple_events_per_chunk() {
        let mut buffer = SseLineBuffer::new();
        let events = buffer.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent::Data("{\"a\":1}".to_owned()),
                SseEvent::Data("{\"b\":2}".to_owned()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn test_partial_line_across_chunks() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.feed(b"data: {\"content\":\"hel").is_empty());
        let events = buffer.feed(b"lo\"}\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"content\":\"hello\"}".to_owned())]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut buffer = SseLineBuffer::new();
        let events = buffer.feed(b"data: {\"x\":1}\r\n\r\n");
        assert_eq!(events, vec![SseEvent::Data("{\"x\":1}".to_owned())]);
    }

    #[test]
    fn test_non_data_fields_ignored() {
        let mut buffer = SseLineBuffer::new();
        let events = buffer.feed(b"event: message\nid: 7\nretry: 100\n: comment\ndata: {}\n");
        assert_eq!(events, vec![SseEvent::Data("{}".to_owned())]);
    }

    #[test]
    fn test_flush_emits_trailing_partial_line() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.feed(b"data: {\"x\":1}").is_empty());
        let events = buffer.flush();
        assert_eq!(events, vec![SseEvent::Data("{\"x\":1}".to_owned())]);
        assert!(buffer.flush().is_empty());
    }

    #[tokio::test]
    async fn test_delta_stream_stops_at_done() {
        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(b"data: one\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n")),
            Ok(Bytes::from_static(b"data: two\n")),
        ];
        let stream = create_delta_stream(tokio_stream::iter(chunks), |data| {
            Some(StreamDelta {
                content: data.to_owned(),
                reasoning: String::new(),
            })
        });
        let collected: Vec<StreamDelta> = stream.collect().await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].content, "one");
    }

    #[tokio::test]
    async fn test_delta_stream_skips_none() {
        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(b"data: keep\ndata: skip\ndata: keep\n")),
        ];
        let stream = create_delta_stream(tokio_stream::iter(chunks), |data| {
            (data != "skip").then(|| StreamDelta {
                content: data.to_owned(),
                reasoning: String::new(),
            })
        });
        let collected: Vec<StreamDelta> = stream.collect().await;
        assert_eq!(collected.len(), 2);
    }
}
