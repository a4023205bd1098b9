//! Newline-delimited JSON stream decoding.
//!
//! The chat backend answers with one JSON object per line. Each object may
//! carry a `done` flag and a `message.content` fragment. Raw chunks from the
//! transport are buffered as bytes and split on `\n`, so a multi-byte
//! character or a JSON object spanning two chunks is reassembled before
//! parsing.

use std::fmt::Display;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use super::client::TokenStream;
use crate::error::{AiError, Result};

/// Longest slice of an offending line quoted in a decode error.
const MAX_QUOTED_LINE: usize = 200;

/// One decoded event of the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// A text increment.
    Content(String),
    /// The terminal marker; nothing after it belongs to this reply.
    Done,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    /// Only a literal `true` ends the stream; absent or null does not.
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Incremental NDJSON decoder.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk. Ignored once the terminal marker was seen.
    pub fn push(&mut self, chunk: &[u8]) {
        if !self.finished {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Whether the terminal marker has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pop the next event out of the complete lines buffered so far.
    ///
    /// Returns `None` when no complete line remains. Blank lines and events
    /// carrying neither a flag nor content are skipped.
    pub fn next_event(&mut self) -> Option<Result<ChatStreamEvent>> {
        while !self.finished {
            let newline = self.buffer.iter().position(|b| *b == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let event: WireEvent = match serde_json::from_slice(line) {
                Ok(event) => event,
                Err(e) => {
                    self.finished = true;
                    self.buffer.clear();
                    return Some(Err(AiError::Decode(format!(
                        "{} in line {:?}",
                        e,
                        quote_line(line)
                    ))));
                }
            };

            if event.done == Some(true) {
                self.finished = true;
                self.buffer.clear();
                return Some(Ok(ChatStreamEvent::Done));
            }

            if let Some(content) = event.message.and_then(|m| m.content) {
                return Some(Ok(ChatStreamEvent::Content(content)));
            }
        }
        None
    }
}

fn quote_line(line: &[u8]) -> String {
    let text = String::from_utf8_lossy(line);
    match text.char_indices().nth(MAX_QUOTED_LINE) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

/// Turn a raw byte stream into a stream of text increments.
///
/// The returned stream ends at the first `done` event. A transport error or
/// an unparseable line is yielded once as an error and ends the stream.
pub fn decode_ndjson<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = NdjsonDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(AiError::Stream(e.to_string()));
                    return;
                }
            };

            decoder.push(chunk.as_ref());
            while let Some(event) = decoder.next_event() {
                match event {
                    Ok(ChatStreamEvent::Content(text)) => {
                        yield Ok(text);
                    }
                    Ok(ChatStreamEvent::Done) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        debug!("Backend stream closed without a done marker");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(
        parts: &[&'static str],
    ) -> impl Stream<Item = std::result::Result<&'static [u8], String>> + Send + 'static {
        let items: Vec<_> = parts.iter().map(|p| Ok(p.as_bytes())).collect();
        stream::iter(items)
    }

    async fn collect(stream: TokenStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_yields_content_until_done() {
        let body = "{\"message\":{\"content\":\"a\"}}\n{\"message\":{\"content\":\"b\"}}\n{\"done\":true}\n";
        let items = collect(decode_ndjson(chunks(&[body]))).await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_bytes_after_done_are_never_yielded() {
        let items = collect(decode_ndjson(chunks(&[
            "{\"message\":{\"content\":\"a\"}}\n{\"done\":true}\n{\"message\":{\"content\":\"late\"}}\n",
            "{\"message\":{\"content\":\"later\"}}\n",
        ])))
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["a"]);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let items = collect(decode_ndjson(chunks(&[
            "{\"message\":{\"con",
            "tent\":\"Hi \"}}\n{\"message\"",
            ":{\"content\":\"there\"}}\n{\"done\":tr",
            "ue}\n",
        ])))
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Hi ", "there"]);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let line = "{\"message\":{\"content\":\"caf\u{e9}\"}}\n{\"done\":true}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let parts: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(line[..split].to_vec()), Ok(line[split..].to_vec())];

        let items = collect(decode_ndjson(stream::iter(parts))).await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["caf\u{e9}"]);
    }

    #[tokio::test]
    async fn test_blank_lines_and_empty_events_are_skipped() {
        let items = collect(decode_ndjson(chunks(&[
            "\n  \r\n{\"model\":\"x\"}\n{\"message\":{\"role\":\"assistant\"}}\n{\"message\":{\"content\":\"ok\"}}\n{\"done\":true}\n",
        ])))
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_invalid_line_is_fatal() {
        let items = collect(decode_ndjson(chunks(&[
            "{\"message\":{\"content\":\"a\"}}\nnot json\n{\"message\":{\"content\":\"b\"}}\n",
        ])))
        .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(matches!(items[1], Err(AiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let parts: Vec<std::result::Result<&'static [u8], String>> = vec![
            Ok(b"{\"message\":{\"content\":\"Hi\"}}\n"),
            Err("connection reset".to_string()),
            Ok(b"{\"message\":{\"content\":\"never\"}}\n"),
        ];
        let items = collect(decode_ndjson(stream::iter(parts))).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Hi");
        match &items[1] {
            Err(AiError::Stream(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_without_done_ends_quietly() {
        let items = collect(decode_ndjson(chunks(&[
            "{\"message\":{\"content\":\"a\"}}\n{\"message\":{\"content\":\"partial",
        ])))
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["a"]);
    }

    #[test]
    fn test_done_event_wins_over_content() {
        let mut decoder = NdjsonDecoder::new();
        decoder.push(b"{\"done\":true,\"message\":{\"content\":\"tail\"}}\n");
        assert_eq!(decoder.next_event().unwrap().unwrap(), ChatStreamEvent::Done);
        assert!(decoder.is_finished());
        assert!(decoder.next_event().is_none());
    }

    #[tokio::test]
    async fn test_null_done_flag_is_not_terminal() {
        let items = collect(decode_ndjson(chunks(&[
            "{\"done\":null}\n{\"done\":null,\"message\":{\"content\":\"still\"}}\n{\"message\":null}\n{\"message\":{\"content\":\" here\"}}\n{\"done\":true}\n",
        ])))
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["still", " here"]);
    }

    #[test]
    fn test_push_after_finish_is_ignored() {
        let mut decoder = NdjsonDecoder::new();
        decoder.push(b"{\"done\":true}\n");
        assert_eq!(decoder.next_event().unwrap().unwrap(), ChatStreamEvent::Done);
        decoder.push(b"{\"message\":{\"content\":\"x\"}}\n");
        assert!(decoder.next_event().is_none());
    }

    #[test]
    fn test_decode_error_quotes_long_lines_truncated() {
        let mut decoder = NdjsonDecoder::new();
        let garbage = format!("{}\n", "x".repeat(500));
        decoder.push(garbage.as_bytes());
        match decoder.next_event() {
            Some(Err(AiError::Decode(msg))) => assert!(msg.contains("...")),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
