//! SSE streaming response parser for OpenAI-compatible chat completions.
//!
//! Splits the HTTP body into server-sent events (`data: …` followed by a
//! blank line, LF or CRLF), parses each payload as a completion chunk and
//! yields `choices[0].delta.content`.
//! `data: [DONE]` ends the stream.

use std::fmt::Display;

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use super::DeltaStream;
use crate::types::{FitError, Result};

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Content fragment
    Delta(String),
    /// Terminal marker
    Done,
    /// Keep-alive, comment, or a chunk without content
    Skip,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// Parse a single SSE event (may contain multiple `data:` lines)
pub fn parse_sse_event(event: &str) -> Result<SseEvent> {
    let mut data = String::new();

    for line in event.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(payload) = line.strip_prefix("data:") {
            let payload = payload.trim();
            if payload == "[DONE]" {
                return Ok(SseEvent::Done);
            }
            data.push_str(payload);
        }
    }

    if data.is_empty() {
        return Ok(SseEvent::Skip);
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(&data)
        .map_err(|e| FitError::Stream(format!("failed to parse SSE chunk: {e}")))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(SseEvent::Delta)
        .unwrap_or(SseEvent::Skip))
}

/// Blank-line separators ending an event, CRLF form first
const EVENT_SEPARATORS: &[&[u8]] = &[b"\r\n\r\n", b"\n\n", b"\r\r"];

/// Pop the first complete event off `buffer`
fn take_event(buffer: &mut Vec<u8>) -> Option<String> {
    let (end, separator_len) = EVENT_SEPARATORS
        .iter()
        .filter_map(|sep| {
            buffer
                .windows(sep.len())
                .position(|w| w == *sep)
                .map(|pos| (pos, sep.len()))
        })
        .min_by_key(|(pos, _)| *pos)?;
    let event = String::from_utf8_lossy(&buffer[..end]).into_owned();
    buffer.drain(..end + separator_len);
    Some(event)
}

struct StreamState<S> {
    bytes: std::pin::Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Turn a raw SSE byte stream into content deltas.
///
/// Events may be split across network chunks; bytes are buffered until a
/// blank line completes an event.
pub fn delta_stream<S, B, E>(bytes: S) -> DeltaStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = StreamState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        finished: false,
    };

    let deltas = stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            if let Some(event) = take_event(&mut state.buffer) {
                match parse_sse_event(&event) {
                    Ok(SseEvent::Delta(content)) => return Some((Ok(content), state)),
                    Ok(SseEvent::Done) => return None,
                    Ok(SseEvent::Skip) => continue,
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(FitError::Stream(format!("stream read error: {e}"))),
                        state,
                    ));
                }
                None => {
                    // Connection closed without [DONE]; flush a trailing event
                    state.finished = true;
                    let rest = String::from_utf8_lossy(&state.buffer).into_owned();
                    state.buffer.clear();
                    return match parse_sse_event(rest.trim()) {
                        Ok(SseEvent::Delta(content)) => Some((Ok(content), state)),
                        Ok(SseEvent::Done | SseEvent::Skip) => None,
                        Err(e) => Some((Err(e), state)),
                    };
                }
            }
        }
    });

    Box::pin(deltas)
}
