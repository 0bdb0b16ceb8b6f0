//! Streaming Response Sink
//!
//! Chunk-oriented writer the streaming path reports into. Events are framed
//! as server-sent events: one `delta` event per forwarded model fragment,
//! a single `complete` event with the final outcome, then `[DONE]`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::types::{GenerationOutcome, Result};

/// End-of-stream marker frame
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Headers announcing an event stream
pub const EVENT_STREAM_HEADERS: &[(&str, &str)] = &[
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
    ("x-accel-buffering", "no"),
];

/// Writable sink for incremental responses
#[async_trait]
pub trait ResponseSink: Send + Sync {
    /// Set response header metadata. Fails once headers were sent.
    fn set_header(&self, name: &str, value: &str) -> Result<()>;

    /// Write one chunk of text
    async fn write(&self, chunk: &str) -> Result<()>;

    /// Signal the end of the response
    async fn end(&self) -> Result<()>;

    /// Whether headers (and so a status) have already gone out
    fn headers_sent(&self) -> bool;
}

/// Server-sent event payloads
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent<'a> {
    Delta { content: &'a str },
    Complete { result: &'a GenerationOutcome },
}

impl StreamEvent<'_> {
    /// `data: <json>\n\n`
    pub fn frame(&self) -> Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// Announce an event stream unless a status already went out
pub fn open_event_stream(sink: &dyn ResponseSink) {
    if sink.headers_sent() {
        return;
    }
    for (name, value) in EVENT_STREAM_HEADERS {
        if let Err(e) = sink.set_header(name, value) {
            warn!(header = name, error = %e, "Failed to set stream header");
        }
    }
}

/// Write the `complete` event and the end marker, then end the response.
/// Write failures are logged and swallowed; the client may already be gone.
pub async fn finish_stream(sink: &dyn ResponseSink, outcome: &GenerationOutcome) {
    open_event_stream(sink);

    let complete = StreamEvent::Complete { result: outcome };
    match complete.frame() {
        Ok(frame) => {
            if let Err(e) = sink.write(&frame).await {
                warn!(error = %e, "Failed to write complete event");
            }
        }
        Err(e) => warn!(error = %e, "Failed to encode complete event"),
    }

    if let Err(e) = sink.write(DONE_FRAME).await {
        warn!(error = %e, "Failed to write end marker");
    }
    if let Err(e) = sink.end().await {
        warn!(error = %e, "Failed to end stream");
    }
}
