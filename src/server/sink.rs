//! Channel-backed response sink
//!
//! Bridges the pipeline's `ResponseSink` writes into an axum streaming body.
//! Headers are collected until the handler commits them; after that the
//! status is on the wire and header changes are refused.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::warn;

use crate::ai::ResponseSink;
use crate::types::{FitError, Result};

pub struct ChannelSink {
    tx: Mutex<Option<mpsc::Sender<String>>>,
    headers: Mutex<Vec<(String, String)>>,
    committed: AtomicBool,
}

impl ChannelSink {
    /// Sink plus the receiving end that feeds the response body
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let sink = Self {
            tx: Mutex::new(Some(tx)),
            headers: Mutex::new(Vec::new()),
            committed: AtomicBool::new(false),
        };
        (sink, rx)
    }

    /// Take the collected headers and mark them sent
    pub fn commit_headers(&self) -> Vec<(String, String)> {
        self.committed.store(true, Ordering::SeqCst);
        std::mem::take(&mut *self.headers.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn sender(&self) -> Option<mpsc::Sender<String>> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    fn set_header(&self, name: &str, value: &str) -> Result<()> {
        if self.headers_sent() {
            return Err(FitError::Stream(format!(
                "cannot set header '{name}' after headers were sent"
            )));
        }
        let mut headers = self.headers.lock().unwrap_or_else(PoisonError::into_inner);
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    async fn write(&self, chunk: &str) -> Result<()> {
        let tx = self
            .sender()
            .ok_or_else(|| FitError::Stream("response already ended".to_string()))?;
        tx.send(chunk.to_string())
            .await
            .map_err(|_| FitError::Stream("client disconnected".to_string()))
    }

    async fn end(&self) -> Result<()> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn headers_sent(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }
}

/// Streaming response over `rx` with the committed headers applied
pub fn streaming_response(headers: Vec<(String, String)>, rx: mpsc::Receiver<String>) -> Response {
    let frames = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (Ok::<_, Infallible>(frame), rx))
    });

    let mut response = Body::from_stream(frames).into_response();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{DONE_FRAME, open_event_stream};

    #[tokio::test]
    async fn test_headers_refused_after_commit() {
        let (sink, _rx) = ChannelSink::channel(4);
        open_event_stream(&sink);
        let headers = sink.commit_headers();
        assert!(headers.contains(&("content-type".to_string(), "text/event-stream".to_string())));
        assert!(sink.headers_sent());
        assert!(sink.set_header("x-late", "1").is_err());
    }

    #[tokio::test]
    async fn test_write_then_end_closes_channel() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.write("data: a\n\n").await.unwrap();
        sink.write(DONE_FRAME).await.unwrap();
        sink.end().await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("data: a\n\n"));
        assert_eq!(rx.recv().await.as_deref(), Some(DONE_FRAME));
        assert_eq!(rx.recv().await, None);
        assert!(sink.write("late").await.is_err());
    }

    #[tokio::test]
    async fn test_write_fails_when_client_gone() {
        let (sink, rx) = ChannelSink::channel(4);
        drop(rx);
        assert!(matches!(
            sink.write("data: x\n\n").await,
            Err(FitError::Stream(_))
        ));
    }
}
