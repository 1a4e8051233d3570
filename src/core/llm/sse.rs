//! Server-sent events decoding for streamed completions.
//!
//! Both supported providers frame their streams as `data: <json>` events
//! separated by blank lines and finish with `data: [DONE]`.

use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest::Response;

use super::base::{DeltaStream, LLMError};

const DONE_MARKER: &str = "[DONE]";

/// Incremental SSE parser that only surfaces `data` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every event completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.handle_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.handle_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

/// Turn a raw SSE byte stream into reply deltas.
///
/// `extract` maps one event payload to its text delta; `Ok(None)` skips the
/// event. The stream ends at `[DONE]` or when the body ends.
pub fn decode_deltas<S, B, E, F>(body: S, extract: F) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: Fn(&str) -> Result<Option<String>, LLMError> + Send + 'static,
{
    Box::pin(stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::new();

        'outer: while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LLMError::NetworkError(format!("Stream interrupted: {e}")));
                    return;
                }
            };
            for event in decoder.push(chunk.as_ref()) {
                if event.trim() == DONE_MARKER {
                    break 'outer;
                }
                match extract(&event) {
                    Ok(Some(delta)) => yield Ok(delta),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if let Some(event) = decoder.finish()
            && event.trim() != DONE_MARKER
        {
            match extract(&event) {
                Ok(Some(delta)) => yield Ok(delta),
                Ok(None) => {}
                Err(e) => yield Err(e),
            }
        }
    })
}

/// Convenience wrapper over a successful `reqwest` response.
pub fn response_deltas<F>(response: Response, extract: F) -> DeltaStream
where
    F: Fn(&str) -> Result<Option<String>, LLMError> + Send + 'static,
{
    decode_deltas(response.bytes_stream(), extract)
}
