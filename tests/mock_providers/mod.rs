//! Scripted in-memory providers for integration tests
//!
//! Each provider plays back a fixed script and records how it was called,
//! so tests can drive whole conversations without network access.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use voxchat_gateway::core::conversation::{
    Collaborators, ConversationState, InboundFrame, OutboundFrame, SessionCoordinator,
    SessionSettings,
};
use voxchat_gateway::core::llm::{BaseLLM, DeltaStream, GenerationRequest, LLMError, LLMResult};
use voxchat_gateway::core::stt::{BaseSTT, STTError};
use voxchat_gateway::core::tts::{BaseTTS, TTSError, TTSResult};

/// Plays back queued transcripts, one per call.
#[derive(Default)]
pub struct ScriptedSTT {
    transcripts: Mutex<VecDeque<Result<String, STTError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSTT {
    pub fn new(transcripts: Vec<Result<String, STTError>>) -> Self {
        Self {
            transcripts: Mutex::new(transcripts.into()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseSTT for ScriptedSTT {
    async fn transcribe(&self, _audio: Bytes) -> Result<String, STTError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(STTError::ProviderError("script exhausted".to_string())))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// One scripted reply: deltas, optionally followed by a stream error.
#[derive(Clone, Default)]
pub struct Reply {
    pub deltas: Vec<String>,
    pub error: Option<LLMError>,
    /// Pause before each delta
    pub pace: Duration,
    /// Never finish after the last delta
    pub hang: bool,
}

impl Reply {
    pub fn text(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing(deltas: &[&str], error: LLMError) -> Self {
        Self {
            error: Some(error),
            ..Self::text(deltas)
        }
    }

    pub fn paced(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

/// Plays back queued replies and records every request.
#[derive(Default)]
pub struct ScriptedLLM {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    /// Signalled when a hanging reply's stream is dropped
    pub dropped: Arc<Notify>,
}

impl ScriptedLLM {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Fires `notify` when dropped.
struct DropSignal(Arc<Notify>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        self.0.notify_one();
    }
}

#[async_trait]
impl BaseLLM for ScriptedLLM {
    async fn generate_stream(&self, request: GenerationRequest) -> LLMResult<DeltaStream> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LLMError::ProviderError("script exhausted".to_string()))?;

        let signal = DropSignal(self.dropped.clone());
        let stream = async_stream::stream! {
            let _signal = signal;
            for delta in reply.deltas {
                if !reply.pace.is_zero() {
                    tokio::time::sleep(reply.pace).await;
                }
                yield Ok(delta);
            }
            if let Some(error) = reply.error {
                yield Err(error);
            }
            if reply.hang {
                std::future::pending::<()>().await;
            }
        };
        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Returns the fragment text as audio bytes.
///
/// Texts containing a configured marker fail; per-text delays let tests
/// finish later fragments first.
#[derive(Default)]
pub struct ScriptedTTS {
    fail_marker: Option<String>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTTS {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn with_delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseTTS for ScriptedTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes> {
        self.calls.lock().unwrap().push(text.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(text).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.fail_marker {
            Some(marker) if text.contains(marker.as_str()) => {
                Err(TTSError::ProviderError(format!("cannot say {text:?}")))
            }
            _ => Ok(Bytes::from(text.as_bytes().to_vec())),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A running coordinator plus the client's ends of its channels.
pub struct Session {
    pub inbound: futures::channel::mpsc::UnboundedSender<InboundFrame>,
    pub outbound: mpsc::Receiver<OutboundFrame>,
    pub cancel: CancellationToken,
    pub handle: tokio::task::JoinHandle<ConversationState>,
}

impl Session {
    pub fn start(
        stt: Arc<ScriptedSTT>,
        llm: Arc<ScriptedLLM>,
        tts: Arc<ScriptedTTS>,
        settings: SessionSettings,
    ) -> Self {
        Self::start_with_capacity(stt, llm, tts, settings, 256)
    }

    /// Start with a small outbound buffer so the coordinator stalls until
    /// the test reads.
    pub fn start_with_capacity(
        stt: Arc<ScriptedSTT>,
        llm: Arc<ScriptedLLM>,
        tts: Arc<ScriptedTTS>,
        settings: SessionSettings,
        capacity: usize,
    ) -> Self {
        let (inbound_tx, inbound_rx) = futures::channel::mpsc::unbounded();
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();

        let collaborators = Collaborators { stt, llm, tts };
        let coordinator = SessionCoordinator::new(
            "test-session",
            collaborators,
            Arc::new(settings),
            outbound_tx,
            cancel.clone(),
        );
        let handle = tokio::spawn(coordinator.run(inbound_rx));

        Self {
            inbound: inbound_tx,
            outbound: outbound_rx,
            cancel,
            handle,
        }
    }

    pub fn send_audio(&self, audio: &'static [u8]) {
        self.inbound
            .unbounded_send(InboundFrame::Binary(Bytes::from_static(audio)))
            .unwrap();
    }

    pub fn send_text(&self, raw: &str) {
        self.inbound
            .unbounded_send(InboundFrame::Text(raw.to_string()))
            .unwrap();
    }

    pub async fn next_frame(&mut self) -> OutboundFrame {
        tokio::time::timeout(Duration::from_secs(5), self.outbound.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("session closed")
    }

    /// Collect frames up to and including the next `idle` status.
    pub async fn until_idle(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        loop {
            let frame = self.next_frame().await;
            let idle = matches!(
                frame,
                OutboundFrame::Status(voxchat_gateway::core::conversation::TurnStatus::Idle)
            );
            frames.push(frame);
            if idle {
                return frames;
            }
        }
    }

    /// Close the client side and return the final conversation state.
    pub async fn close(self) -> ConversationState {
        drop(self.inbound);
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("session did not shut down")
            .expect("session task panicked")
    }
}

/// Audio frames in emission order as (sequence, text).
pub fn audio_frames(frames: &[OutboundFrame]) -> Vec<(u64, String)> {
    frames
        .iter()
        .filter_map(|frame| match frame {
            OutboundFrame::Audio(audio) => Some((audio.sequence, audio.text.clone())),
            _ => None,
        })
        .collect()
}

/// Status texts in emission order.
pub fn status_texts(frames: &[OutboundFrame]) -> Vec<String> {
    frames.iter().filter_map(OutboundFrame::status_text).collect()
}

/// Settings suited to fast tests.
pub fn test_settings() -> SessionSettings {
    SessionSettings {
        transcription_timeout: Duration::from_secs(2),
        generation_timeout: Duration::from_secs(2),
        synthesis_timeout: Duration::from_secs(2),
        ..SessionSettings::default()
    }
}
