//! One conversation turn: transcribe, generate, chunk, synthesize.
//!
//! A turn runs as its own task. It never touches session state directly;
//! everything it wants the coordinator to know travels as a [`TurnEvent`]
//! over one FIFO channel, so status, transcript and audio frames reach the
//! client in the order the turn produced them.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::chunker::{Fragment, SentenceChunker};
use super::dispatcher::SynthesisDispatcher;
use super::error::ConversationError;
use super::frames::OutboundFrame;
use super::history::{ChatMessage, TurnStatus};
use super::{Collaborators, SessionSettings};
use crate::core::llm::{GenerationRequest, LLMError};
use crate::core::stt::STTError;

/// What started the turn.
#[derive(Debug, Clone)]
pub(crate) enum TurnInput {
    Audio(Bytes),
    Typed(String),
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TurnOutcome {
    /// Generation finished; `reply` is the full assistant text.
    Completed { reply: String, fragments: u64 },
    Failed(ConversationError),
}

/// Messages from a running turn to its coordinator.
#[derive(Debug)]
pub(crate) enum TurnEvent {
    Status(TurnStatus),
    Frame(OutboundFrame),
    /// The user's words are known; the coordinator records them and answers
    /// with the history snapshot to generate from.
    Transcribed {
        text: String,
        snapshot: oneshot::Sender<Vec<ChatMessage>>,
    },
    Finished(TurnOutcome),
}

impl From<OutboundFrame> for TurnEvent {
    fn from(frame: OutboundFrame) -> Self {
        TurnEvent::Frame(frame)
    }
}

pub(crate) struct Turn {
    pub session_id: String,
    pub collaborators: Collaborators,
    pub settings: Arc<SessionSettings>,
    pub events: mpsc::Sender<TurnEvent>,
    pub cancel: CancellationToken,
}

impl Turn {
    /// Run to completion and report the outcome as the final event.
    pub async fn run(self, input: TurnInput) {
        let outcome = match self.execute(input).await {
            Ok(outcome) => outcome,
            Err(error) => TurnOutcome::Failed(error),
        };
        let _ = self.events.send(TurnEvent::Finished(outcome)).await;
    }

    async fn execute(&self, input: TurnInput) -> Result<TurnOutcome, ConversationError> {
        let transcript = match input {
            TurnInput::Audio(audio) => self.transcribe(audio).await?,
            TurnInput::Typed(text) => text,
        };
        self.send(TurnEvent::Frame(OutboundFrame::Text(transcript.clone())))
            .await?;

        let (snapshot_tx, snapshot_rx) = oneshot::channel();
        self.send(TurnEvent::Transcribed {
            text: transcript,
            snapshot: snapshot_tx,
        })
        .await?;
        let messages = snapshot_rx
            .await
            .map_err(|_| ConversationError::TransportClosed)?;

        self.generate(messages).await
    }

    async fn transcribe(&self, audio: Bytes) -> Result<String, ConversationError> {
        self.send(TurnEvent::Status(TurnStatus::Transcribing)).await?;
        let limit = self.settings.transcription_timeout;

        let text = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ConversationError::TransportClosed),
            result = tokio::time::timeout(limit, self.collaborators.stt.transcribe(audio)) => {
                result.map_err(|_| STTError::Timeout(limit))??
            }
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(STTError::ProviderError("no speech detected".to_string()).into());
        }
        info!(session_id = %self.session_id, chars = text.len(), "Transcribed user audio");
        Ok(text)
    }

    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<TurnOutcome, ConversationError> {
        self.send(TurnEvent::Status(TurnStatus::Generating)).await?;
        let settings = &self.settings;
        let limit = settings.generation_timeout;

        let request = GenerationRequest {
            system_prompt: settings.system_prompt.clone(),
            messages,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        let mut stream = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ConversationError::TransportClosed),
            opened = tokio::time::timeout(limit, self.collaborators.llm.generate_stream(request)) => {
                opened.map_err(|_| LLMError::Timeout(limit))??
            }
        };

        let mut chunker = SentenceChunker::new(settings.max_fragment_chars);
        let mut dispatcher = SynthesisDispatcher::new(
            self.collaborators.tts.clone(),
            settings.synthesis_concurrency,
            settings.synthesis_timeout,
            self.events.clone(),
            self.cancel.child_token(),
        );
        let mut reply = String::new();
        let mut failure = None;

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => {
                    failure = Some(ConversationError::TransportClosed);
                    break;
                }
                next = tokio::time::timeout(limit, stream.next()) => next,
            };
            match next {
                Ok(Some(Ok(delta))) => {
                    for fragment in chunker.push(&delta) {
                        self.dispatch(&mut dispatcher, &mut reply, fragment).await;
                    }
                }
                Ok(Some(Err(e))) => {
                    failure = Some(e.into());
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    failure = Some(LLMError::Timeout(limit).into());
                    break;
                }
            }
        }
        // Ends the provider request before waiting on synthesis.
        drop(stream);

        if failure.is_none()
            && let Some(fragment) = chunker.finish()
        {
            self.dispatch(&mut dispatcher, &mut reply, fragment).await;
        }

        let report = dispatcher.drain().await;
        debug!(
            session_id = %self.session_id,
            submitted = report.submitted,
            emitted = report.emitted,
            failed = report.failed,
            "Synthesis drained"
        );

        match failure {
            Some(error) => {
                warn!(session_id = %self.session_id, error = %error, "Generation aborted");
                Err(error)
            }
            None => Ok(TurnOutcome::Completed {
                reply: reply.trim().to_string(),
                fragments: report.submitted,
            }),
        }
    }

    async fn dispatch(
        &self,
        dispatcher: &mut SynthesisDispatcher,
        reply: &mut String,
        fragment: Fragment,
    ) {
        if dispatcher.submitted() == 0 {
            let _ = self.events.send(TurnEvent::Status(TurnStatus::Speaking)).await;
        }
        reply.push_str(fragment.raw());
        dispatcher.submit(fragment);
    }

    async fn send(&self, event: TurnEvent) -> Result<(), ConversationError> {
        self.events
            .send(event)
            .await
            .map_err(|_| ConversationError::TransportClosed)
    }
}
