//! Session coordinator: one per connection.
//!
//! Owns the [`ConversationState`] and is its only writer. A single select
//! loop multiplexes inbound client frames with events from the in-flight
//! turn; at most one turn runs at a time.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::ConversationError;
use super::frames::{ClientCommand, InboundFrame, OutboundFrame};
use super::history::{ChatMessage, ConversationState, TurnStatus};
use super::turn::{Turn, TurnEvent, TurnInput, TurnOutcome};
use super::{Collaborators, SessionSettings};

const TURN_EVENT_BUFFER: usize = 64;

struct ActiveTurn {
    epoch: u64,
    events: mpsc::Receiver<TurnEvent>,
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

pub struct SessionCoordinator {
    session_id: String,
    collaborators: Collaborators,
    settings: Arc<SessionSettings>,
    state: ConversationState,
    outbound: mpsc::Sender<OutboundFrame>,
    cancel: CancellationToken,
    active: Option<ActiveTurn>,
}

impl SessionCoordinator {
    pub fn new(
        session_id: impl Into<String>,
        collaborators: Collaborators,
        settings: Arc<SessionSettings>,
        outbound: mpsc::Sender<OutboundFrame>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            collaborators,
            settings,
            state: ConversationState::new(),
            outbound,
            cancel,
            active: None,
        }
    }

    /// Drive the session until the inbound stream ends, the outbound side
    /// goes away or the session token is cancelled. Returns the final state.
    pub async fn run<S>(mut self, mut inbound: S) -> ConversationState
    where
        S: Stream<Item = InboundFrame> + Unpin + Send,
    {
        info!(session_id = %self.session_id, "Session started");

        if self.emit(OutboundFrame::Ready).await.is_ok() {
            loop {
                // Client frames go first so a busy turn cannot hold back a clear.
                let step = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(ConversationError::TransportClosed),
                    frame = inbound.next() => match frame {
                        Some(frame) => self.on_inbound(frame).await,
                        None => Err(ConversationError::TransportClosed),
                    },
                    event = next_turn_event(&mut self.active) => self.on_turn_event(event).await,
                };
                if step.is_err() {
                    break;
                }
            }
        }

        self.teardown().await;
        info!(
            session_id = %self.session_id,
            history = self.state.history().len(),
            "Session ended"
        );
        self.state
    }

    async fn on_inbound(&mut self, frame: InboundFrame) -> Result<(), ConversationError> {
        match frame {
            InboundFrame::Binary(audio) => {
                if audio.is_empty() {
                    return self.reject(ConversationError::protocol("empty audio frame")).await;
                }
                debug!(session_id = %self.session_id, bytes = audio.len(), "Received audio chunk");
                self.start_turn(TurnInput::Audio(audio)).await
            }
            InboundFrame::Text(raw) => match ClientCommand::parse(&raw) {
                Ok(ClientCommand::Clear) => {
                    let removed = self.state.clear();
                    info!(session_id = %self.session_id, removed, "History cleared");
                    self.emit(OutboundFrame::Cleared).await
                }
                Ok(ClientCommand::Text(text)) => self.start_turn(TurnInput::Typed(text)).await,
                Err(violation) => self.reject(violation).await,
            },
        }
    }

    async fn start_turn(&mut self, input: TurnInput) -> Result<(), ConversationError> {
        if self.active.is_some() {
            return self
                .reject(ConversationError::protocol(
                    "a turn is already in progress; input dropped",
                ))
                .await;
        }

        if matches!(input, TurnInput::Audio(_)) {
            self.set_status(TurnStatus::Receiving).await?;
        }

        let (events_tx, events_rx) = mpsc::channel(TURN_EVENT_BUFFER);
        let cancel = self.cancel.child_token();
        let turn = Turn {
            session_id: self.session_id.clone(),
            collaborators: self.collaborators.clone(),
            settings: self.settings.clone(),
            events: events_tx,
            cancel: cancel.clone(),
        };

        self.active = Some(ActiveTurn {
            epoch: self.state.epoch(),
            events: events_rx,
            handle: tokio::spawn(turn.run(input)),
            cancel,
        });
        Ok(())
    }

    async fn on_turn_event(&mut self, event: Option<TurnEvent>) -> Result<(), ConversationError> {
        let Some(event) = event else {
            // Channel closed without a Finished event: the task died.
            warn!(session_id = %self.session_id, "Turn ended without reporting an outcome");
            self.active = None;
            self.emit(OutboundFrame::Error(ConversationError::Generation(
                crate::core::llm::LLMError::ProviderError("turn terminated unexpectedly".into()),
            )))
            .await?;
            return self.set_status(TurnStatus::Idle).await;
        };

        match event {
            TurnEvent::Status(status) => self.set_status(status).await,
            TurnEvent::Frame(frame) => self.emit(frame).await,
            TurnEvent::Transcribed { text, snapshot } => {
                let epoch = self.turn_epoch();
                self.state.record(epoch, ChatMessage::user(text.clone()));
                let mut messages = self.state.snapshot();
                if self.state.epoch() != epoch {
                    // Cleared while transcribing: generate from the fresh history.
                    messages.push(ChatMessage::user(text));
                }
                let _ = snapshot.send(messages);
                Ok(())
            }
            TurnEvent::Finished(outcome) => self.finish_turn(outcome).await,
        }
    }

    async fn finish_turn(&mut self, outcome: TurnOutcome) -> Result<(), ConversationError> {
        let epoch = self.turn_epoch();
        self.active = None;

        match outcome {
            TurnOutcome::Completed { reply, fragments } => {
                if !self.state.record(epoch, ChatMessage::assistant(reply)) {
                    debug!(session_id = %self.session_id, "History cleared during turn, reply not recorded");
                }
                info!(session_id = %self.session_id, fragments, "Turn completed");
            }
            TurnOutcome::Failed(ConversationError::TransportClosed) => {
                return Err(ConversationError::TransportClosed);
            }
            TurnOutcome::Failed(error) => {
                warn!(session_id = %self.session_id, error = %error, "Turn failed");
                self.emit(OutboundFrame::Error(error)).await?;
            }
        }
        self.set_status(TurnStatus::Idle).await
    }

    fn turn_epoch(&self) -> u64 {
        self.active
            .as_ref()
            .map_or(self.state.epoch(), |turn| turn.epoch)
    }

    async fn reject(&mut self, violation: ConversationError) -> Result<(), ConversationError> {
        warn!(session_id = %self.session_id, error = %violation, "Ignoring inbound frame");
        self.emit(OutboundFrame::Error(violation)).await
    }

    async fn set_status(&mut self, status: TurnStatus) -> Result<(), ConversationError> {
        self.state.set_status(status);
        self.emit(OutboundFrame::Status(status)).await
    }

    async fn emit(&self, frame: OutboundFrame) -> Result<(), ConversationError> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| ConversationError::TransportClosed)
    }

    async fn teardown(&mut self) {
        if let Some(turn) = self.active.take() {
            debug!(session_id = %self.session_id, "Cancelling in-flight turn");
            turn.cancel.cancel();
            turn.handle.abort();
            let _ = turn.handle.await;
        }
        self.state.set_status(TurnStatus::Idle);
    }
}

async fn next_turn_event(active: &mut Option<ActiveTurn>) -> Option<TurnEvent> {
    match active {
        Some(turn) => turn.events.recv().await,
        None => std::future::pending().await,
    }
}
