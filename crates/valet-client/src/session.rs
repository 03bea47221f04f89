//! Session controller.
//!
//! Correlates inbound channel events to conversation and pending-approval
//! state, and drives the approve/reject command lifecycle against the
//! decision side-channel. All state transitions run to completion inside
//! [`SessionController::handle_event`], driven from a single mailbox;
//! decision HTTP calls are spawned so another event (e.g. an inbound
//! message) can be processed while a decision is outstanding.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use valet_core::error::Result;
use valet_core::session::{
    ChatMessage, ConnectivityState, ConversationStore, MessageType, PendingCommand, PendingSet,
    SessionId,
};

use crate::api::{CommandOutcome, DecisionApi};
use crate::channel::{ChannelEvent, ChannelHandle, spawn_channel};
use crate::config::ClientConfig;

/// Resolution of a spawned decision call, delivered back to the mailbox.
#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    /// Approve call resolved (the command stays pending on failure).
    Approved(Result<CommandOutcome>),
    /// Reject call resolved (the entry is cleared either way).
    Rejected(Result<()>),
}

/// Events processed by the session controller's mailbox.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// An event from the channel task.
    Channel(ChannelEvent),
    /// A decision call completed.
    DecisionResolved {
        command_id: String,
        outcome: DecisionOutcome,
    },
}

/// Owns the single coherent view of conversation and pending-action state
/// for one session.
pub struct SessionController {
    store: ConversationStore,
    pending: PendingSet,
    connectivity: ConnectivityState,
    channel: ChannelHandle,
    api: Arc<dyn DecisionApi>,
    events_tx: mpsc::Sender<SessionEvent>,
}

impl SessionController {
    /// Connects a new session: spawns the channel task and wires its events
    /// into the returned mailbox.
    pub fn connect(
        config: &ClientConfig,
        session_id: SessionId,
        api: Arc<dyn DecisionApi>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(128);
        let (channel_tx, channel_rx) = mpsc::channel(128);

        let channel = spawn_channel(config, &session_id, channel_tx);
        tokio::spawn(forward_channel_events(channel_rx, events_tx.clone()));

        let controller = Self {
            store: ConversationStore::new(session_id),
            pending: PendingSet::new(),
            connectivity: ConnectivityState::Disconnected,
            channel,
            api,
            events_tx,
        };
        (controller, events_rx)
    }

    /// Sends a chat message: transmits the outbound frame and appends the
    /// message optimistically, raising the typing indicator.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` when the channel is down; nothing is appended
    /// in that case.
    pub fn send_message(&mut self, text: &str) -> Result<()> {
        self.channel.send_text(text)?;
        self.store.append_user(text);
        Ok(())
    }

    /// Issues an approve decision for a pending command.
    ///
    /// The request runs in the background; the result arrives on the mailbox
    /// as [`SessionEvent::DecisionResolved`]. At most one decision per
    /// command id can be in flight.
    pub fn approve(&mut self, command_id: &str) -> Result<()> {
        self.pending.begin_decision(command_id)?;
        info!(%command_id, "approving command");

        let api = Arc::clone(&self.api);
        let events_tx = self.events_tx.clone();
        let command_id = command_id.to_string();
        tokio::spawn(async move {
            let outcome = api.approve(&command_id).await;
            let _ = events_tx
                .send(SessionEvent::DecisionResolved {
                    command_id,
                    outcome: DecisionOutcome::Approved(outcome),
                })
                .await;
        });
        Ok(())
    }

    /// Issues a reject decision for a pending command.
    ///
    /// The user's denial is honored locally whatever the call's outcome; the
    /// entry is cleared when the result arrives on the mailbox.
    pub fn reject(&mut self, command_id: &str) -> Result<()> {
        self.pending.begin_decision(command_id)?;
        info!(%command_id, "rejecting command");

        let api = Arc::clone(&self.api);
        let events_tx = self.events_tx.clone();
        let command_id = command_id.to_string();
        tokio::spawn(async move {
            let outcome = api.reject(&command_id).await;
            let _ = events_tx
                .send(SessionEvent::DecisionResolved {
                    command_id,
                    outcome: DecisionOutcome::Rejected(outcome),
                })
                .await;
        });
        Ok(())
    }

    /// Processes one mailbox event to completion.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Channel(ChannelEvent::Inbound(message)) => {
                self.handle_inbound(message);
            }
            SessionEvent::Channel(ChannelEvent::Connectivity(state)) => {
                debug!(%state, "connectivity changed");
                self.connectivity = state;
            }
            SessionEvent::Channel(ChannelEvent::SendFailed { text }) => {
                warn!("outbound message lost to a transport fault");
                self.store.append_synthetic(
                    format!(
                        "Your message could not be delivered and was not received by the assistant: \"{}\"",
                        text
                    ),
                    MessageType::Error,
                );
            }
            SessionEvent::DecisionResolved {
                command_id,
                outcome,
            } => {
                self.apply_decision(&command_id, outcome);
            }
        }
    }

    /// Classifies and appends an inbound message.
    fn handle_inbound(&mut self, message: ChatMessage) {
        if let Some(command) = PendingCommand::classify(&message) {
            let command_id = command.command_id.clone();
            if self.pending.insert(command) {
                info!(%command_id, "command proposal awaiting decision");
            } else {
                warn!(%command_id, "duplicate command proposal ignored");
            }
        }
        self.store.append_inbound(message);
    }

    /// Applies a resolved decision to the pending set and the conversation.
    fn apply_decision(&mut self, command_id: &str, outcome: DecisionOutcome) {
        self.pending.finish_decision(command_id);

        match outcome {
            DecisionOutcome::Approved(Ok(result)) => {
                self.pending.remove(command_id);
                info!(%command_id, return_code = result.return_code, "command executed");
                self.store.append_synthetic(
                    format!(
                        "**Command Executed Successfully**\n\nOutput:\n```\n{}\n```\n\nReturn Code: {}",
                        result.display_output(),
                        result.return_code
                    ),
                    MessageType::CommandResult,
                );
            }
            DecisionOutcome::Approved(Err(e)) => {
                // The entry stays pending so the decision can be retried.
                warn!(%command_id, error = %e, "approve call failed");
                self.store.append_synthetic(
                    format!(
                        "Approval of command '{}' failed: {}. The command is still pending.",
                        command_id, e
                    ),
                    MessageType::Error,
                );
            }
            DecisionOutcome::Rejected(result) => {
                self.pending.remove(command_id);
                if let Err(e) = result {
                    warn!(%command_id, error = %e, "reject call failed; entry cleared locally");
                    self.store.append_synthetic(
                        format!(
                            "Command rejected by user. (The backend could not be notified: {})",
                            e
                        ),
                        MessageType::Error,
                    );
                } else {
                    self.store
                        .append_synthetic("Command rejected by user.", MessageType::Text);
                }
            }
        }
    }

    /// The conversation log and typing indicator.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Command proposals awaiting a decision.
    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// Last observed connectivity state.
    pub fn connectivity(&self) -> ConnectivityState {
        self.connectivity
    }

    /// Shuts down the channel task; no further reconnects will be attempted.
    pub fn shutdown(&self) {
        self.channel.shutdown();
    }
}

/// Forwards channel events into the session mailbox.
async fn forward_channel_events(
    mut channel_rx: mpsc::Receiver<ChannelEvent>,
    events_tx: mpsc::Sender<SessionEvent>,
) {
    while let Some(event) = channel_rx.recv().await {
        if events_tx.send(SessionEvent::Channel(event)).await.is_err() {
            break;
        }
    }
}
