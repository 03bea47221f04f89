//! Pending command proposals awaiting a human decision.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Result, ValetError};

use super::message::{ChatMessage, MessageType};

/// Pattern used to extract a command identifier from proposal text when the
/// backend does not deliver a structured `command_id` field. Matches the
/// labeled field the deployed backend appends to proposals, e.g.
/// `**Command ID:** cmd-42`.
static COMMAND_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Command ID:\*\*\s*([\w-]+)").expect("valid pattern"));

/// A command proposal awaiting a human decision.
///
/// Exists only while the decision is outstanding; removed from the pending
/// set once an approve or reject round-trip resolves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Identifier used against the decision endpoints
    pub command_id: String,
    /// The full proposal text, for display
    pub proposal_text: String,
    /// Timestamp of the proposal message (ISO 8601 format)
    pub timestamp: String,
}

impl PendingCommand {
    /// Classifies an inbound message as a command proposal.
    ///
    /// Returns `Some` only for messages of type `command_proposal` carrying a
    /// usable command identifier: the structured `command_id` field when
    /// present, otherwise one extracted from the message text. A proposal
    /// without an identifier degrades silently - the message is still
    /// appended to the conversation by the caller, but no pending entry is
    /// created and the proposal is non-actionable.
    pub fn classify(message: &ChatMessage) -> Option<Self> {
        if message.message_type != MessageType::CommandProposal {
            return None;
        }

        let command_id = message
            .command_id
            .clone()
            .or_else(|| extract_command_id(&message.message));

        match command_id {
            Some(command_id) => Some(Self {
                command_id,
                proposal_text: message.message.clone(),
                timestamp: message.timestamp.clone(),
            }),
            None => {
                debug!(message_id = %message.id, "command proposal without extractable command id");
                None
            }
        }
    }
}

/// Extracts a command identifier from proposal text.
fn extract_command_id(text: &str) -> Option<String> {
    COMMAND_ID_PATTERN
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// The set of command proposals awaiting a decision, in arrival order.
///
/// Also tracks which commands have a decision call in flight, so a repeated
/// approve or reject for the same id (e.g. a double-submit) cannot issue two
/// concurrent requests.
#[derive(Debug, Default)]
pub struct PendingSet {
    commands: Vec<PendingCommand>,
    in_flight: Vec<String>,
}

impl PendingSet {
    /// Creates an empty pending set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending command. Returns `false` if an entry with the same
    /// id is already outstanding (the duplicate is dropped).
    pub fn insert(&mut self, command: PendingCommand) -> bool {
        if self.contains(&command.command_id) {
            return false;
        }
        self.commands.push(command);
        true
    }

    /// Looks up a pending command by id.
    pub fn get(&self, command_id: &str) -> Option<&PendingCommand> {
        self.commands.iter().find(|c| c.command_id == command_id)
    }

    /// Whether a command with the given id is pending.
    pub fn contains(&self, command_id: &str) -> bool {
        self.get(command_id).is_some()
    }

    /// Removes and returns the pending command with the given id.
    pub fn remove(&mut self, command_id: &str) -> Option<PendingCommand> {
        let index = self
            .commands
            .iter()
            .position(|c| c.command_id == command_id)?;
        Some(self.commands.remove(index))
    }

    /// Marks a decision as in flight for the given command.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCommand` if no such command is pending, or
    /// `DecisionInFlight` if a decision for it is already outstanding.
    pub fn begin_decision(&mut self, command_id: &str) -> Result<()> {
        if !self.contains(command_id) {
            return Err(ValetError::UnknownCommand {
                id: command_id.to_string(),
            });
        }
        if self.in_flight.iter().any(|id| id == command_id) {
            return Err(ValetError::DecisionInFlight {
                id: command_id.to_string(),
            });
        }
        self.in_flight.push(command_id.to_string());
        Ok(())
    }

    /// Clears the in-flight marker for the given command.
    pub fn finish_decision(&mut self, command_id: &str) {
        self.in_flight.retain(|id| id != command_id);
    }

    /// Pending commands in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.commands.iter()
    }

    /// Number of outstanding proposals.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no proposals are outstanding.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::message::Sender;

    fn proposal(id: &str, text: &str, command_id: Option<&str>) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            session_id: "session_test".to_string(),
            message: text.to_string(),
            sender: Sender::Assistant,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message_type: MessageType::CommandProposal,
            command_id: command_id.map(String::from),
        }
    }

    #[test]
    fn test_classify_uses_structured_command_id() {
        let msg = proposal("m-1", "run `uptime`?", Some("cmd-42"));
        let pending = PendingCommand::classify(&msg).unwrap();
        assert_eq!(pending.command_id, "cmd-42");
        assert_eq!(pending.proposal_text, "run `uptime`?");
    }

    #[test]
    fn test_classify_extracts_id_from_text() {
        let text = "I suggest restarting the service.\n\n**Proposed Command:**\n`systemctl restart app`\n\n**Command ID:** cmd-42";
        let msg = proposal("m-1", text, None);
        let pending = PendingCommand::classify(&msg).unwrap();
        assert_eq!(pending.command_id, "cmd-42");
    }

    #[test]
    fn test_classify_structured_id_wins_over_text() {
        let msg = proposal("m-1", "**Command ID:** cmd-textual", Some("cmd-structured"));
        let pending = PendingCommand::classify(&msg).unwrap();
        assert_eq!(pending.command_id, "cmd-structured");
    }

    #[test]
    fn test_classify_degrades_silently_without_id() {
        let msg = proposal("m-1", "no identifier here", None);
        assert!(PendingCommand::classify(&msg).is_none());
    }

    #[test]
    fn test_classify_ignores_non_proposals() {
        let mut msg = proposal("m-1", "**Command ID:** cmd-42", None);
        msg.message_type = MessageType::Text;
        assert!(PendingCommand::classify(&msg).is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_ids() {
        let mut set = PendingSet::new();
        let msg = proposal("m-1", "text", Some("cmd-1"));
        let cmd = PendingCommand::classify(&msg).unwrap();

        assert!(set.insert(cmd.clone()));
        assert!(!set.insert(cmd));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_returns_entry() {
        let mut set = PendingSet::new();
        let msg = proposal("m-1", "text", Some("cmd-1"));
        set.insert(PendingCommand::classify(&msg).unwrap());

        let removed = set.remove("cmd-1").unwrap();
        assert_eq!(removed.command_id, "cmd-1");
        assert!(set.is_empty());
        assert!(set.remove("cmd-1").is_none());
    }

    #[test]
    fn test_decision_guard_allows_one_in_flight() {
        let mut set = PendingSet::new();
        let msg = proposal("m-1", "text", Some("cmd-1"));
        set.insert(PendingCommand::classify(&msg).unwrap());

        set.begin_decision("cmd-1").unwrap();
        let err = set.begin_decision("cmd-1").unwrap_err();
        assert!(matches!(err, ValetError::DecisionInFlight { .. }));

        set.finish_decision("cmd-1");
        set.begin_decision("cmd-1").unwrap();
    }

    #[test]
    fn test_decision_on_unknown_command_fails() {
        let mut set = PendingSet::new();
        let err = set.begin_decision("cmd-missing").unwrap_err();
        assert!(matches!(err, ValetError::UnknownCommand { .. }));
    }

    #[test]
    fn test_iteration_preserves_arrival_order() {
        let mut set = PendingSet::new();
        for id in ["cmd-1", "cmd-2", "cmd-3"] {
            let msg = proposal(id, "text", Some(id));
            set.insert(PendingCommand::classify(&msg).unwrap());
        }

        let ids: Vec<&str> = set.iter().map(|c| c.command_id.as_str()).collect();
        assert_eq!(ids, vec!["cmd-1", "cmd-2", "cmd-3"]);
    }
}
