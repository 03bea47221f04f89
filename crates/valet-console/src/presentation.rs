//! Presentation adapter.
//!
//! Pure functions mapping a message's content and semantic type into
//! user-facing terminal text. Conversation correctness does not depend on
//! anything in this module.

use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;

use valet_core::session::{ChatMessage, ConnectivityState, MessageType, PendingCommand, Sender};

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid pattern"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid pattern"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid pattern"));

/// Converts the backend's lightweight markup (bold, inline code, fenced
/// blocks) into styled terminal text.
pub fn render_markup(text: &str) -> String {
    let text = CODE_BLOCK.replace_all(text, |caps: &regex::Captures<'_>| {
        caps[1].trim_matches('\n').dimmed().to_string()
    });
    let text = BOLD.replace_all(&text, |caps: &regex::Captures<'_>| {
        caps[1].bold().to_string()
    });
    let text = INLINE_CODE.replace_all(&text, |caps: &regex::Captures<'_>| {
        caps[1].cyan().to_string()
    });
    text.into_owned()
}

/// Renders one conversation message with a sender/time header.
pub fn render_message(message: &ChatMessage) -> String {
    let sender = match message.sender {
        Sender::User => "YOU".cyan().bold(),
        Sender::Assistant => "VALET".green().bold(),
    };
    let marker = match message.message_type {
        MessageType::CommandProposal => " [approval required]".yellow().to_string(),
        MessageType::CommandResult => " [command result]".green().to_string(),
        MessageType::Error => " [error]".red().to_string(),
        MessageType::Text | MessageType::Unknown => String::new(),
    };

    format!(
        "{} {}{}\n{}",
        sender,
        clock_time(&message.timestamp).dimmed(),
        marker,
        render_markup(&message.message)
    )
}

/// Renders the decision prompt for a newly surfaced command proposal.
pub fn render_pending_prompt(command: &PendingCommand) -> String {
    format!(
        "{} type {} or {} to decide",
        "pending approval:".yellow().bold(),
        format!("/approve {}", command.command_id).green(),
        format!("/reject {}", command.command_id).red(),
    )
}

/// One line per outstanding proposal, for the `/pending` command.
pub fn render_pending_list<'a>(commands: impl Iterator<Item = &'a PendingCommand>) -> String {
    let lines: Vec<String> = commands
        .map(|c| {
            format!(
                "  {} {}",
                c.command_id.yellow(),
                first_line(&c.proposal_text)
            )
        })
        .collect();
    if lines.is_empty() {
        "no pending command approvals".dimmed().to_string()
    } else {
        lines.join("\n")
    }
}

/// Renders a connectivity transition.
pub fn render_connectivity(state: ConnectivityState) -> String {
    let label = match state {
        ConnectivityState::Connected => state.to_string().green(),
        ConnectivityState::Connecting => state.to_string().yellow(),
        ConnectivityState::Disconnected => state.to_string().red(),
    };
    format!("{} {}", "status:".dimmed(), label)
}

/// Extracts the wall-clock time from an ISO 8601 timestamp, falling back to
/// the raw value when it does not parse.
fn clock_time(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests assert on structure, not on ANSI escapes.
    fn plain() {
        colored::control::set_override(false);
    }

    fn message(text: &str, sender: Sender, message_type: MessageType) -> ChatMessage {
        ChatMessage {
            id: "m-1".to_string(),
            session_id: "session_test".to_string(),
            message: text.to_string(),
            sender,
            timestamp: "2024-01-01T12:34:56Z".to_string(),
            message_type,
            command_id: None,
        }
    }

    #[test]
    fn test_markup_strips_delimiters() {
        plain();
        let rendered = render_markup("**Command ID:** `cmd-42`\n```\nuptime\n```");
        assert!(rendered.contains("Command ID:"));
        assert!(rendered.contains("cmd-42"));
        assert!(rendered.contains("uptime"));
        assert!(!rendered.contains("**"));
        assert!(!rendered.contains('`'));
    }

    #[test]
    fn test_message_header_names_sender_and_time() {
        plain();
        let rendered = render_message(&message("hello", Sender::User, MessageType::Text));
        assert!(rendered.starts_with("YOU 12:34:56"));
        assert!(rendered.ends_with("hello"));
    }

    #[test]
    fn test_proposal_marker_is_visible() {
        plain();
        let rendered = render_message(&message(
            "run this?",
            Sender::Assistant,
            MessageType::CommandProposal,
        ));
        assert!(rendered.contains("[approval required]"));
    }

    #[test]
    fn test_pending_list_renders_ids() {
        plain();
        let commands = vec![PendingCommand {
            command_id: "cmd-42".to_string(),
            proposal_text: "restart the service\nsecond line".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        }];
        let rendered = render_pending_list(commands.iter());
        assert!(rendered.contains("cmd-42"));
        assert!(rendered.contains("restart the service"));
        assert!(!rendered.contains("second line"));
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_raw() {
        assert_eq!(clock_time("not-a-time"), "not-a-time");
    }
}
