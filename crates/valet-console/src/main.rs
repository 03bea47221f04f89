//! The `valet` interactive console.
//!
//! Wires the session controller to a terminal: stdin lines become chat
//! messages or slash commands, and session events are rendered as they
//! arrive. The channel reconnects on its own; the console only reflects the
//! connectivity status.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use valet_client::{
    ApiClient, ChannelEvent, ClientConfig, SessionController, SessionEvent,
};
use valet_core::ValetError;
use valet_core::session::SessionId;

mod presentation;

#[derive(Parser)]
#[command(name = "valet")]
#[command(about = "Valet console - realtime assistant with human-in-the-loop command approval", long_about = None)]
struct Cli {
    /// Backend base URL (overrides VALET_BACKEND_URL and the config file)
    #[arg(long)]
    backend_url: Option<String>,

    /// Log filter directives, e.g. "info" or "valet_client=debug"
    #[arg(long, default_value = "warn")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log)?)
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.backend_url {
        Some(url) => ClientConfig::new(url),
        None => ClientConfig::from_env(),
    };
    let session_id = SessionId::generate();
    let api = Arc::new(ApiClient::new(config.clone()));

    // Best-effort: the console works fine without knowing the platform.
    let platform = match api.system_info().await {
        Ok(info) => info.platform,
        Err(e) => {
            debug!(error = %e, "system info unavailable");
            "unknown".to_string()
        }
    };

    let (mut session, mut events) = SessionController::connect(&config, session_id, api);

    println!(
        "{} session {} | backend {} | platform {}",
        "valet".green().bold(),
        session.store().session_id(),
        config.base_url(),
        platform
    );
    println!("{}", "type a message, /pending, /approve <id>, /reject <id>, /status, /quit".dimmed());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else { break };
                render_event(&mut session, event);
            }

            maybe_line = lines.next_line() => {
                match maybe_line? {
                    Some(line) => {
                        if !handle_input(&mut session, line.trim()) {
                            break;
                        }
                    }
                    None => break, // stdin closed
                }
            }
        }
    }

    session.shutdown();
    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Applies one session event and prints whatever it added to the
/// conversation or the pending set.
fn render_event(session: &mut SessionController, event: SessionEvent) {
    if let SessionEvent::Channel(ChannelEvent::Connectivity(state)) = &event {
        println!("{}", presentation::render_connectivity(*state));
    }

    let messages_before = session.store().len();
    let pending_before = session.pending().len();
    session.handle_event(event);

    for message in &session.store().messages()[messages_before..] {
        println!("{}", presentation::render_message(message));
    }
    if session.pending().len() > pending_before {
        if let Some(command) = session.pending().iter().last() {
            println!("{}", presentation::render_pending_prompt(command));
        }
    }
}

/// Handles one line of user input. Returns `false` when the console should
/// exit.
fn handle_input(session: &mut SessionController, input: &str) -> bool {
    if input.is_empty() {
        return true;
    }

    let mut parts = input.splitn(2, ' ');
    match (parts.next().unwrap_or(""), parts.next().map(str::trim)) {
        ("/quit" | "/exit", _) => return false,

        ("/pending", _) => {
            println!("{}", presentation::render_pending_list(session.pending().iter()));
        }

        ("/status", _) => {
            println!("{}", presentation::render_connectivity(session.connectivity()));
        }

        ("/approve", Some(id)) if !id.is_empty() => {
            report_decision(session.approve(id));
        }
        ("/reject", Some(id)) if !id.is_empty() => {
            report_decision(session.reject(id));
        }
        ("/approve" | "/reject", _) => {
            println!("{}", "usage: /approve <command-id> | /reject <command-id>".dimmed());
        }

        (command, _) if command.starts_with('/') => {
            println!("{} {}", "unknown command:".red(), command);
        }

        _ => {
            let before = session.store().len();
            match session.send_message(input) {
                Ok(()) => {
                    for message in &session.store().messages()[before..] {
                        println!("{}", presentation::render_message(message));
                    }
                }
                Err(ValetError::NotConnected) => {
                    println!("{}", "offline - message not sent".red());
                }
                Err(e) => {
                    println!("{} {}", "send failed:".red(), e);
                }
            }
        }
    }
    true
}

/// Prints the immediate outcome of issuing a decision; the final result
/// arrives later as a session event.
fn report_decision(result: valet_core::error::Result<()>) {
    match result {
        Ok(()) => println!("{}", "decision sent...".dimmed()),
        Err(e) => println!("{} {}", "cannot decide:".red(), e),
    }
}
