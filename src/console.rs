//! Line-oriented terminal front end for a relay.

use crate::conversation::{ConversationState, IgnoreReason};
use crate::session::{ChatSession, RelayTransport, TurnOutcome};
use crate::types::{ConversationMessage, Role};
use colored::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Say(String),
    ShowPersona,
    SetPersona(String),
    History,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> ConsoleCommand {
    let trimmed = line.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (trimmed, ""),
    };
    match head {
        "/quit" | "/exit" => ConsoleCommand::Quit,
        "/help" => ConsoleCommand::Help,
        "/history" => ConsoleCommand::History,
        "/persona" if rest.is_empty() => ConsoleCommand::ShowPersona,
        "/persona" => ConsoleCommand::SetPersona(rest.to_string()),
        _ => ConsoleCommand::Say(trimmed.to_string()),
    }
}

pub fn render_message(message: &ConversationMessage) -> String {
    let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
    let label = match message.role {
        Role::User => "you".green().bold(),
        Role::Assistant => "assistant".cyan().bold(),
        Role::System => "system".yellow().bold(),
    };
    format!("{} {} {}", timestamp.dimmed(), label, message.content)
}

const HELP: &str = "Commands: /persona [text], /history, /help, /quit. Anything else is sent.";

pub async fn run<T: RelayTransport>(session: ChatSession<T>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let opening = session.snapshot().await;
    for message in opening.messages() {
        write_line(&mut stdout, &render_message(message)).await?;
    }

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => write_line(&mut stdout, HELP).await?,
            ConsoleCommand::ShowPersona => {
                let state = session.snapshot().await;
                write_line(&mut stdout, &format!("persona: {}", state.persona())).await?;
            }
            ConsoleCommand::SetPersona(text) => {
                session.set_persona(&text).await;
                write_line(&mut stdout, "persona updated").await?;
            }
            ConsoleCommand::History => {
                let state = session.snapshot().await;
                for message in state.messages() {
                    write_line(&mut stdout, &render_message(message)).await?;
                }
                let summary = format!(
                    "{} from you, {} from the assistant",
                    state.count_role(Role::User),
                    state.count_role(Role::Assistant)
                );
                write_line(&mut stdout, &summary.dimmed().to_string()).await?;
            }
            ConsoleCommand::Say(text) => match session.submit(&text, None).await {
                TurnOutcome::Ignored(IgnoreReason::EmptyInput) => {}
                TurnOutcome::Ignored(IgnoreReason::TurnInFlight) => {
                    write_line(&mut stdout, "still waiting for the previous reply").await?;
                }
                TurnOutcome::Settled { state, .. } => {
                    if let Some(reply) = last_assistant(&state) {
                        write_line(&mut stdout, &render_message(reply)).await?;
                    }
                }
            },
        }
    }

    Ok(())
}

fn last_assistant(state: &ConversationState) -> Option<&ConversationMessage> {
    state
        .messages()
        .last()
        .filter(|m| m.role == Role::Assistant)
}

async fn write_line(stdout: &mut tokio::io::Stdout, text: &str) -> std::io::Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await
}
