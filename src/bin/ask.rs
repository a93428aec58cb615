//! Chart screenshot assistant.
//!
//! Sends a screenshot and a question to the local inference server, carrying
//! the session's recent history, and records the exchange in the chat memory
//! file.
//!
//! # Usage
//!
//! ```bash
//! # Start a new session
//! ask chart shot.png "Where is the nearest bearish order block?"
//!
//! # Continue one
//! ask chart shot.png "And the invalidation?" --session <ID>
//!
//! # Manage sessions
//! ask sessions
//! ask show <ID>
//! ask rename <ID> "London open review"
//! ask delete <ID>
//! ask perf
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use trade_annotator::config::{AppConfig, default_memory_path, load_config, load_config_from};
use trade_annotator::error::AnnotatorError;
use trade_annotator::inference::InferenceClient;
use trade_annotator::memory::{MemoryStore, Role};

/// Ask the local chart model about a screenshot
#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(version)]
#[command(about = "Ask the local chart model about a screenshot", long_about = None)]
struct Args {
    /// Config file to read instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Memory file to use instead of the configured one
    #[arg(long, value_name = "FILE", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a question about a chart screenshot
    Chart {
        /// PNG or JPEG screenshot
        screenshot: PathBuf,
        /// Question to ask
        question: String,
        /// Continue this session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
        /// Title for a new session (defaults to the question)
        #[arg(long)]
        title: Option<String>,
    },
    /// List sessions, most recent first
    Sessions,
    /// Print a session's messages
    Show { session: String },
    /// Rename a session
    Rename { session: String, title: String },
    /// Delete a session and its messages
    Delete { session: String },
    /// Print logged inference latencies
    Perf,
}

fn store_path(args: &Args, config: &AppConfig) -> Result<PathBuf> {
    if let Some(path) = &args.store {
        return Ok(path.clone());
    }
    if let Some(path) = &config.memory.store_path {
        return Ok(path.clone());
    }
    Ok(default_memory_path()?)
}

fn session_title(question: &str) -> String {
    const MAX: usize = 40;
    let trimmed = question.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX).collect();
        format!("{head}...")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trade_annotator=info".parse()?)
                .add_directive("ask=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let path = store_path(&args, &config)?;
    let mut store = MemoryStore::open(&path)
        .with_context(|| format!("Failed to open memory file {}", path.display()))?;

    match args.command {
        Command::Chart {
            screenshot,
            question,
            session,
            title,
        } => {
            let session_id = match session {
                Some(id) => {
                    if store.session(&id).is_none() {
                        return Err(AnnotatorError::UnknownSession(id).into());
                    }
                    id
                }
                None => {
                    let title = title.unwrap_or_else(|| session_title(&question));
                    let created = store.create_session(&title);
                    info!("Started session {}", created.id);
                    created.id
                }
            };

            let history = store.history(&session_id, config.inference.history_turns);
            let bytes = fs::read(&screenshot)
                .with_context(|| format!("Failed to read {}", screenshot.display()))?;
            let file_name = screenshot
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("screenshot.png")
                .to_string();

            let client = InferenceClient::new(&config.inference, config.server.request_timeout_secs)?;
            info!("Asking {} with {} history turn(s)", client.base_url(), history.len());
            let answer = client.ask(bytes, &file_name, &question, &history).await?;

            store.append_message(&session_id, Role::User, &question)?;
            store.append_message(&session_id, Role::Assistant, &answer.response.answer)?;
            store.log_performance(
                Some(&session_id),
                answer.latency_ms(),
                question.chars().count(),
                answer.response.answer.chars().count(),
                answer.response.model.clone(),
            );
            store.save()?;

            println!("{}", answer.response.answer);
            info!("Session {session_id}, {} ms", answer.latency_ms());
        }
        Command::Sessions => {
            for session in store.sessions() {
                println!(
                    "{}  {}  {} message(s)  {}",
                    session.id,
                    session.updated_at.format("%Y-%m-%d %H:%M"),
                    store.messages(&session.id).len(),
                    session.title
                );
            }
        }
        Command::Show { session } => {
            if store.session(&session).is_none() {
                return Err(AnnotatorError::UnknownSession(session).into());
            }
            for message in store.messages(&session) {
                let who = match message.role {
                    Role::User => "you",
                    Role::Assistant => "model",
                };
                println!("[{}] {who}: {}", message.created_at.format("%H:%M:%S"), message.content);
            }
        }
        Command::Rename { session, title } => {
            store.rename_session(&session, &title)?;
            store.save()?;
            println!("Renamed {session}");
        }
        Command::Delete { session } => {
            let removed = store.delete_session(&session)?;
            store.save()?;
            println!("Deleted {session} and {removed} message(s)");
        }
        Command::Perf => {
            let logs = store.performance_logs();
            for log in logs {
                println!(
                    "{}  {:>6} ms  q={} a={}  {}",
                    log.created_at.format("%Y-%m-%d %H:%M:%S"),
                    log.latency_ms,
                    log.question_chars,
                    log.answer_chars,
                    log.model.as_deref().unwrap_or("-")
                );
            }
            if !logs.is_empty() {
                let mean = logs.iter().map(|l| l.latency_ms).sum::<u64>() / logs.len() as u64;
                println!("{} request(s), mean {mean} ms", logs.len());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_questions_are_truncated_for_titles() {
        assert_eq!(session_title("  short one "), "short one");
        let long = "x".repeat(60);
        assert_eq!(session_title(&long), format!("{}...", "x".repeat(40)));
    }

    #[test]
    fn cli_parses_chart_command() {
        let args = Args::try_parse_from(["ask", "chart", "a.png", "why?", "--session", "s1"]).unwrap();
        match args.command {
            Command::Chart { session, question, .. } => {
                assert_eq!(session.as_deref(), Some("s1"));
                assert_eq!(question, "why?");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
