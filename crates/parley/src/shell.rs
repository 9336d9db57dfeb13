// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley shell` command implementation.
//!
//! Interactive REPL with a colored prompt and readline history. Plain input
//! is sent as a turn; slash commands stage attachments, retry, delete,
//! search, export, and inspect the session.

use std::path::Path;

use colored::Colorize;
use parley_attachments::guess_media_type;
use parley_config::ParleyConfig;
use parley_core::{Author, Lifecycle, Message, MessageId, ParleyError, QuotaState, RawFile, UploadEvent};
use parley_session::{SessionCoordinator, TurnOutcome};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::session::SessionRuntime;

/// Number of id characters shown in `/history`.
const SHORT_ID: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Say(String),
    Attach(String),
    Send(String),
    Retry(String),
    Delete(String),
    Search(String),
    Export,
    Clear,
    Quota,
    Status,
    History,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ShellCommand::Say(trimmed.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim().to_string()),
        None => (rest, String::new()),
    };
    match name {
        "attach" if !arg.is_empty() => ShellCommand::Attach(arg),
        "send" => ShellCommand::Send(arg),
        "retry" if !arg.is_empty() => ShellCommand::Retry(arg),
        "delete" if !arg.is_empty() => ShellCommand::Delete(arg),
        "search" => ShellCommand::Search(arg),
        "export" => ShellCommand::Export,
        "clear" => ShellCommand::Clear,
        "quota" => ShellCommand::Quota,
        "status" => ShellCommand::Status,
        "history" => ShellCommand::History,
        "help" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(trimmed.to_string()),
    }
}

/// Resolve a full id or a unique id prefix against `messages`.
pub fn resolve_id(messages: &[Message], needle: &str) -> Option<MessageId> {
    let mut matches = messages.iter().filter(|m| m.id.as_str().starts_with(needle));
    let first = matches.next()?;
    if first.id.as_str() != needle && matches.next().is_some() {
        return None;
    }
    Some(first.id.clone())
}

pub fn short_id(id: &MessageId) -> &str {
    let s = id.as_str();
    s.get(..SHORT_ID).unwrap_or(s)
}

/// One transcript line for `/history` and `/search`.
pub fn format_message(message: &Message) -> String {
    let who = match message.author {
        Author::Requester => "you".cyan().to_string(),
        Author::Assistant => "assistant".green().to_string(),
    };
    let state = match message.lifecycle {
        Lifecycle::Pending => " (pending)".dimmed().to_string(),
        Lifecycle::Delivered => String::new(),
        Lifecycle::Failed => " (failed, /retry to resend)".red().to_string(),
    };
    let mut line = format!(
        "{} {}{}: {}",
        short_id(&message.id).dimmed(),
        who,
        state,
        message.content
    );
    for attachment in &message.attachments {
        line.push_str(&format!(
            "\n    {} {} ({}, {} bytes)",
            "+".dimmed(),
            attachment.display_name,
            attachment.media_type,
            attachment.byte_size
        ));
    }
    line
}

pub fn format_quota(quota: &QuotaState) -> String {
    fn usage(used: u64, limit: Option<u64>) -> String {
        match limit {
            Some(limit) => format!("{used}/{limit}"),
            None => format!("{used}/unlimited"),
        }
    }
    format!(
        "plan {}: messages {}, attachments {}",
        quota.plan_tier,
        usage(quota.messages_used, quota.message_limit),
        usage(quota.attachments_used, quota.attachment_limit)
    )
}

/// Load a file for `/attach`. Files over `max_bytes` are refused before
/// their contents are read.
pub async fn read_attachment(path: &str, max_bytes: u64) -> Result<RawFile, ParleyError> {
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| ParleyError::Internal(format!("cannot read {path}: {e}")))?
        .len();
    if size > max_bytes {
        return Err(ParleyError::AttachmentTooLarge {
            name,
            size,
            limit: max_bytes,
        });
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ParleyError::Internal(format!("cannot read {path}: {e}")))?;
    let media_type = guess_media_type(&name);
    Ok(RawFile::new(name, media_type, bytes))
}

/// How a failed command is reported. Rejections left the session untouched
/// and are shown as notices.
pub fn error_line(error: &ParleyError) -> String {
    if error.is_rejection() {
        error.to_string().yellow().to_string()
    } else if error.is_retryable() {
        format!("{}: {error} (use /retry <id>)", "error".red())
    } else {
        format!("{}: {error}", "error".red())
    }
}

fn print_help() {
    println!("  {}  send a message", "<text>".yellow());
    println!("  {}  stage a file for the next /send", "/attach <path>".yellow());
    println!("  {}  send staged files with optional text", "/send [text]".yellow());
    println!("  {}  resend a requester message", "/retry <id>".yellow());
    println!("  {}  remove one message", "/delete <id>".yellow());
    println!("  {}  filter the transcript", "/search <query>".yellow());
    println!("  {}  write the transcript to a JSON file", "/export".yellow());
    println!("  {}  empty the transcript", "/clear".yellow());
    println!("  {}  show plan usage", "/quota".yellow());
    println!("  {}  show connectivity and identity", "/status".yellow());
    println!("  {}  show the transcript", "/history".yellow());
    println!("  {}  leave", "/quit".yellow());
}

fn print_upload_events(events: &mut mpsc::UnboundedReceiver<UploadEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            UploadEvent::Completed { attachment, .. } => {
                println!("  {} {}", "uploaded".green(), attachment.display_name);
            }
            UploadEvent::Failed { file, reason, .. } => {
                println!("  {} {file}: {reason}", "upload failed".red());
            }
            UploadEvent::Staged { .. } | UploadEvent::Progress { .. } => {}
        }
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    match &outcome.reply {
        Some(reply) => println!("{}", reply.content),
        None => println!("{}", "(reply discarded, message was removed)".dimmed()),
    }
}

async fn send(
    coordinator: &SessionCoordinator,
    events: &mut mpsc::UnboundedReceiver<UploadEvent>,
    content: &str,
    files: Vec<RawFile>,
) -> Result<(), ParleyError> {
    let result = coordinator.send_turn(content, files).await;
    print_upload_events(events);
    print_outcome(&result?);
    Ok(())
}

/// Runs the `parley shell` interactive REPL.
pub async fn run_shell(config: ParleyConfig) -> Result<(), ParleyError> {
    let mut runtime = SessionRuntime::start(&config).await?;
    let coordinator = std::sync::Arc::clone(&runtime.coordinator);

    let mut rl = DefaultEditor::new()
        .map_err(|e| ParleyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "parley shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());
    for message in coordinator.snapshot().await {
        println!("{}", message.content.green());
    }
    if coordinator.identity().await.is_none() {
        println!(
            "{}",
            "no identity configured (set session.user_id), sending is disabled".yellow()
        );
    }

    let max_file_bytes = config.attachments.max_file_bytes;
    let mut staged: Vec<RawFile> = Vec::new();
    let prompt = format!("{}> ", "parley".green());
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };
        let command = parse_command(&line);
        if command == ShellCommand::Empty {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        let result = match command {
            ShellCommand::Quit => break,
            ShellCommand::Empty => Ok(()),
            ShellCommand::Help => {
                print_help();
                Ok(())
            }
            ShellCommand::Say(text) => {
                send(&coordinator, &mut runtime.upload_events, &text, Vec::new()).await
            }
            ShellCommand::Attach(path) => match read_attachment(&path, max_file_bytes).await {
                Ok(file) => {
                    println!(
                        "  staged {} ({} bytes), {} file(s) waiting",
                        file.name,
                        file.byte_size(),
                        staged.len() + 1
                    );
                    staged.push(file);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ShellCommand::Send(text) => {
                let files = std::mem::take(&mut staged);
                if text.is_empty() && files.is_empty() {
                    println!("{}", "nothing to send".dimmed());
                    Ok(())
                } else {
                    send(&coordinator, &mut runtime.upload_events, &text, files).await
                }
            }
            ShellCommand::Retry(needle) => {
                match resolve_id(&coordinator.snapshot().await, &needle) {
                    Some(id) => match coordinator.retry(&id).await {
                        Ok(outcome) => {
                            print_outcome(&outcome);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    },
                    None => Err(ParleyError::NotFound {
                        id: MessageId::from(needle.as_str()),
                    }),
                }
            }
            ShellCommand::Delete(needle) => {
                match resolve_id(&coordinator.snapshot().await, &needle) {
                    Some(id) => coordinator.delete(&id).await.map(|()| {
                        println!("  deleted {}", short_id(&id));
                    }),
                    None => Err(ParleyError::NotFound {
                        id: MessageId::from(needle.as_str()),
                    }),
                }
            }
            ShellCommand::Search(query) => {
                let found = coordinator.search(&query).await;
                if found.is_empty() {
                    println!("{}", "no matches".dimmed());
                }
                for message in &found {
                    println!("{}", format_message(message));
                }
                Ok(())
            }
            ShellCommand::History => {
                for message in coordinator.snapshot().await {
                    println!("{}", format_message(&message));
                }
                Ok(())
            }
            ShellCommand::Export => coordinator.export().await.map(|receipt| {
                println!(
                    "  exported {} message(s) to {}",
                    receipt.message_count, receipt.location
                );
            }),
            ShellCommand::Clear => {
                coordinator.clear().await;
                staged.clear();
                println!("  transcript cleared");
                Ok(())
            }
            ShellCommand::Quota => {
                println!("  {}", format_quota(&coordinator.quota().await));
                Ok(())
            }
            ShellCommand::Status => {
                let context = coordinator.context().await;
                let who = context
                    .identity
                    .as_ref()
                    .map(|i| format!("{} ({})", i.display_name, i.id))
                    .unwrap_or_else(|| "signed out".to_string());
                println!("  connectivity: {}", context.connectivity);
                println!("  identity: {who}");
                if let Some(conversation) = &context.active_conversation {
                    println!("  conversation: {conversation}");
                }
                Ok(())
            }
            ShellCommand::Unknown(input) => {
                println!("unknown command {}, try {}", input.yellow(), "/help".yellow());
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("{}", error_line(&e));
        }
    }

    runtime.shutdown();
    println!("{}", "goodbye".dimmed());
    Ok(())
}
