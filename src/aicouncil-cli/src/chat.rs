//! Interactive thread: every question and reply stays in one transcript,
//! so later questions see the earlier exchange.

use std::io::Write;

use aicouncil_core::{
    BackendId, CouncilError, CouncilOrchestrator, CouncilRequest, InvocationResult, Message,
    ModeCommand, Transcript,
};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::{parse_question, print_results, run_cancellable};

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Quit,
    Help,
    Backends,
    Mode(String),
    Ask { backend: BackendId, question: String },
    Question { mode: Option<String>, question: String },
    Empty,
}

impl ChatCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ChatCommand::Empty);
        }
        if ModeCommand::is_mode_command(line) {
            return Ok(ChatCommand::Mode(line.to_string()));
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command.to_lowercase().as_str() {
            "/quit" | "/exit" => Ok(ChatCommand::Quit),
            "/help" => Ok(ChatCommand::Help),
            "/backends" => Ok(ChatCommand::Backends),
            "/ask" => {
                let Some((backend, question)) = rest.split_once(char::is_whitespace) else {
                    return Err("Usage: /ask <backend> <question>".to_string());
                };
                Ok(ChatCommand::Ask {
                    backend: BackendId::new(backend),
                    question: question.trim().to_string(),
                })
            }
            other if other.starts_with('/') => Err(format!("Unknown command: {}", command)),
            _ => match parse_question(line) {
                Some((mode, question)) => Ok(ChatCommand::Question { mode, question }),
                None => Err("Nothing to ask. Type a question after mode=...".to_string()),
            },
        }
    }
}

/// Run the read-eval-print loop until `/quit` or end of input.
pub async fn run(orchestrator: &CouncilOrchestrator) -> Result<(), Box<dyn std::error::Error>> {
    print_help();

    let mut thread = Transcript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", ">".bright_green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ChatCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e.yellow());
                continue;
            }
        };

        match command {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => print_help(),
            ChatCommand::Backends => print_backends(orchestrator),
            ChatCommand::Mode(text) => match ModeCommand::parse(&text) {
                Ok(Some(ModeCommand::Set(mode))) => {
                    orchestrator.set_mode(mode);
                    println!("{}", format!("Switched to {}", mode.description()).green());
                }
                Ok(Some(ModeCommand::Status)) | Ok(None) => {
                    println!("Current mode: {}", orchestrator.mode().description().bold());
                }
                Err(e) => println!("{}", e.to_string().yellow()),
            },
            ChatCommand::Ask { backend, question } => {
                let mut next = thread.clone();
                next.push(Message::user(question));
                match orchestrator.follow_up(&next, &backend).await {
                    Ok(result) => {
                        print_results(orchestrator.registry(), std::slice::from_ref(&result));
                        commit(&mut next, std::slice::from_ref(&result));
                        thread = next;
                    }
                    Err(e) => println!("{} {}", "Error:".red().bold(), e),
                }
            }
            ChatCommand::Question { mode, question } => {
                let mut next = thread.clone();
                next.push(Message::user(question));

                let mut request = CouncilRequest::new(next.clone());
                request.mode_override = mode;

                match run_cancellable(orchestrator, request).await {
                    Ok(results) => {
                        print_results(orchestrator.registry(), &results);
                        commit(&mut next, &results);
                        thread = next;
                    }
                    Err(CouncilError::Cancelled { completed }) => {
                        println!("{}", "Run cancelled.".yellow());
                        print_results(orchestrator.registry(), &completed);
                        commit(&mut next, &completed);
                        thread = next;
                    }
                    Err(e) => println!("{} {}", "Error:".red().bold(), e),
                }
            }
        }
    }

    println!("{}", "Goodbye.".dimmed());
    Ok(())
}

/// Append the successful replies to the thread; failures are not part of
/// the conversation.
fn commit(thread: &mut Transcript, results: &[InvocationResult]) {
    for result in results {
        if let Some(text) = result.text() {
            thread.push(Message::backend_reply(result.backend.clone(), text));
        }
    }
    debug!("Thread now holds {} message(s)", thread.len());
}

fn print_backends(orchestrator: &CouncilOrchestrator) {
    let registry = orchestrator.registry();
    if registry.is_empty() {
        println!("{}", "No backends configured.".yellow());
        return;
    }
    for backend in registry.adapters() {
        let profile = backend.profile();
        println!(
            "  {} {} {} ({})",
            profile.icon,
            backend.id().as_str().bold(),
            profile.display_name.bright_cyan(),
            profile.model.dimmed()
        );
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  /mode [compare|debate|status]  show or switch the mode");
    println!("  /ask <backend> <question>      follow up with one backend");
    println!("  /backends                      list configured backends");
    println!("  /quit                          leave the thread");
    println!("  Anything else is asked to the council. Add mode=debate for a one-off mode.");
    println!("  Ctrl-C cancels a run in progress.");
    println!();
}
