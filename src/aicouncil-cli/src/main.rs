//! AI Council CLI
//!
//! Puts one question to several AI backends at once (compare) or in turn
//! (debate) and prints every answer side by side.

mod chat;

use std::path::PathBuf;
use std::sync::Arc;

use aicouncil_core::{
    BackendId, BackendRegistry, Config, CouncilError, CouncilEvent, CouncilOrchestrator, CouncilRequest,
    EventCallback, InvocationResult, Message, Transcript, default_config, extract_inline_mode,
};
use clap::{ArgAction, Parser};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "aicouncil",
    version,
    about = "AI Council - Ask several AIs at once",
    long_about = "A CLI for putting one conversation to several AI backends, either side by side (compare) or in turn (debate)."
)]
struct Cli {
    /// The question to ask (may contain an inline `mode=debate`)
    #[arg(value_name = "QUESTION")]
    question: Option<String>,

    /// One-off mode for this question: compare or debate
    #[arg(short, long, value_name = "MODE")]
    mode: Option<String>,

    /// Path to a TOML config file (defaults to the built-in backends)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Per-backend timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Start an interactive thread instead of asking a single question
    #[arg(long)]
    chat: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    if let Some(secs) = cli.timeout {
        config.council.timeout_secs = secs;
    }

    let registry = Arc::new(BackendRegistry::from_config(&config));
    info!("Configured backends: {:?}", registry.active_backends());

    let orchestrator = CouncilOrchestrator::from_config(&config, Arc::clone(&registry))
        .with_callback(create_console_callback(Arc::clone(&registry)));

    print_header(&orchestrator);

    if cli.chat {
        return chat::run(&orchestrator).await;
    }

    let Some(question) = cli.question else {
        eprintln!(
            "{} A question is required. Use --chat for an interactive thread.",
            "Error:".red().bold()
        );
        std::process::exit(2);
    };

    let Some((inline_mode, question)) = parse_question(&question) else {
        eprintln!("{} The question is empty.", "Error:".red().bold());
        std::process::exit(2);
    };
    let mut request = CouncilRequest::new(Transcript::from(vec![Message::user(question)]));
    request.mode_override = cli.mode.or(inline_mode);

    match run_cancellable(&orchestrator, request).await {
        Ok(results) => print_results(orchestrator.registry(), &results),
        Err(CouncilError::Cancelled { completed }) => {
            println!("{}", "Run cancelled.".yellow());
            print_results(orchestrator.registry(), &completed);
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Split an inline `mode=` override off a question. `None` when nothing
/// is left to ask.
pub(crate) fn parse_question(text: &str) -> Option<(Option<String>, String)> {
    let (inline_mode, question) = extract_inline_mode(text);
    if question.is_empty() {
        return None;
    }
    Some((inline_mode, question))
}

/// Run a request, cancelling it if Ctrl-C is pressed.
pub(crate) async fn run_cancellable(
    orchestrator: &CouncilOrchestrator,
    request: CouncilRequest,
) -> Result<Vec<InvocationResult>, CouncilError> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let result = orchestrator.run_with_cancellation(request, cancel).await;
    watcher.abort();
    result
}

fn print_header(orchestrator: &CouncilOrchestrator) {
    let registry = orchestrator.registry();

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - {}", "AI Council".bold(), orchestrator.mode().description())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    if registry.is_empty() {
        println!(
            "{}",
            "Warning: no backends configured. Set OPENAI_API_KEY, GOOGLE_API_KEY, XAI_API_KEY or DOUBAO_API_KEY."
                .yellow()
        );
    } else {
        println!("{}", "Backends:".bold());
        for (i, backend) in registry.adapters().iter().enumerate() {
            let profile = backend.profile();
            println!(
                "  {}. {} {} - using {}",
                i + 1,
                profile.icon,
                profile.display_name.bright_cyan(),
                profile.model.dimmed()
            );
        }
    }
    println!();
    println!("{}", "─".repeat(70).dimmed());
}

/// Print each backend's reply or failure, in the order given.
pub(crate) fn print_results(registry: &BackendRegistry, results: &[InvocationResult]) {
    for result in results {
        let (name, icon) = match registry.adapter_for(&result.backend) {
            Ok(adapter) => (
                adapter.profile().display_name.clone(),
                adapter.profile().icon.clone(),
            ),
            Err(_) => (result.backend.to_string(), String::new()),
        };

        println!();
        println!("{} {} {}", "▶".bright_cyan(), icon, name.bright_cyan().bold());
        match &result.outcome {
            Ok(text) => {
                for line in textwrap(text, 66).lines() {
                    println!("  {}", line);
                }
            }
            Err(e) => println!("  {}", format!("Error from {}: {}", name, e).red()),
        }
    }
    println!();
}

/// Create a callback that prints council events to the console.
fn create_console_callback(registry: Arc<BackendRegistry>) -> EventCallback {
    let name_of = move |backend: &BackendId| {
        registry
            .adapter_for(backend)
            .map(|a| a.profile().display_name.clone())
            .unwrap_or_else(|_| backend.to_string())
    };

    Arc::new(move |event: CouncilEvent| match event {
        CouncilEvent::RunStarted { mode, backends } => {
            println!(
                "{}",
                format!("  Asking {} backend(s) in {} mode...", backends.len(), mode).dimmed()
            );
        }
        CouncilEvent::BackendStarted { backend } => {
            println!("  {} {}", "…".dimmed(), name_of(&backend).dimmed());
        }
        CouncilEvent::BackendFinished { backend, success } => {
            let mark = if success { "✓".green() } else { "✗".red() };
            println!("  {} {}", mark, name_of(&backend));
        }
        CouncilEvent::RunFinished => {}
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();

    for (i, paragraph) in text.lines().enumerate() {
        if i > 0 {
            result.push('\n');
        }
        let mut current_line_len = 0;
        for word in paragraph.split_whitespace() {
            if current_line_len + word.len() + 1 > width && current_line_len > 0 {
                result.push('\n');
                current_line_len = 0;
            }
            if current_line_len > 0 {
                result.push(' ');
                current_line_len += 1;
            }
            result.push_str(word);
            current_line_len += word.len();
        }
    }

    result
}
