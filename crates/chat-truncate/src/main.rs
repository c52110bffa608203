//! Truncate a chat conversation so its rendered prompt fits a context window.
//!
//! Reads a JSON array of OpenAI-style messages, evicts the oldest whole
//! turns until the ChatML-rendered prompt fits the token ceiling, and prints
//! the surviving messages as JSON.
//!
//! # Examples
//!
//! ```sh
//! # 4k window, unbounded generation, prompt capped at 80% of the window
//! chat-truncate --input chat.json --ctx-size 4096
//!
//! # Reserve exactly 512 tokens for the reply
//! chat-truncate --input chat.json --ctx-size 4096 --n-predict 512
//!
//! # Pipe from stdin, print the final prompt and a summary
//! cat chat.json | chat-truncate --ctx-size 2048 --fraction 0.5 --prompt --stats
//!
//! # Only check whether the conversation fits; never remove turns
//! chat-truncate --input chat.json --ctx-size 2048 --no-truncate
//! ```

use chat_truncate::config::{DEFAULT_CONTEXT_SIZE, TruncateConfig};
use chat_truncate::context::DEFAULT_TARGET_FRACTION;
use chat_truncate::context::turns::turn_count;
use chat_truncate::session::prepare_prompt;
use chat_truncate::tokenizer::DEFAULT_CHARS_PER_TOKEN;
use chat_truncate::{Message, load_messages, parse_messages};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Truncate a chat conversation so its rendered prompt fits a context window.
///
/// Set RUST_LOG (e.g. RUST_LOG=chat_truncate=debug) to trace evictions.
#[derive(Parser)]
#[command(name = "chat-truncate")]
struct Cli {
    // ── Input ──────────────────────────────────────────────────
    /// JSON file holding an array of messages (reads stdin when omitted)
    #[arg(long)]
    input: Option<PathBuf>,

    // ── Context parameters ─────────────────────────────────────
    /// Context window size in tokens
    #[arg(long, default_value_t = DEFAULT_CONTEXT_SIZE)]
    ctx_size: u32,

    /// Tokens reserved for generation (-1 = unbounded)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    n_predict: i64,

    /// Fraction of the window the prompt may use when generation is unbounded
    #[arg(long, default_value_t = DEFAULT_TARGET_FRACTION)]
    fraction: f64,

    /// Never remove turns; fail if the prompt does not fit
    #[arg(long)]
    no_truncate: bool,

    // ── Rendering / tokenizing ─────────────────────────────────
    /// Characters per token for the built-in estimator
    #[arg(long, default_value_t = DEFAULT_CHARS_PER_TOKEN)]
    chars_per_token: f64,

    /// Do not append the assistant generation header to the prompt
    #[arg(long)]
    no_generation_prompt: bool,

    // ── Output mode ────────────────────────────────────────────
    /// Print the rendered prompt instead of the messages
    #[arg(long)]
    prompt: bool,

    /// Print a truncation summary to stderr
    #[arg(long)]
    stats: bool,
}

impl Cli {
    /// Build and validate the config. Every flag is checked, including
    /// `--fraction` when `--no-truncate` discards it.
    fn config(&self) -> Result<TruncateConfig, String> {
        let config = TruncateConfig::new(self.ctx_size)
            .with_predicted_length(self.n_predict)
            .with_target_fraction(self.fraction)
            .with_chars_per_token(self.chars_per_token)
            .with_generation_prompt(!self.no_generation_prompt);
        config.validate()?;
        if self.no_truncate {
            Ok(config.without_truncation())
        } else {
            Ok(config)
        }
    }
}

fn read_input(input: Option<&Path>) -> Result<Vec<Message>, String> {
    match input {
        Some(path) => load_messages(path),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            parse_messages(&buf)
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = cli.config()?;

    let mut messages = read_input(cli.input.as_deref())?;
    let original_len = messages.len();
    let original_turns = turn_count(&messages);

    let template = config.build_template();
    let tokenizer = config.build_tokenizer()?;
    let prepared = prepare_prompt(&mut messages, &config, &template, &tokenizer)
        .map_err(|e| format!("{} ({})", e, e.kind()))?;

    if cli.stats {
        eprintln!("  {}", config.limits().to_log_string());
        match &prepared.truncation {
            Some(report) => eprintln!("  {}", report.to_log_string()),
            None if config.truncation_enabled() => {
                eprintln!("  within ceiling: {} tokens", prepared.n_tokens)
            }
            None => eprintln!("  truncation disabled: {} tokens", prepared.n_tokens),
        }
        eprintln!(
            "  turns: {} -> {}, messages: {} -> {}, prompt changed: {}",
            original_turns,
            turn_count(&messages),
            original_len,
            messages.len(),
            prepared.prompt_changed,
        );
    }

    if cli.prompt {
        print!("{}", prepared.prompt);
    } else {
        let json = serde_json::to_string_pretty(&messages)
            .map_err(|e| format!("failed to serialize messages: {e}"))?;
        println!("{json}");
    }
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
