//! Guess CLI
//!
//! Serves the number guessing game over HTTP, or plays it in the terminal.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use guess_game::{
    create_router, game, spawn_idle_sweeper, AppState, Config, ConsistencyMode, GuessVerdict,
    NumberInput, SecretSource, ThreadRngSource,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Guess - Number Guessing Game
///
/// Serves a guessing game and multiplication table over HTTP. Each player
/// tries to find a secret number between 0 and 100.
#[derive(Parser, Debug)]
#[command(name = "guess")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: guess.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Address to bind the HTTP API server to
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port for the HTTP API server
    #[arg(short, long)]
    port: Option<u16>,

    /// Session consistency mode: atomic or lastWriteWins
    #[arg(long, value_name = "MODE")]
    consistency: Option<ConsistencyMode>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Play in the terminal instead of serving HTTP
    #[arg(long)]
    play: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(config = ?args.config, "Config file");

    let result = if args.play {
        play(&ThreadRngSource::new()).await
    } else {
        serve(args).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads the config, applies overrides and serves the API until Ctrl+C.
async fn serve(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(consistency) = args.consistency {
        config.consistency = consistency;
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;
    let local_addr = listener.local_addr()?;

    let state = AppState::new(config.clone());
    let sweeper = spawn_idle_sweeper(
        Arc::clone(&state.sessions),
        config.sweep_period(),
        config.idle_timeout(),
    );
    let router = create_router(state);

    tracing::info!(addr = %local_addr, consistency = %config.consistency, "Server listening");
    println!("HTTP API server running on http://{local_addr}");
    println!("Press Ctrl+C to stop");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    tracing::info!("Server stopped");

    result.map_err(|e| anyhow::anyhow!("HTTP server error: {e}"))
}

/// Resolves once Ctrl+C is received.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for Ctrl+C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Address: {}", config.bind_address());
    println!("  Consistency: {}", config.consistency);
    println!("  Session idle timeout: {}s", config.session_idle_timeout);
    println!("  Sweep interval: {}s", config.sweep_interval);
}

// ============================================================================
// Terminal game
// ============================================================================

/// A line typed during a terminal game.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlayCommand {
    New,
    Quit,
    Guess(i64),
    Unrecognized(String),
}

impl PlayCommand {
    /// Parses a line; blank lines yield `None`.
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let command = match line.to_ascii_lowercase().as_str() {
            "new" => Self::New,
            "quit" | "q" => Self::Quit,
            _ => NumberInput::Text(line.to_string())
                .as_integer()
                .map_or_else(|| Self::Unrecognized(line.to_string()), Self::Guess),
        };
        Some(command)
    }
}

/// Plays games on stdin until `quit` or end of input.
async fn play(secrets: &dyn SecretSource) -> anyhow::Result<()> {
    let mut slot = None;
    println!("{}", game::start(&mut slot, secrets)?.message);
    println!("Type a number to guess, 'new' to restart or 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match PlayCommand::parse(&line) {
            None => {}
            Some(PlayCommand::Quit) => break,
            Some(PlayCommand::New) => {
                println!("{}", game::start(&mut slot, secrets)?.message);
            }
            Some(PlayCommand::Guess(value)) => {
                let outcome = game::submit_guess(&mut slot, value);
                tracing::debug!(value, verdict = ?outcome.verdict, attempts = outcome.attempts, "Guess");
                println!("{}", outcome.message);
                if outcome.verdict == GuessVerdict::Correct {
                    println!("Type 'new' to play again or 'quit' to exit.");
                }
            }
            Some(PlayCommand::Unrecognized(input)) => {
                println!("'{input}' is not a number. Type a number, 'new' or 'quit'.");
            }
        }
        prompt()?;
    }

    println!();
    println!("Bye!");
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}
