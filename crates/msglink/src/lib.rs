//! CLI commands for msglink
//!
//! This crate wires the core library to a command line:
//! - `check`: canonicalize a link
//! - `parse`: classify a link and print it as JSON
//! - `build`: generate a link from its JSON description
//! - `history`: replay an ordered-message script

#![forbid(unsafe_code)]

pub mod script;

use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use msglink_core::{Config, InternalLink, LinkManager};
use msglink_history::OrderedMessages;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("line {line}: {message}")]
    Script { line: usize, message: String },
    #[error("line {line}: {message}")]
    Operation { line: usize, message: String },
    #[error(transparent)]
    Link(#[from] msglink_core::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// 2 for malformed input, 1 for everything that failed while running.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_)
            | Self::Script { .. }
            | Self::Link(msglink_core::Error::Json(_) | msglink_core::Error::Config(_)) => 2,
            Self::Operation { .. } | Self::Link(_) | Self::Io(_) => 1,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "msglink", version, about = "Link classifier and message history tools")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the canonical form of a `tg:`, `ton:` or HTTP(S) link.
    Check { url: String },
    /// Classify a link and print the result as JSON (`null` if unknown).
    Parse {
        url: String,
        /// Treat the link as coming from a trusted source (enables bot start autostart).
        #[arg(long)]
        trusted: bool,
    },
    /// Generate a link from a JSON link description.
    Build {
        json: String,
        /// Produce a t.me link instead of a `tg://` deep link.
        #[arg(long)]
        external: bool,
    },
    /// Replay a history script from FILE, or stdin.
    History { file: Option<PathBuf> },
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::from_env();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(cli, &config, &mut out) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub fn execute(cli: Cli, config: &Config, out: &mut impl Write) -> CliResult<()> {
    let manager = LinkManager::new(config);
    match cli.command {
        Commands::Check { url } => {
            writeln!(out, "{}", manager.check_link(&url)?)?;
        }
        Commands::Parse { url, trusted } => {
            let link = manager.parse_internal_link(&url, trusted);
            let json = serde_json::to_string_pretty(&link).map_err(msglink_core::Error::from)?;
            writeln!(out, "{json}")?;
        }
        Commands::Build { json, external } => {
            let link: InternalLink =
                serde_json::from_str(&json).map_err(msglink_core::Error::from)?;
            writeln!(out, "{}", manager.get_internal_link(&link, !external)?)?;
        }
        Commands::History { file } => {
            let source = match file {
                Some(path) => std::fs::read_to_string(&path).map_err(|err| {
                    CliError::InvalidArgument(format!("{}: {err}", path.display()))
                })?,
                None => {
                    let mut source = String::new();
                    io::stdin().read_to_string(&mut source)?;
                    source
                }
            };
            let mut messages = OrderedMessages::from_config(config);
            script::run_script(&source, &mut messages, out)?;
        }
    }
    Ok(())
}
