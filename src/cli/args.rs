use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::constants::NON_INTERACTIVE_TIMEOUT_SECS;
use crate::session::ChatMode;

#[derive(Parser, Debug)]
#[command(name = "helferlein")]
#[command(version)]
#[command(about = "Upload test scans and a model solution, then chat about them", long_about = None)]
pub struct Cli {
    /// Server base URL (e.g., http://localhost:5000)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Server contract: channel (readiness-gated) or request (plain /chat)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<ChatMode>,

    /// Scanned test page to upload (repeatable)
    #[arg(short, long = "test-file", value_name = "PATH")]
    pub test_files: Vec<PathBuf>,

    /// Model solution to upload
    #[arg(long, value_name = "PATH")]
    pub solution_file: Option<PathBuf>,

    /// Upload the selected files as soon as the session starts
    #[arg(long, conflicts_with = "prompt")]
    pub upload: bool,

    /// Log file for the interactive session
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Non-interactive question to ask once the files are processed
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Output format for non-interactive mode
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, requires = "prompt")]
    pub output_format: OutputFormat,

    /// Give up after this many seconds (non-interactive mode)
    #[arg(long, default_value_t = NON_INTERACTIVE_TIMEOUT_SECS, requires = "prompt")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

fn parse_mode(s: &str) -> Result<ChatMode, String> {
    ChatMode::from_str(s).ok_or_else(|| format!("unknown mode '{}' (use channel or request)", s))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// Start a chat session (default)
    Chat,
    /// Show version information
    Version,
    /// Check server reachability and configuration
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
    /// Markdown formatted output
    Markdown,
}
