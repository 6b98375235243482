//! CLI mode implementation
//!
//! Command-line surface for launching shortcuts and inspecting the URLs
//! the launcher would open.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Shortcutd CLI
#[derive(Parser)]
#[command(name = "shortcutd")]
#[command(about = "Run Apple Shortcuts with x-callback-url completion handling", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (no short flag to avoid conflicts)
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch a shortcut and wait for its completion callback
    Run(RunArgs),
    /// Print the shortcuts:// URL that would be opened, without launching
    Url(UrlArgs),
}

/// Run command arguments
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Name of the shortcut, as displayed in the Shortcuts app
    pub shortcut: String,

    /// Launch without waiting for the completion callback
    #[arg(long)]
    pub no_wait: bool,

    /// Seconds to wait for the completion callback
    #[arg(long, default_value_t = 300)]
    pub wait_timeout_secs: u64,
}

/// Url command arguments
#[derive(Parser, Debug)]
pub struct UrlArgs {
    /// Name of the shortcut, as displayed in the Shortcuts app
    pub shortcut: String,

    /// Text input to pass to the shortcut
    #[arg(short, long)]
    pub input: Option<String>,
}
