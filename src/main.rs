//! shortcutd
//!
//! Runs Apple Shortcuts from the command line and hosts a local
//! x-callback-url server that receives their completion callbacks and
//! dispatches a configured completion command (notification, custom unix
//! command, or a chained shortcut).

mod cli;
mod config;
mod exec;
mod server;
mod shortcut;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use server::{CallbackOutcome, CallbackServer};
use shortcut::Shortcut;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flags
    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr) // Log to stderr to keep stdout clean
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Some(Commands::Run(args)) => execute_run(args, config).await,
        Some(Commands::Url(args)) => execute_url(args),
        None => {
            eprintln!("Error: No command specified. Use --help for usage information.");
            std::process::exit(1);
        }
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(get_exit_code(&e));
        }
    }
}

enum WaitResult {
    Outcome(Result<CallbackOutcome>),
    Interrupted,
}

/// Launch a shortcut and, when callback handling is live, wait for the
/// completion callback to be dispatched.
async fn execute_run(args: cli::RunArgs, config: config::Config) -> Result<String> {
    let config = Arc::new(config);
    let mut server = CallbackServer::start(config.clone()).await;

    {
        let callback_target = server.is_listening().then_some(&server);
        let shortcut = Shortcut::new(&args.shortcut, callback_target, None);
        shortcut
            .run(exec::EXEC_DEFAULT_TIMEOUT)
            .await
            .context("Failed to launch shortcut")?;
    }

    if args.no_wait || !server.is_listening() {
        server.destroy();
        return Ok(format!("✓ Launched shortcut \"{}\"", args.shortcut));
    }

    info!("Waiting for shortcut completion callback...");
    let wait_timeout = Duration::from_secs(args.wait_timeout_secs);
    let waited = tokio::select! {
        outcome = server.wait_for_outcome(wait_timeout) => WaitResult::Outcome(outcome),
        _ = tokio::signal::ctrl_c() => WaitResult::Interrupted,
    };
    server.destroy();

    match waited {
        WaitResult::Outcome(outcome) => {
            let outcome = outcome?;
            Ok(format!(
                "✓ Shortcut \"{}\" completed with status: {}",
                outcome.shortcut, outcome.status
            ))
        }
        WaitResult::Interrupted => Ok("Interrupted, callback server closed".to_string()),
    }
}

/// Print the shortcuts:// URL without launching anything.
fn execute_url(args: cli::UrlArgs) -> Result<String> {
    let shortcut = Shortcut::new(&args.shortcut, None, args.input);
    Ok(shortcut.url())
}

/// Map an error to an exit code
fn get_exit_code(err: &anyhow::Error) -> i32 {
    let err_str = err.to_string().to_lowercase();

    if err_str.contains("invalid") || err_str.contains("usage") {
        1 // Invalid arguments or usage error
    } else if err_str.contains("bind") || err_str.contains("listening") {
        2 // Callback server error
    } else if err_str.contains("timed out") || err_str.contains("timeout") {
        4 // Timeout error
    } else {
        5 // Other application errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_classification() {
        assert_eq!(get_exit_code(&anyhow::anyhow!("Invalid handle")), 1);
        assert_eq!(
            get_exit_code(&anyhow::anyhow!("Callback server is not listening")),
            2
        );
        assert_eq!(
            get_exit_code(&anyhow::anyhow!(
                "Timed out waiting for shortcut completion callback"
            )),
            4
        );
        assert_eq!(get_exit_code(&anyhow::anyhow!("something else")), 5);
    }

    #[tokio::test]
    async fn test_execute_url_fire_and_forget() {
        let output = execute_url(cli::UrlArgs {
            shortcut: "Tea Timer".to_string(),
            input: None,
        })
        .expect("url");
        assert_eq!(output, "shortcuts://run-shortcut\\?name=Tea%20Timer");
    }

    #[tokio::test]
    async fn test_execute_url_with_input() {
        let output = execute_url(cli::UrlArgs {
            shortcut: "Handler".to_string(),
            input: Some("payload".to_string()),
        })
        .expect("url");
        assert_eq!(
            output,
            "shortcuts://run-shortcut\\?name=Handler\\&input=text\\&text=payload"
        );
    }
}
