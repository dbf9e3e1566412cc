//! prmd CLI
//!
//! Keeps a markdown block in a pull request description exactly once, either
//! as a GitHub Actions step or against a local file.

mod cli;
mod commands;
mod error;
mod event;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
            // Workflow command, rendered as an annotation on the run.
            println!("::error::{}", escape_workflow_data(&e.to_string()));
        }
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialize logging: {}", "warning".yellow(), e);
    }
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Commands::Github(args) => commands::run_github(&args),
        Commands::File { path, block } => commands::run_file(&path, &block),
        Commands::Check { path, block } => commands::run_check(&path, &block),
    }
}

/// Escape a message for use as workflow command data.
fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_workflow_data() {
        assert_eq!(
            escape_workflow_data("100% failed\r\nat line 2\n"),
            "100%25 failed%0D%0Aat line 2%0A"
        );
        assert_eq!(escape_workflow_data("plain"), "plain");
    }
}
