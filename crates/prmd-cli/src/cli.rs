//! CLI argument parsing using clap derive

use clap::{Args, Parser, Subcommand};
use prmd_store::github::DEFAULT_API_URL;
use prmd_sync::ConfigFile;
use std::path::PathBuf;

/// prmd - Keep a markdown block in a pull request description, exactly once
#[derive(Parser, Debug)]
#[command(name = "prmd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Update the pull request that triggered a GitHub Actions workflow
    ///
    /// Reads the event payload from GITHUB_EVENT_PATH and the inputs from
    /// INPUT_ADD_MARKDOWN and INPUT_GITHUB_TOKEN, as set by the Actions runner.
    Github(GithubArgs),

    /// Add the block to a local markdown file
    File {
        /// File to update
        path: PathBuf,

        #[command(flatten)]
        block: BlockArgs,
    },

    /// Check whether a local markdown file already contains the block
    ///
    /// Exits with status 1 when the block is missing.
    Check {
        /// File to inspect
        path: PathBuf,

        #[command(flatten)]
        block: BlockArgs,
    },
}

/// Where the block and retry settings come from
#[derive(Args, Debug, Clone, Default)]
pub struct BlockArgs {
    /// Markdown block to maintain
    #[arg(long, env = "INPUT_ADD_MARKDOWN")]
    pub markdown: Option<String>,

    /// Read the markdown block from a file (takes precedence over --markdown)
    #[arg(long, value_name = "PATH")]
    pub markdown_file: Option<PathBuf>,

    /// Configuration file (.toml or .json)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Attempts for fetching and for writing
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base delay of the exponential backoff, in milliseconds
    #[arg(long)]
    pub backoff_base_ms: Option<u64>,
}

impl BlockArgs {
    /// Command-line layer of the configuration, without the markdown file.
    pub fn overrides(&self) -> ConfigFile {
        ConfigFile {
            block: self.markdown.clone().filter(|m| !m.is_empty()),
            max_retries: self.max_retries,
            backoff_base_ms: self.backoff_base_ms,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GithubArgs {
    #[command(flatten)]
    pub block: BlockArgs,

    /// GitHub token (falls back to GITHUB_TOKEN)
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path of the webhook event payload
    #[arg(long, env = "GITHUB_EVENT_PATH", value_name = "PATH")]
    pub event_path: Option<PathBuf>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Pull request number (overrides the event payload)
    #[arg(long)]
    pub pr: Option<u64>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Send the fetched ETag as If-Match when writing
    #[arg(long)]
    pub if_match: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_file_command() {
        let cli = Cli::try_parse_from([
            "prmd",
            "file",
            "BODY.md",
            "--markdown",
            "block",
            "--max-retries",
            "5",
        ])
        .unwrap();

        match cli.command {
            Commands::File { path, block } => {
                assert_eq!(path, PathBuf::from("BODY.md"));
                assert_eq!(block.markdown.as_deref(), Some("block"));
                assert_eq!(block.max_retries, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_empty_markdown_is_not_an_override() {
        let args = BlockArgs {
            markdown: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(args.overrides().block, None);
    }
}
