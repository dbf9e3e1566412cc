//! Command implementations

use crate::cli::{BlockArgs, GithubArgs};
use crate::error::{CliError, Result};
use crate::event::EventPayload;
use colored::Colorize;
use prmd_store::{DocumentStore, FileStore, GitHubStore, PullRequestRef, ResourceId};
use prmd_sync::{
    ConfigFile, Reconciler, RunInput, RunOutcome, RunReport, SyncConfig, SyncError,
};
use std::path::Path;

/// Build the validated configuration from file, flags and environment.
///
/// Runs before any request so that configuration errors abort early.
pub fn resolve_config(args: &BlockArgs) -> Result<SyncConfig> {
    let file_layer = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };

    let mut overrides = args.overrides();
    if let Some(path) = &args.markdown_file {
        let markdown = std::fs::read_to_string(path).map_err(|e| CliError::Read {
            what: "markdown file",
            path: path.clone(),
            source: e,
        })?;
        overrides.block = Some(markdown);
    }

    Ok(file_layer.merge(overrides).into_config()?)
}

pub fn run_github(args: &GithubArgs) -> Result<()> {
    let config = resolve_config(&args.block)?;

    let token = args
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
        .ok_or_else(|| {
            SyncError::configuration(
                "no GitHub token; set the github_token input or GITHUB_TOKEN",
            )
        })?;

    let payload = match &args.event_path {
        Some(path) => EventPayload::load(path)?,
        None => EventPayload::default(),
    };

    let number = args
        .pr
        .or_else(|| payload.pull_request.as_ref().map(|pr| pr.number))
        .ok_or_else(|| CliError::user("no pull request found in event payload"))?;

    let repository = args
        .repository
        .clone()
        .or_else(|| payload.repository.as_ref().map(|r| r.full_name.clone()))
        .ok_or_else(|| CliError::user("no repository given; set GITHUB_REPOSITORY"))?;
    let (owner, repo) = repository
        .split_once('/')
        .ok_or_else(|| CliError::user(format!("invalid repository '{repository}'")))?;

    let pr = PullRequestRef::new(owner, repo, number);
    let mut input = RunInput::new(pr.resource_id());
    input.trigger_action = payload.action.clone();
    input.cached_body = payload.cached_body();

    let store = GitHubStore::new(&args.api_url, token)?.with_conditional_writes(args.if_match);
    let report = block_on(execute(&store, &config, &input))??;
    print_report(&pr.to_string(), &report);
    Ok(())
}

pub fn run_file(path: &Path, args: &BlockArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let resource = ResourceId::new(path.to_string_lossy().to_string());
    let input = RunInput::new(resource);

    let store = FileStore::new();
    let report = block_on(execute(&store, &config, &input))??;
    print_report(&path.display().to_string(), &report);
    Ok(())
}

pub fn run_check(path: &Path, args: &BlockArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let document = std::fs::read_to_string(path).map_err(|e| CliError::Read {
        what: "document",
        path: path.to_path_buf(),
        source: e,
    })?;

    if !prmd_text::is_present(&document, &config.block) {
        return Err(CliError::user(format!(
            "markdown block not present in {}",
            path.display()
        )));
    }

    if let Some(found) = prmd_text::find_block(&document, &config.block) {
        tracing::debug!(
            start_line = found.start_line + 1,
            end_line = found.end_line,
            lines = found.line_count(),
            "Block location"
        );
    }
    println!("{} markdown block present in {}", "ok".green().bold(), path.display());
    Ok(())
}

async fn execute<S: DocumentStore>(
    store: &S,
    config: &SyncConfig,
    input: &RunInput,
) -> prmd_sync::Result<RunReport> {
    Reconciler::new(store, config).run(input).await
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

fn print_report(target: &str, report: &RunReport) {
    if report.used_cached_body {
        println!(
            "{} used the event payload body; the API could not be reached",
            "warning".yellow().bold()
        );
    }
    match report.outcome {
        RunOutcome::AlreadyPresent => println!(
            "{} markdown block already present in {}",
            "ok".green().bold(),
            target
        ),
        RunOutcome::Updated => println!(
            "{} updated {} (attempt {})",
            "ok".green().bold(),
            target,
            report.write_attempts
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_markdown_file_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("prmd.toml");
        fs::write(&config_path, "block = \"from config\"\nmax_retries = 4\n").unwrap();
        let markdown_path = dir.path().join("block.md");
        fs::write(&markdown_path, "from file\n").unwrap();

        let args = BlockArgs {
            markdown: Some("from flag".into()),
            markdown_file: Some(markdown_path),
            config: Some(config_path),
            ..Default::default()
        };

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.block, "from file\n");
        assert_eq!(config.max_retries, 4);
    }

    #[test]
    fn test_missing_block_is_reported() {
        let err = resolve_config(&BlockArgs::default()).unwrap_err();
        assert!(err.to_string().contains("no markdown block configured"));
    }

    #[test]
    fn test_run_file_appends_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BODY.md");
        fs::write(&path, "Description").unwrap();

        let args = BlockArgs {
            markdown: Some("**Deploy preview** pending".into()),
            backoff_base_ms: Some(0),
            ..Default::default()
        };
        run_file(&path, &args).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Description\n\n**Deploy preview** pending"
        );
    }
}
