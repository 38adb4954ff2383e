//! CLI command definitions and execution
//!
//! Every command resolves its target the same way: parse it as a bucket URL
//! or `alias/key`, resolve the alias from the config file, and open the
//! bucket through the scheme registry.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sb_core::{AliasManager, Bucket, ConfigManager, Registry, Result, TargetPath, parse_target};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod alias;
mod cat;
mod ls;
mod put;
mod rm;
mod sign;
mod stat;

/// sb - blob storage CLI
///
/// Reads, writes and lists objects through the portable bucket layer.
/// Targets are bucket URLs (`s3://bucket/key?region=us-east-1`) or
/// `alias/key` with aliases from the config file.
#[derive(Parser, Debug)]
#[command(name = "sb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage bucket aliases
    #[command(subcommand)]
    Alias(alias::AliasCommands),

    /// List objects
    Ls(ls::LsArgs),

    /// Write object contents (or a byte range) to stdout
    Cat(cat::CatArgs),

    /// Upload a file or stdin to an object
    Put(put::PutArgs),

    /// Show object attributes
    Stat(stat::StatArgs),

    /// Remove objects
    Rm(rm::RmArgs),

    /// Generate a presigned download URL
    Sign(sign::SignArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let config = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(config) => config,
        Err(e) => {
            Formatter::default().error(&format!("Failed to load configuration: {e}"));
            return ExitCode::from(&e);
        }
    };

    let output_config = OutputConfig {
        json: cli.json || config.defaults.output == "json",
        no_color: cli.no_color || !console::colors_enabled(),
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };
    let defaults = config.defaults;

    match cli.command {
        Commands::Alias(cmd) => alias::execute(cmd, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config, &defaults).await,
        Commands::Cat(args) => cat::execute(args, output_config).await,
        Commands::Put(args) => put::execute(args, output_config, &defaults).await,
        Commands::Stat(args) => stat::execute(args, output_config).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
        Commands::Sign(args) => sign::execute(args, output_config).await,
    }
}

/// Bucket URL a target refers to
fn bucket_url(target: &TargetPath) -> Result<String> {
    match target {
        TargetPath::Url { bucket_url, .. } => Ok(bucket_url.clone()),
        TargetPath::Alias { alias, .. } => Ok(AliasManager::new()?.get(alias)?.url),
    }
}

/// Open the bucket a target lives in
pub(crate) async fn open_bucket(target: &TargetPath) -> Result<Arc<dyn Bucket>> {
    let url = bucket_url(target)?;
    let mut registry = Registry::new();
    sb_s3::register(&mut registry)?;
    registry.open(&url).await
}

/// Report an error and map it to an exit code
pub(crate) fn fail(formatter: &Formatter, context: &str, err: &sb_core::Error) -> ExitCode {
    formatter.error(&format!("{context}: {err}"));
    ExitCode::from(err)
}

/// Parse a target argument and open its bucket
pub(crate) async fn resolve(
    path: &str,
    formatter: &Formatter,
) -> std::result::Result<(TargetPath, Arc<dyn Bucket>), ExitCode> {
    let target = parse_target(path).map_err(|e| fail(formatter, "Invalid target", &e))?;
    let bucket = open_bucket(&target)
        .await
        .map_err(|e| fail(formatter, "Failed to open bucket", &e))?;
    Ok((target, bucket))
}

/// Parse a target that must name a single object
pub(crate) async fn resolve_object(
    path: &str,
    formatter: &Formatter,
) -> std::result::Result<(TargetPath, Arc<dyn Bucket>), ExitCode> {
    let target = parse_target(path).map_err(|e| fail(formatter, "Invalid target", &e))?;
    if target.key().is_empty() {
        formatter.error(&format!("Object key is required: '{path}'"));
        return Err(ExitCode::UsageError);
    }
    let bucket = open_bucket(&target)
        .await
        .map_err(|e| fail(formatter, "Failed to open bucket", &e))?;
    Ok((target, bucket))
}
