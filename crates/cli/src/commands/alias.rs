//! Alias management commands
//!
//! Aliases are short names for bucket URLs stored in the config file.

use clap::Subcommand;
use serde::Serialize;
use sb_core::{Alias, AliasManager};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Alias subcommands
#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Add or update an alias
    Set(SetArgs),

    /// List all configured aliases
    List,

    /// Remove an alias
    Remove(RemoveArgs),
}

/// Arguments for the `alias set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Alias name (e.g., "logs")
    pub name: String,

    /// Bucket URL (e.g., "s3://logs-bucket?region=eu-west-1")
    pub url: String,
}

/// Arguments for the `alias remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the alias to remove
    pub name: String,
}

#[derive(Serialize)]
struct AliasListOutput {
    aliases: Vec<Alias>,
}

#[derive(Serialize)]
struct AliasOperationOutput {
    success: bool,
    alias: String,
    message: String,
}

/// Execute an alias subcommand
pub async fn execute(cmd: AliasCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match AliasManager::new() {
        Ok(manager) => manager,
        Err(e) => return fail(&formatter, "Failed to open configuration", &e),
    };

    match cmd {
        AliasCommands::Set(args) => execute_set(args, &manager, &formatter),
        AliasCommands::List => execute_list(&manager, &formatter),
        AliasCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn report(formatter: &Formatter, alias: &str, message: String) {
    if formatter.is_json() {
        formatter.json(&AliasOperationOutput {
            success: true,
            alias: alias.to_string(),
            message,
        });
    } else {
        formatter.success(&message);
    }
}

fn execute_set(args: SetArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let alias = Alias::new(&args.name, &args.url);
    if let Err(e) = alias.validate() {
        return fail(formatter, "Invalid alias", &e);
    }

    match manager.set(alias) {
        Ok(()) => {
            report(
                formatter,
                &args.name,
                format!("Alias '{}' set to {}", args.name, args.url),
            );
            ExitCode::Success
        }
        Err(e) => fail(formatter, "Failed to save alias", &e),
    }
}

fn execute_list(manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let aliases = match manager.list() {
        Ok(aliases) => aliases,
        Err(e) => return fail(formatter, "Failed to list aliases", &e),
    };

    if formatter.is_json() {
        formatter.json(&AliasListOutput { aliases });
    } else if aliases.is_empty() {
        formatter.println("No aliases configured.");
    } else {
        for alias in &aliases {
            formatter.println(&format!("{:<12} {}", alias.name, alias.url));
        }
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            report(
                formatter,
                &args.name,
                format!("Alias '{}' removed", args.name),
            );
            ExitCode::Success
        }
        Err(e) => fail(formatter, "Failed to remove alias", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::ConfigManager;
    use tempfile::TempDir;

    fn temp_manager() -> (AliasManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = ConfigManager::with_path(dir.path().join("config.toml"));
        (AliasManager::with_config_manager(config), dir)
    }

    fn quiet() -> Formatter {
        Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_set_and_remove() {
        let (manager, _dir) = temp_manager();
        let formatter = quiet();

        let args = SetArgs {
            name: "logs".into(),
            url: "s3://logs-bucket?region=eu-west-1".into(),
        };
        assert_eq!(execute_set(args, &manager, &formatter), ExitCode::Success);
        assert_eq!(
            manager.get("logs").unwrap().url,
            "s3://logs-bucket?region=eu-west-1"
        );

        let args = RemoveArgs {
            name: "logs".into(),
        };
        assert_eq!(
            execute_remove(args, &manager, &formatter),
            ExitCode::Success
        );
        assert!(!manager.exists("logs").unwrap());
    }

    #[test]
    fn test_set_rejects_url_without_bucket() {
        let (manager, _dir) = temp_manager();
        let args = SetArgs {
            name: "bad".into(),
            url: "not a url".into(),
        };
        assert_eq!(
            execute_set(args, &manager, &quiet()),
            ExitCode::UsageError
        );
    }

    #[test]
    fn test_remove_missing_alias() {
        let (manager, _dir) = temp_manager();
        let args = RemoveArgs {
            name: "nope".into(),
        };
        assert_eq!(
            execute_remove(args, &manager, &quiet()),
            ExitCode::NotFound
        );
    }
}
