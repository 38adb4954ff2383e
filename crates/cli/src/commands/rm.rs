//! rm command - Remove objects
//!
//! Removes one or more objects. With `--recursive` every key below a prefix
//! is listed and deleted one at a time.

use clap::Args;
use serde::Serialize;
use sb_core::{Bucket, ListIterator, ListOptions, TargetPath, parse_target};

use super::{fail, open_bucket};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object path(s) to remove (s3://bucket/key or alias/key)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove all objects below the given prefix
    #[arg(short, long)]
    pub recursive: bool,

    /// Only show what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Default, Serialize)]
struct RmOutput {
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
    dry_run: bool,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let mut output = RmOutput {
        dry_run: args.dry_run,
        ..Default::default()
    };
    let mut exit = ExitCode::Success;

    for path in &args.paths {
        let target = match parse_target(path) {
            Ok(target) => target,
            Err(e) => {
                output.failed.push(path.clone());
                exit = fail(&formatter, "Invalid target", &e);
                continue;
            }
        };
        if target.key().is_empty() && !args.recursive {
            formatter.error(&format!(
                "'{path}' names a bucket, not an object; use --recursive to empty it"
            ));
            output.failed.push(path.clone());
            exit = ExitCode::UsageError;
            continue;
        }

        let bucket = match open_bucket(&target).await {
            Ok(bucket) => bucket,
            Err(e) => {
                output.failed.push(path.clone());
                exit = fail(&formatter, "Failed to open bucket", &e);
                continue;
            }
        };

        let code = if args.recursive {
            remove_prefix(bucket.as_ref(), &target, &args, &formatter, &mut output).await
        } else {
            remove_one(bucket.as_ref(), target.key(), &args, &formatter, &mut output).await
        };
        if code != ExitCode::Success {
            exit = code;
        }
    }

    if formatter.is_json() {
        formatter.json(&output);
    }
    exit
}

async fn remove_one(
    bucket: &dyn Bucket,
    key: &str,
    args: &RmArgs,
    formatter: &Formatter,
    output: &mut RmOutput,
) -> ExitCode {
    if args.dry_run {
        formatter.println(&format!("Would remove: {key}"));
        output.deleted.push(key.to_string());
        return ExitCode::Success;
    }

    match bucket.delete(key).await {
        Ok(()) => {
            formatter.success(&format!("Removed: {key}"));
            output.deleted.push(key.to_string());
            ExitCode::Success
        }
        Err(e) => {
            output.failed.push(key.to_string());
            fail(formatter, &format!("Failed to remove '{key}'"), &e)
        }
    }
}

async fn remove_prefix(
    bucket: &dyn Bucket,
    target: &TargetPath,
    args: &RmArgs,
    formatter: &Formatter,
    output: &mut RmOutput,
) -> ExitCode {
    let opts = ListOptions {
        prefix: target.key().to_string(),
        ..Default::default()
    };
    let mut entries = ListIterator::new(bucket, opts);
    let mut exit = ExitCode::Success;

    loop {
        let object = match entries.next().await {
            Ok(Some(object)) => object,
            Ok(None) => break,
            Err(e) => return fail(formatter, &format!("Failed to list '{target}'"), &e),
        };
        let code = remove_one(bucket, &object.key, args, formatter, output).await;
        if code != ExitCode::Success {
            exit = code;
        }
    }
    exit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rm_output_json() {
        let output = RmOutput {
            deleted: vec!["a".into()],
            failed: vec![],
            dry_run: false,
        };
        assert_eq!(
            serde_json::to_string(&output).unwrap(),
            r#"{"deleted":["a"],"dry_run":false}"#
        );
    }

    #[tokio::test]
    async fn test_rm_bucket_without_recursive_is_usage_error() {
        let args = RmArgs {
            paths: vec!["s3://bucket".into()],
            recursive: false,
            dry_run: false,
        };
        let config = OutputConfig {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(execute(args, config).await, ExitCode::UsageError);
    }
}
