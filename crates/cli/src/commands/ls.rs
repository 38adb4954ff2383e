//! ls command - List objects
//!
//! Lists one page of entries under a prefix, or every page with `--all`.
//! With the default `/` delimiter, common prefixes show up as directories.

use clap::Args;
use serde::Serialize;
use sb_core::config::Defaults;
use sb_core::{Bucket, Error, ListIterator, ListObject, ListOptions};

use super::{fail, resolve};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_time, human_size};

/// List objects under a prefix
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Prefix to list (s3://bucket/prefix or alias/prefix)
    pub path: String,

    /// Delimiter grouping keys into directories; empty lists flat
    #[arg(long, default_value = "/")]
    pub delimiter: String,

    /// List all keys below the prefix without grouping
    #[arg(short, long, conflicts_with = "delimiter")]
    pub recursive: bool,

    /// Entries per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Continue from a token printed by an earlier listing
    #[arg(long, conflicts_with = "all")]
    pub page_token: Option<String>,

    /// Follow every page instead of stopping after the first
    #[arg(long)]
    pub all: bool,

    /// Show a summary line with totals
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<ObjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct ObjectInfo {
    key: String,
    is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    md5: Option<String>,
}

impl From<&ListObject> for ObjectInfo {
    fn from(object: &ListObject) -> Self {
        if object.is_dir {
            return Self {
                key: object.key.clone(),
                is_dir: true,
                size_bytes: None,
                size_human: None,
                last_modified: None,
                md5: None,
            };
        }
        Self {
            key: object.key.clone(),
            is_dir: false,
            size_bytes: Some(object.size),
            size_human: Some(human_size(object.size)),
            last_modified: object.mod_time.map(|t| t.to_string()),
            md5: object.md5.as_deref().map(hex::encode),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    total_objects: usize,
    total_dirs: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

impl Summary {
    fn of(objects: &[ListObject]) -> Self {
        let files = objects.iter().filter(|o| !o.is_dir);
        let total_size_bytes = files.clone().map(|o| o.size).sum();
        Self {
            total_objects: files.count(),
            total_dirs: objects.iter().filter(|o| o.is_dir).count(),
            total_size_bytes,
            total_size_human: human_size(total_size_bytes),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig, defaults: &Defaults) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let page_token = match args.page_token.as_deref().map(decode_token).transpose() {
        Ok(token) => token,
        Err(e) => return fail(&formatter, "Invalid page token", &e),
    };

    let (target, bucket) = match resolve(&args.path, &formatter).await {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };

    let opts = ListOptions {
        prefix: target.key().to_string(),
        delimiter: if args.recursive {
            String::new()
        } else {
            args.delimiter.clone()
        },
        page_size: args.page_size.unwrap_or(defaults.page_size),
        page_token,
        before_list: None,
    };

    let listed = if args.all {
        ListIterator::new(bucket.as_ref(), opts)
            .collect()
            .await
            .map(|objects| (objects, None))
    } else {
        list_one_page(bucket.as_ref(), &opts).await
    };

    let (objects, next_token) = match listed {
        Ok(listed) => listed,
        Err(e) => return fail(&formatter, "Failed to list objects", &e),
    };

    print_listing(&formatter, &objects, next_token, args.summarize);
    ExitCode::Success
}

async fn list_one_page(
    bucket: &dyn Bucket,
    opts: &ListOptions,
) -> sb_core::Result<(Vec<ListObject>, Option<String>)> {
    let page = bucket.list_page(opts).await?;
    Ok((page.objects, page.next_page_token.as_deref().map(hex::encode)))
}

/// Page tokens are opaque bytes; the CLI passes them around hex-encoded
fn decode_token(token: &str) -> sb_core::Result<Vec<u8>> {
    hex::decode(token).map_err(|e| Error::InvalidArgument(format!("'{token}': {e}")))
}

fn print_listing(
    formatter: &Formatter,
    objects: &[ListObject],
    next_page_token: Option<String>,
    summarize: bool,
) {
    if formatter.is_json() {
        formatter.json(&LsOutput {
            items: objects.iter().map(ObjectInfo::from).collect(),
            next_page_token,
            summary: summarize.then(|| Summary::of(objects)),
        });
        return;
    }

    for object in objects {
        if object.is_dir {
            formatter.println(&format!(
                "{} {:>10} {}",
                format_time(None),
                "PRE",
                formatter.dir_name(&object.key)
            ));
        } else {
            formatter.println(&format!(
                "{} {:>10} {}",
                format_time(object.mod_time),
                human_size(object.size),
                object.key
            ));
        }
    }

    if summarize {
        let summary = Summary::of(objects);
        formatter.println(&format!(
            "\nTotal: {} objects, {} directories, {}",
            summary.total_objects, summary.total_dirs, summary.total_size_human
        ));
    }

    if let Some(token) = next_page_token {
        formatter.println(&format!("\nMore entries available; continue with --page-token {token}"));
    }
}
