//! put command - Upload a file or stdin to an object
//!
//! The source is streamed through a bucket writer chunk by chunk, so input of
//! unknown length (a pipe) is uploaded without buffering it in memory.
//! Ctrl+C cancels the upload; an interrupted multipart upload is aborted
//! before the command exits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use sb_core::config::Defaults;
use sb_core::{Error, Writer, WriterOptions};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use super::{fail, resolve_object};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar, human_size};

const CHUNK_SIZE: usize = 64 * 1024;

type Source = Box<dyn AsyncRead + Unpin + Send>;

/// Upload a file or stdin to an object
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Destination object (s3://bucket/key or alias/key)
    pub target: String,

    /// Local file to upload; reads stdin when omitted
    pub file: Option<PathBuf>,

    /// Content type (guessed from the file or key name when omitted)
    #[arg(long)]
    pub content_type: Option<String>,

    #[arg(long)]
    pub cache_control: Option<String>,

    #[arg(long)]
    pub content_disposition: Option<String>,

    #[arg(long)]
    pub content_encoding: Option<String>,

    #[arg(long)]
    pub content_language: Option<String>,

    /// User metadata entry, repeatable
    #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_metadata)]
    pub metadata: Vec<(String, String)>,

    /// Upload part size in bytes (defaults to the configured part size)
    #[arg(long)]
    pub part_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    target: String,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

fn parse_metadata(entry: &str) -> Result<(String, String), String> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{entry}'")),
    }
}

/// Content type from the flag, then the local file name, then the key
fn content_type(explicit: Option<String>, file: Option<&Path>, key: &str) -> Option<String> {
    explicit
        .or_else(|| file.and_then(|path| mime_guess::from_path(path).first()).map(|m| m.to_string()))
        .or_else(|| mime_guess::from_path(key).first().map(|m| m.to_string()))
}

fn writer_options(args: &PutArgs, key: &str, defaults: &Defaults) -> WriterOptions {
    WriterOptions {
        content_type: content_type(args.content_type.clone(), args.file.as_deref(), key),
        buffer_size: args.part_size.unwrap_or(defaults.part_size),
        cache_control: args.cache_control.clone(),
        content_disposition: args.content_disposition.clone(),
        content_encoding: args.content_encoding.clone(),
        content_language: args.content_language.clone(),
        metadata: args.metadata.iter().cloned().collect::<HashMap<_, _>>(),
        ..Default::default()
    }
}

/// Copy the whole source into the writer
async fn copy_to_writer<R>(
    source: &mut R,
    writer: &mut dyn Writer,
    progress: &ProgressBar,
) -> sb_core::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        writer.write(&buf[..n]).await?;
        total += n as u64;
        progress.inc(n as u64);
    }
}

/// Execute the put command
pub async fn execute(args: PutArgs, output_config: OutputConfig, defaults: &Defaults) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let (target, bucket) = match resolve_object(&args.target, &formatter).await {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };
    let key = target.key().to_string();

    let (mut source, progress): (Source, ProgressBar) = match &args.file {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => {
                let total = match file.metadata().await {
                    Ok(metadata) => metadata.len(),
                    Err(e) => return fail(&formatter, "Failed to read file metadata", &e.into()),
                };
                (Box::new(file) as Source, ProgressBar::new(&output_config, total))
            }
            Err(e) => {
                let err = Error::Io(e);
                formatter.error(&format!("Failed to open '{}': {err}", path.display()));
                return ExitCode::UsageError;
            }
        },
        None => (
            Box::new(tokio::io::stdin()) as Source,
            ProgressBar::bytes(&output_config, "Uploading"),
        ),
    };

    let cancel = CancellationToken::new();
    let mut opts = writer_options(&args, &key, defaults);
    let content_type = opts.content_type.clone();
    opts.cancel = Some(cancel.clone());

    let mut writer = match bucket.new_writer(&key, opts).await {
        Ok(writer) => writer,
        Err(e) => return fail(&formatter, "Failed to start upload", &e),
    };

    let copied = tokio::select! {
        result = copy_to_writer(source.as_mut(), writer.as_mut(), &progress) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    progress.finish_and_clear();

    let size = match copied {
        Some(Ok(size)) => size,
        Some(Err(e)) => {
            cancel.cancel();
            // Wait for the abort so no parts are left behind
            let _ = writer.close().await;
            return fail(&formatter, "Upload failed", &e);
        }
        None => {
            cancel.cancel();
            let _ = writer.close().await;
            formatter.error("Upload interrupted");
            return ExitCode::Interrupted;
        }
    };

    if let Err(e) = writer.close().await {
        return fail(&formatter, "Upload failed", &e);
    }

    if formatter.is_json() {
        formatter.json(&PutOutput {
            status: "success",
            target: args.target,
            size_bytes: size,
            size_human: human_size(size),
            content_type,
        });
    } else {
        formatter.success(&format!(
            "Uploaded {} to {}",
            human_size(size),
            args.target
        ));
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_parse_metadata() {
        assert_eq!(
            parse_metadata("owner=ops").unwrap(),
            ("owner".to_string(), "ops".to_string())
        );
        assert_eq!(
            parse_metadata("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_metadata("novalue").is_err());
        assert!(parse_metadata("=x").is_err());
    }

    #[test]
    fn test_content_type_precedence() {
        assert_eq!(
            content_type(Some("text/x-custom".into()), None, "a.json").as_deref(),
            Some("text/x-custom")
        );
        assert_eq!(
            content_type(None, Some(Path::new("report.html")), "upload.bin").as_deref(),
            Some("text/html")
        );
        assert_eq!(
            content_type(None, None, "data/a.json").as_deref(),
            Some("application/json")
        );
        assert!(content_type(None, None, "README").is_none());
    }

    #[test]
    fn test_writer_options_from_args() {
        let cli = Cli::try_parse_from([
            "sb",
            "put",
            "s3://b/report.txt",
            "--metadata",
            "owner=ops",
            "--cache-control",
            "no-cache",
        ])
        .unwrap();
        let Commands::Put(args) = cli.command else {
            panic!("expected put");
        };

        let defaults = Defaults {
            part_size: 8 * 1024 * 1024,
            ..Default::default()
        };
        let opts = writer_options(&args, "report.txt", &defaults);
        assert_eq!(opts.content_type.as_deref(), Some("text/plain"));
        assert_eq!(opts.cache_control.as_deref(), Some("no-cache"));
        assert_eq!(opts.buffer_size, 8 * 1024 * 1024);
        assert_eq!(opts.metadata.get("owner").map(String::as_str), Some("ops"));
    }

    #[tokio::test]
    async fn test_copy_to_writer_counts_bytes() {
        struct Collect(Vec<u8>);

        #[async_trait::async_trait]
        impl Writer for Collect {
            async fn write(&mut self, buf: &[u8]) -> sb_core::Result<usize> {
                self.0.extend_from_slice(buf);
                Ok(buf.len())
            }
            async fn close(self: Box<Self>) -> sb_core::Result<()> {
                Ok(())
            }
        }

        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        let mut source = data.as_slice();
        let mut writer = Collect(Vec::new());
        let progress = ProgressBar::new(
            &OutputConfig {
                no_progress: true,
                ..Default::default()
            },
            0,
        );

        let total = copy_to_writer(&mut source, &mut writer, &progress)
            .await
            .unwrap();
        assert_eq!(total, data.len() as u64);
        assert_eq!(writer.0, data);
    }
}
