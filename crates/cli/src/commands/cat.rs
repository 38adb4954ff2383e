//! cat command - Display object contents
//!
//! Streams an object, or a byte range of it, to stdout without buffering the
//! whole body in memory.

use clap::Args;
use sb_core::ReaderOptions;
use tokio::io::AsyncWriteExt;

use super::{fail, resolve_object};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display object contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Object path (s3://bucket/key or alias/key)
    pub path: String,

    /// First byte to read
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Number of bytes to read (default: to the end of the object)
    #[arg(long)]
    pub length: Option<u64>,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (target, bucket) = match resolve_object(&args.path, &formatter).await {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };

    let mut reader = match bucket
        .new_range_reader(
            target.key(),
            args.offset,
            args.length,
            &ReaderOptions::default(),
        )
        .await
    {
        Ok(reader) => reader,
        Err(e) => return fail(&formatter, &format!("Failed to read '{}'", args.path), &e),
    };

    tracing::debug!(
        key = target.key(),
        size = reader.attributes().size,
        "streaming object to stdout"
    );

    // Raw bytes go straight to stdout, never through the formatter
    let mut stdout = tokio::io::stdout();
    if let Err(e) = tokio::io::copy(&mut reader, &mut stdout).await {
        return fail(&formatter, "Failed to write to stdout", &e.into());
    }
    if let Err(e) = stdout.flush().await {
        return fail(&formatter, "Failed to write to stdout", &e.into());
    }

    match reader.close() {
        Ok(()) => ExitCode::Success,
        Err(e) => fail(&formatter, "Failed to close reader", &e),
    }
}
