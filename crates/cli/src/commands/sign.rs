//! sign command - Generate a presigned download URL

use std::time::Duration;

use clap::Args;
use serde::Serialize;
use sb_core::{Error, SignedUrlOptions};

use super::{fail, resolve_object};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Generate a presigned URL for reading an object
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Object path (s3://bucket/key or alias/key)
    pub path: String,

    /// How long the URL stays valid (e.g. "1h", "30m", "168h")
    #[arg(long, default_value = "1h")]
    pub expires: jiff::SignedDuration,
}

#[derive(Debug, Serialize)]
struct SignOutput {
    url: String,
    expires_secs: u64,
}

fn expiry(expires: jiff::SignedDuration) -> sb_core::Result<Duration> {
    Duration::try_from(expires)
        .map_err(|_| Error::InvalidArgument(format!("expiry must not be negative: {expires}")))
}

/// Execute the sign command
pub async fn execute(args: SignArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let expiry = match expiry(args.expires) {
        Ok(expiry) => expiry,
        Err(e) => return fail(&formatter, "Invalid expiry", &e),
    };

    let (target, bucket) = match resolve_object(&args.path, &formatter).await {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };

    let url = match bucket
        .signed_url(target.key(), &SignedUrlOptions { expiry })
        .await
    {
        Ok(url) => url,
        Err(e) => return fail(&formatter, "Failed to sign URL", &e),
    };

    if formatter.is_json() {
        formatter.json(&SignOutput {
            url,
            expires_secs: expiry.as_secs(),
        });
    } else {
        // Printed even in quiet mode; the URL is the command's result
        println!("{url}");
    }
    ExitCode::Success
}
