//! stat command - Show object attributes

use std::collections::BTreeMap;

use clap::Args;
use serde::Serialize;
use sb_core::Attributes;

use super::{fail, resolve_object};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_time, human_size};

/// Show object attributes
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Object path (s3://bucket/key or alias/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    name: String,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    md5: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_language: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl StatOutput {
    fn new(name: &str, attrs: Attributes) -> Self {
        Self {
            name: name.to_string(),
            size_bytes: attrs.size,
            size_human: human_size(attrs.size),
            last_modified: attrs.mod_time.map(|t| t.to_string()),
            md5: attrs.md5.as_deref().map(hex::encode),
            content_type: attrs.content_type,
            cache_control: attrs.cache_control,
            content_disposition: attrs.content_disposition,
            content_encoding: attrs.content_encoding,
            content_language: attrs.content_language,
            metadata: attrs.metadata.into_iter().collect(),
        }
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Name      : {}", self.name),
            format!(
                "Date      : {}",
                format_time(self.last_modified.as_deref().and_then(|t| t.parse().ok()))
            ),
            format!("Size      : {} ({} bytes)", self.size_human, self.size_bytes),
        ];
        let optional = [
            ("MD5       ", &self.md5),
            ("Type      ", &self.content_type),
            ("Cache     ", &self.cache_control),
            ("Disposition", &self.content_disposition),
            ("Encoding  ", &self.content_encoding),
            ("Language  ", &self.content_language),
        ];
        for (label, value) in optional {
            if let Some(value) = value {
                lines.push(format!("{label}: {value}"));
            }
        }
        if !self.metadata.is_empty() {
            lines.push("Metadata  :".to_string());
            for (key, value) in &self.metadata {
                lines.push(format!("  {key}: {value}"));
            }
        }
        lines
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (target, bucket) = match resolve_object(&args.path, &formatter).await {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };

    let attrs = match bucket.attributes(target.key()).await {
        Ok(attrs) => attrs,
        Err(e) => return fail(&formatter, &format!("Failed to stat '{}'", args.path), &e),
    };

    let output = StatOutput::new(target.key(), attrs);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        for line in output.lines() {
            formatter.println(&line);
        }
    }
    ExitCode::Success
}
