//! Normalization of S3 response fields into portable attributes
//!
//! Everything here degrades instead of failing: an ETag that is not a
//! plain MD5 yields no hash, an unparsable `Content-Range` falls back to
//! `Content-Length`.

use std::collections::HashMap;

use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::primitives::DateTime;
use jiff::Timestamp;
use sb_core::{Attributes, Raw};

/// Extract the MD5 from an ETag
///
/// Single-part uploads get a quoted hex MD5 as their ETag. Multipart ETags
/// carry a `-<parts>` suffix and are never valid hex, so they yield `None`.
pub fn etag_to_md5(etag: Option<&str>) -> Option<Vec<u8>> {
    let unquoted = etag?.strip_prefix('"')?.strip_suffix('"')?;
    if unquoted.is_empty() {
        return None;
    }
    hex::decode(unquoted).ok()
}

/// True object size of a GET response
///
/// For ranged reads `Content-Length` is the length of the returned slice;
/// the total after the slash of `Content-Range` (`bytes 10-14/27`) is the
/// object size.
pub fn content_range_size(content_range: Option<&str>, content_length: Option<i64>) -> u64 {
    content_range
        .and_then(|range| {
            let (_, total) = range.split_once('/')?;
            total.trim().parse::<u64>().ok()
        })
        .unwrap_or_else(|| non_negative(content_length))
}

/// Convert an SDK timestamp
pub fn to_timestamp(dt: &DateTime) -> Option<Timestamp> {
    Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok()
}

/// User metadata as returned by the SDK
///
/// The SDK strips the `x-amz-meta-` prefix and lower-cases the keys.
pub fn normalize_metadata(metadata: Option<HashMap<String, String>>) -> HashMap<String, String> {
    metadata.unwrap_or_default()
}

pub(crate) fn non_negative(value: Option<i64>) -> u64 {
    value.map_or(0, |v| v.max(0) as u64)
}

/// Build attributes from a HEAD response, keeping the response as raw
pub fn attributes_from_head(head: HeadObjectOutput) -> Attributes {
    Attributes {
        cache_control: head.cache_control.clone(),
        content_disposition: head.content_disposition.clone(),
        content_encoding: head.content_encoding.clone(),
        content_language: head.content_language.clone(),
        content_type: head.content_type.clone(),
        metadata: normalize_metadata(head.metadata.clone()),
        mod_time: head.last_modified.as_ref().and_then(to_timestamp),
        size: non_negative(head.content_length),
        md5: etag_to_md5(head.e_tag.as_deref()),
        raw: Some(Raw::new(head)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_plain_md5() {
        let md5 = etag_to_md5(Some("\"d41d8cd98f00b204e9800998ecf8427e\"")).unwrap();
        assert_eq!(md5.len(), 16);
        assert_eq!(hex::encode(&md5), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_etag_without_md5() {
        assert_eq!(etag_to_md5(None), None);
        assert_eq!(etag_to_md5(Some("")), None);
        assert_eq!(etag_to_md5(Some("\"")), None);
        assert_eq!(etag_to_md5(Some("\"\"")), None);
        // unquoted
        assert_eq!(etag_to_md5(Some("d41d8cd98f00b204e9800998ecf8427e")), None);
        // multipart
        assert_eq!(etag_to_md5(Some("\"abc-1\"")), None);
        assert_eq!(
            etag_to_md5(Some("\"9b2cf535f27731c974343645a3985328-3\"")),
            None
        );
    }

    #[test]
    fn test_content_range_size() {
        assert_eq!(content_range_size(Some("bytes 10-14/27"), Some(5)), 27);
        assert_eq!(content_range_size(None, Some(27)), 27);
        assert_eq!(content_range_size(Some("bytes 0-0/*"), Some(1)), 1);
        assert_eq!(content_range_size(Some("garbage"), Some(4)), 4);
        assert_eq!(content_range_size(None, None), 0);
        assert_eq!(content_range_size(None, Some(-1)), 0);
    }

    #[test]
    fn test_to_timestamp() {
        let dt = DateTime::from_secs_and_nanos(1_700_000_000, 500);
        let ts = to_timestamp(&dt).unwrap();
        assert_eq!(ts.as_second(), 1_700_000_000);
        assert_eq!(ts.subsec_nanosecond(), 500);
    }

    #[test]
    fn test_attributes_from_head() {
        let head = HeadObjectOutput::builder()
            .content_length(27)
            .content_type("text/plain")
            .cache_control("no-cache")
            .e_tag("\"d41d8cd98f00b204e9800998ecf8427e\"")
            .metadata("owner", "ops")
            .last_modified(DateTime::from_secs(1_700_000_000))
            .build();

        let attrs = attributes_from_head(head);
        assert_eq!(attrs.size, 27);
        assert_eq!(attrs.content_type.as_deref(), Some("text/plain"));
        assert_eq!(attrs.cache_control.as_deref(), Some("no-cache"));
        assert!(attrs.content_encoding.is_none());
        assert_eq!(attrs.metadata.get("owner").map(String::as_str), Some("ops"));
        assert_eq!(attrs.md5.as_ref().map(Vec::len), Some(16));
        assert_eq!(attrs.mod_time.unwrap().as_second(), 1_700_000_000);

        let raw = attrs.raw.unwrap();
        let head = raw.downcast_ref::<HeadObjectOutput>().unwrap();
        assert_eq!(head.content_length, Some(27));
    }

    #[test]
    fn test_attributes_from_empty_head() {
        let attrs = attributes_from_head(HeadObjectOutput::builder().build());
        assert_eq!(attrs.size, 0);
        assert!(attrs.metadata.is_empty());
        assert!(attrs.md5.is_none());
        assert!(attrs.mod_time.is_none());
    }
}
