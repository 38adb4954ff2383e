//! Paginated listing over ListObjectsV2
//!
//! S3 returns objects and common prefixes in two separate lists. They are
//! merged into one page, sorted by key when both are present, and the
//! continuation token is passed through as opaque bytes.

use aws_sdk_s3::operation::list_objects_v2::{ListObjectsV2Input, ListObjectsV2Output};
use sb_core::{Error, ListObject, ListOptions, ListPage, Raw};

use crate::api::S3Api;
use crate::attrs::{etag_to_md5, non_negative, to_timestamp};
use crate::error::S3Error;

/// Page size used when the caller asks for 0
pub const DEFAULT_PAGE_SIZE: usize = 1000;

pub(crate) fn build_request(
    bucket: &str,
    opts: &ListOptions,
) -> sb_core::Result<ListObjectsV2Input> {
    let page_size = if opts.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        opts.page_size
    };
    let continuation_token = opts
        .page_token
        .as_ref()
        .filter(|token| !token.is_empty())
        .map(|token| {
            String::from_utf8(token.clone())
                .map_err(|_| Error::InvalidArgument("page token is not valid UTF-8".into()))
        })
        .transpose()?;

    let input = ListObjectsV2Input::builder()
        .bucket(bucket)
        .max_keys(i32::try_from(page_size).unwrap_or(i32::MAX))
        .set_prefix((!opts.prefix.is_empty()).then(|| opts.prefix.clone()))
        .set_delimiter((!opts.delimiter.is_empty()).then(|| opts.delimiter.clone()))
        .set_continuation_token(continuation_token)
        .build()
        .map_err(S3Error::from)?;
    Ok(input)
}

pub(crate) async fn send(
    api: &dyn S3Api,
    input: ListObjectsV2Input,
) -> Result<ListPage, S3Error> {
    let output = api.list_objects_v2(input).await?;
    Ok(to_page(output))
}

/// Merge one ListObjectsV2 response into a page
pub(crate) fn to_page(output: ListObjectsV2Output) -> ListPage {
    let contents = output.contents.unwrap_or_default();
    let prefixes = output.common_prefixes.unwrap_or_default();
    let sort = !contents.is_empty() && !prefixes.is_empty();

    let mut objects = Vec::with_capacity(contents.len() + prefixes.len());
    for object in contents {
        objects.push(ListObject {
            key: object.key.clone().unwrap_or_default(),
            size: non_negative(object.size),
            mod_time: object.last_modified.as_ref().and_then(to_timestamp),
            md5: etag_to_md5(object.e_tag.as_deref()),
            is_dir: false,
            raw: Some(Raw::new(object)),
        });
    }
    for prefix in prefixes {
        let Some(key) = prefix.prefix.clone() else {
            continue;
        };
        objects.push(ListObject {
            raw: Some(Raw::new(prefix)),
            ..ListObject::dir(key)
        });
    }

    if sort {
        objects.sort_by(|a, b| a.key.cmp(&b.key));
    }

    let next_page_token = output
        .next_continuation_token
        .filter(|token| !token.is_empty())
        .map(String::into_bytes);

    ListPage {
        objects,
        next_page_token,
    }
}
