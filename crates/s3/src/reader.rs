//! Range reads over GetObject

use std::pin::Pin;
use std::task::{Context, Poll};

use aws_sdk_s3::operation::get_object::{GetObjectInput, GetObjectOutput};
use aws_sdk_s3::primitives::ByteStream;
use sb_core::{Raw, Reader, ReaderAttributes};
use tokio::io::{AsyncRead, ReadBuf};

use crate::api::S3Api;
use crate::attrs::{content_range_size, to_timestamp};
use crate::error::S3Error;

/// `Range` header for a read of `length` bytes at `offset`
///
/// S3 cannot serve a zero-length range, so one byte is requested and
/// discarded by [`open`]. That byte does not exist in a zero-byte object, so
/// a zero-length read of one is rejected by the service with `InvalidRange`.
pub(crate) fn range_header(offset: u64, length: Option<u64>) -> Option<String> {
    match length {
        None if offset == 0 => None,
        None => Some(format!("bytes={offset}-")),
        Some(0) => Some(format!("bytes={offset}-{offset}")),
        Some(n) => Some(format!(
            "bytes={offset}-{}",
            offset.saturating_add(n - 1)
        )),
    }
}

pub(crate) fn build_request(
    bucket: &str,
    key: &str,
    offset: u64,
    length: Option<u64>,
) -> Result<GetObjectInput, S3Error> {
    Ok(GetObjectInput::builder()
        .bucket(bucket)
        .key(key)
        .set_range(range_header(offset, length))
        .build()?)
}

/// Issue the GET and wrap the response body
pub(crate) async fn open(
    api: &dyn S3Api,
    input: GetObjectInput,
    length: Option<u64>,
) -> Result<S3Reader, S3Error> {
    let mut output = api.get_object(input).await?;
    let body = std::mem::replace(&mut output.body, ByteStream::from_static(b""));

    let attributes = ReaderAttributes {
        content_type: output.content_type.clone(),
        mod_time: output.last_modified.as_ref().and_then(to_timestamp),
        size: content_range_size(output.content_range.as_deref(), output.content_length),
    };

    let body: Pin<Box<dyn AsyncRead + Send>> = if length == Some(0) {
        drop(body);
        Box::pin(tokio::io::empty())
    } else {
        Box::pin(body.into_async_read())
    };

    Ok(S3Reader {
        body,
        attributes,
        raw: Raw::new(output),
    })
}

/// Reader over one GetObject response
///
/// The raw value is the [`GetObjectOutput`] with its body detached.
pub struct S3Reader {
    body: Pin<Box<dyn AsyncRead + Send>>,
    attributes: ReaderAttributes,
    raw: Raw,
}

impl AsyncRead for S3Reader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.body.as_mut().poll_read(cx, buf)
    }
}

impl Reader for S3Reader {
    fn attributes(&self) -> &ReaderAttributes {
        &self.attributes
    }

    fn raw(&self) -> Option<&Raw> {
        Some(&self.raw)
    }

    fn close(self: Box<Self>) -> sb_core::Result<()> {
        Ok(())
    }
}

impl S3Reader {
    /// The response this reader was created from
    pub fn output(&self) -> Option<&GetObjectOutput> {
        self.raw.downcast_ref()
    }
}
