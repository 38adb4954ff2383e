//! Convenience operations built on the Bucket contract

use tokio::io::AsyncReadExt;

use crate::error::{ErrorCode, Result};
use crate::traits::{Bucket, ReaderOptions, WriterOptions};

/// Read a whole object into memory
pub async fn read_all(bucket: &dyn Bucket, key: &str) -> Result<Vec<u8>> {
    let mut reader = bucket
        .new_range_reader(key, 0, None, &ReaderOptions::default())
        .await?;
    let mut data = Vec::with_capacity(reader.attributes().size as usize);
    reader.read_to_end(&mut data).await?;
    reader.close()?;
    Ok(data)
}

/// Write `data` as the complete content of `key`
pub async fn write_all(
    bucket: &dyn Bucket,
    key: &str,
    data: &[u8],
    opts: WriterOptions,
) -> Result<()> {
    let mut writer = bucket.new_writer(key, opts).await?;
    writer.write(data).await?;
    writer.close().await
}

/// Whether `key` exists
pub async fn exists(bucket: &dyn Bucket, key: &str) -> Result<bool> {
    match bucket.attributes(key).await {
        Ok(_) => Ok(true),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
