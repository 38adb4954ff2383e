//! Sequential iteration over paginated listings
//!
//! Pages are requested one at a time, each with the token returned by the
//! previous one; there is never more than one request in flight.

use std::collections::VecDeque;

use crate::error::Result;
use crate::traits::{Bucket, ListObject, ListOptions};

/// Iterator over all entries of a listing
pub struct ListIterator<'a> {
    bucket: &'a dyn Bucket,
    opts: ListOptions,
    buffered: VecDeque<ListObject>,
    exhausted: bool,
}

impl<'a> ListIterator<'a> {
    pub fn new(bucket: &'a dyn Bucket, opts: ListOptions) -> Self {
        Self {
            bucket,
            opts,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next entry, fetching the next page when the current one is drained
    pub async fn next(&mut self) -> Result<Option<ListObject>> {
        loop {
            if let Some(object) = self.buffered.pop_front() {
                return Ok(Some(object));
            }
            if self.exhausted {
                return Ok(None);
            }

            let page = self.bucket.list_page(&self.opts).await?;
            tracing::debug!(
                entries = page.objects.len(),
                last = page.is_last(),
                "fetched list page"
            );
            self.exhausted = page.is_last();
            self.opts.page_token = page.next_page_token;
            self.buffered.extend(page.objects);
        }
    }

    /// Drain the remaining entries into a vector
    pub async fn collect(mut self) -> Result<Vec<ListObject>> {
        let mut objects = Vec::new();
        while let Some(object) = self.next().await? {
            objects.push(object);
        }
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::Error;
    use crate::traits::{
        Attributes, ListPage, Raw, Reader, ReaderOptions, SignedUrlOptions, Writer,
        WriterOptions,
    };

    /// Serves fixed pages; the token is the index of the next page
    struct PagedBucket {
        pages: Vec<Vec<&'static str>>,
        seen_tokens: Mutex<Vec<Option<Vec<u8>>>>,
    }

    #[async_trait]
    impl Bucket for PagedBucket {
        async fn attributes(&self, _key: &str) -> Result<Attributes> {
            Err(Error::InvalidArgument("unused".into()))
        }

        async fn new_range_reader(
            &self,
            _key: &str,
            _offset: u64,
            _length: Option<u64>,
            _opts: &ReaderOptions,
        ) -> Result<Box<dyn Reader>> {
            Err(Error::InvalidArgument("unused".into()))
        }

        async fn new_writer(&self, _key: &str, _opts: WriterOptions) -> Result<Box<dyn Writer>> {
            Err(Error::InvalidArgument("unused".into()))
        }

        async fn list_page(&self, opts: &ListOptions) -> Result<ListPage> {
            self.seen_tokens
                .lock()
                .unwrap()
                .push(opts.page_token.clone());
            let index = match &opts.page_token {
                Some(token) => String::from_utf8(token.clone()).unwrap().parse().unwrap(),
                None => 0usize,
            };
            let objects = self
                .pages
                .get(index)
                .map(|keys| {
                    keys.iter()
                        .map(|k| ListObject {
                            key: k.to_string(),
                            ..Default::default()
                        })
                        .collect()
                })
                .unwrap_or_default();
            let next_page_token =
                (index + 1 < self.pages.len()).then(|| (index + 1).to_string().into_bytes());
            Ok(ListPage {
                objects,
                next_page_token,
            })
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Err(Error::InvalidArgument("unused".into()))
        }

        async fn signed_url(&self, _key: &str, _opts: &SignedUrlOptions) -> Result<String> {
            Err(Error::InvalidArgument("unused".into()))
        }

        fn raw_client(&self) -> Raw {
            Raw::new(())
        }
    }

    #[tokio::test]
    async fn test_iterates_all_pages_in_order() {
        let bucket = PagedBucket {
            pages: vec![vec!["a", "b"], vec!["c"], vec!["d", "e"]],
            seen_tokens: Mutex::new(Vec::new()),
        };

        let keys: Vec<String> = ListIterator::new(&bucket, ListOptions::default())
            .collect()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();

        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(
            *bucket.seen_tokens.lock().unwrap(),
            vec![None, Some(b"1".to_vec()), Some(b"2".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let bucket = PagedBucket {
            pages: vec![],
            seen_tokens: Mutex::new(Vec::new()),
        };

        let mut iter = ListIterator::new(&bucket, ListOptions::default());
        assert!(iter.next().await.unwrap().is_none());
        assert!(iter.next().await.unwrap().is_none());
        assert_eq!(bucket.seen_tokens.lock().unwrap().len(), 1);
    }
}
