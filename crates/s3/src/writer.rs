//! Streaming writer
//!
//! Bridges push-style writes onto the pull-style upload manager. Bytes flow
//! through a bounded channel into an upload task; a write waits while the
//! channel is full, so at most `PIPE_DEPTH` chunks plus one part are held in
//! memory. The task publishes its outcome once through a watch channel.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sb_core::Writer;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::api::S3Api;
use crate::error::S3Error;
use crate::upload::{UploadConfig, UploadInput, upload};

/// Chunks buffered between the writer and the upload task
const PIPE_DEPTH: usize = 4;

type Outcome = Option<Result<(), S3Error>>;

/// Writer for one S3 object
///
/// The upload task is spawned by the first non-empty write, or by `close`
/// when nothing was written. Dropping the writer without closing it cancels
/// the upload.
pub struct S3Writer {
    api: Arc<dyn S3Api>,
    /// Taken when the upload task starts
    pending: Option<(UploadInput, watch::Sender<Outcome>)>,
    config: UploadConfig,
    cancel: CancellationToken,
    sender: Option<mpsc::Sender<Bytes>>,
    done: watch::Receiver<Outcome>,
}

impl S3Writer {
    pub(crate) fn new(
        api: Arc<dyn S3Api>,
        input: UploadInput,
        config: UploadConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (done_tx, done) = watch::channel(None);
        Self {
            api,
            pending: Some((input, done_tx)),
            config,
            cancel,
            sender: None,
            done,
        }
    }

    fn start(&mut self) {
        let Some((input, done_tx)) = self.pending.take() else {
            return;
        };
        let (tx, mut rx) = mpsc::channel::<Bytes>(PIPE_DEPTH);
        let body = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));

        let api = Arc::clone(&self.api);
        let config = self.config.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let result = upload(api.as_ref(), input, config, body, cancel).await;
            done_tx.send_replace(Some(result));
        });

        self.sender = Some(tx);
    }

    /// Outcome of the upload, if it has finished
    fn outcome(&self) -> Outcome {
        self.done.borrow().clone()
    }

    /// Wait for the upload task to publish its outcome
    async fn wait(&mut self) -> Result<(), S3Error> {
        let outcome = match self.done.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            // the task went away without publishing
            Err(_) => None,
        };
        outcome.unwrap_or(Err(S3Error::Canceled))
    }
}

#[async_trait]
impl Writer for S3Writer {
    async fn write(&mut self, buf: &[u8]) -> sb_core::Result<usize> {
        if let Some(Err(e)) = self.outcome() {
            return Err(e.into());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.sender.is_none() {
            self.start();
        }

        let chunk = Bytes::copy_from_slice(buf);
        let sent = match &self.sender {
            Some(sender) => sender.send(chunk).await.is_ok(),
            None => false,
        };
        if !sent {
            // the upload stopped reading; report why
            self.wait().await?;
            return Err(S3Error::InvalidRequest("upload already finished".to_string()).into());
        }
        Ok(buf.len())
    }

    async fn close(mut self: Box<Self>) -> sb_core::Result<()> {
        if self.sender.is_none() {
            self.start();
        }
        // end of body
        self.sender = None;
        self.wait().await?;
        Ok(())
    }
}

impl Drop for S3Writer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
