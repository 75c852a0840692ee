//! Pool of workers downloading the heights dispatched by the block queue.

use std::sync::Arc;

use anyhow::Context as _;
use lightsync_types::BlockNumber;
use zksync_concurrency::{
    ctx::{self, channel},
    oneshot, scope,
};

use self::events::FetcherEvent;
use crate::{
    io,
    queue::{BlockQueue, BlockResponse},
    Config,
};

mod events;

/// Pool of concurrent block fetchers feeding one [`BlockQueue`].
#[derive(Debug)]
pub(crate) struct Fetcher {
    config: Config,
    queue: Arc<BlockQueue>,
    message_sender: channel::UnboundedSender<io::OutputMessage>,
    events_sender: Option<channel::UnboundedSender<FetcherEvent>>,
}

impl Fetcher {
    pub(crate) fn new(
        config: Config,
        queue: Arc<BlockQueue>,
        message_sender: channel::UnboundedSender<io::OutputMessage>,
    ) -> Self {
        Self {
            config,
            queue,
            message_sender,
            events_sender: None,
        }
    }

    /// Runs the fetch workers until the queue closes or `ctx` is canceled.
    pub(crate) async fn run(&self, ctx: &ctx::Ctx) -> ctx::OrCanceled<()> {
        scope::run!(ctx, |ctx, s| async {
            for _ in 0..self.config.fetchers {
                s.spawn(async { self.run_worker(ctx).await });
            }
            Ok(())
        })
        .await
    }

    /// Fetch loop of a single worker: pull a height, download the block,
    /// hand the result back to the queue. Exits once the queue closes.
    async fn run_worker(&self, ctx: &ctx::Ctx) -> ctx::OrCanceled<()> {
        while let Some(number) = self.queue.next_height(ctx).await? {
            match self.fetch_block(ctx, number).await {
                Ok(resp) => {
                    if let Some(send) = &self.events_sender {
                        send.send(FetcherEvent::GotBlock(number));
                    }
                    self.queue.add(resp);
                }
                Err(ctx::Error::Canceled(_)) => return Err(ctx::Canceled),
                Err(ctx::Error::Internal(err)) => {
                    tracing::info!(%err, %number, "get_block() failed");
                    if let Some(send) = &self.events_sender {
                        send.send(FetcherEvent::FetchFailed(number));
                    }
                    self.queue.retry(number);
                }
            }
        }
        Ok(())
    }

    /// Requests the block `number` from the network layer.
    async fn fetch_block(
        &self,
        ctx: &ctx::Ctx,
        number: BlockNumber,
    ) -> ctx::Result<BlockResponse> {
        let (response, response_recv) = oneshot::channel();
        self.message_sender
            .send(io::GetBlockMessage { number, response }.into());
        let resp = response_recv
            .recv_or_disconnected(ctx)
            .await?
            .context("no response")?
            .context("get_block()")?;
        if resp.block.number != number {
            return Err(anyhow::anyhow!(
                "block does not have the requested number (requested: {number}, got: {})",
                resp.block.number
            )
            .into());
        }
        Ok(resp)
    }
}
