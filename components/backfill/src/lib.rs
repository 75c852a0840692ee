//! # Block backfill
//!
//! After state sync fast-forwards a node to a recent trusted height, the node
//! still needs a run of historical blocks below that height so that evidence
//! verification and historical queries keep working. This crate fetches those
//! blocks: concurrent workers download blocks out of order while a single
//! consumer receives them in strictly descending height order, walking back
//! from the trusted height until the target height is reached and block
//! timestamps have fallen behind the configured cutoff.
//!
//! [`BlockQueue`] is the coordination core; [`Config::run`] drives it with a
//! pool of fetch workers that request blocks from the network layer via
//! [`io::OutputMessage`]. Verifying and persisting the delivered blocks is up
//! to the consumer draining [`BlockQueue::verify_next`].
use std::sync::Arc;

use zksync_concurrency::ctx::{self, channel};

mod config;
mod fetcher;
pub mod io;
mod queue;
#[cfg(test)]
mod tests;

use crate::fetcher::Fetcher;
pub use crate::{
    config::Config,
    queue::{BlockQueue, BlockResponse},
};

impl Config {
    /// Runs the backfill fetch workers against `queue`, requesting blocks
    /// from the network layer over `send`. Returns once the queue is closed,
    /// either because the backfill terminated or through an explicit
    /// [`BlockQueue::close`]. Cancellation is reported as success.
    pub async fn run(
        self,
        ctx: &ctx::Ctx,
        queue: Arc<BlockQueue>,
        send: channel::UnboundedSender<io::OutputMessage>,
    ) -> anyhow::Result<()> {
        let fetcher = Fetcher::new(self, queue, send);
        match fetcher.run(ctx).await {
            Ok(()) | Err(ctx::Canceled) => Ok(()),
        }
    }
}
