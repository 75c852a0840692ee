//! Configuration for the backfill component.

use lightsync_types::BlockNumber;
use zksync_concurrency::time;

/// Configuration of a backfill session.
#[derive(Debug)]
pub struct Config {
    /// Trusted height the backfill walks backward from, inclusive.
    pub(crate) start_height: BlockNumber,
    /// Nominal height the backfill stops at, inclusive. Blocks below it are
    /// still fetched while the block at the effective stop height is newer
    /// than `stop_time`.
    pub(crate) stop_height: BlockNumber,
    /// Cutoff timestamp: the backfill runs until a verified block precedes it.
    pub(crate) stop_time: time::Utc,
    /// Maximum number of blocks dispatched to fetchers and not verified yet.
    /// Bounds the memory held in fetched-but-unverified blocks when the
    /// consumer is slow.
    pub(crate) capacity: usize,
    /// Number of concurrent fetch workers.
    pub(crate) fetchers: usize,
}

impl Config {
    /// Creates a configuration with default limits.
    pub fn new(
        start_height: BlockNumber,
        stop_height: BlockNumber,
        stop_time: time::Utc,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            stop_height <= start_height,
            "stop height #{stop_height} is above start height #{start_height}"
        );
        Ok(Self {
            start_height,
            stop_height,
            stop_time,
            capacity: 20,
            fetchers: 5,
        })
    }

    /// Sets the maximum number of blocks dispatched and not verified yet.
    pub fn with_capacity(mut self, capacity: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(capacity > 0, "capacity must be positive");
        self.capacity = capacity;
        Ok(self)
    }

    /// Sets the number of concurrent fetch workers.
    pub fn with_fetchers(mut self, fetchers: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(fetchers > 0, "number of fetchers must be positive");
        self.fetchers = fetchers;
        Ok(self)
    }
}
