//! Events emitted by the fetch workers. Useful for testing.

use lightsync_types::BlockNumber;

/// Events emitted by the [`super::Fetcher`]. Only used in tests so far.
#[derive(Debug)]
pub(super) enum FetcherEvent {
    /// A worker downloaded the block at the given height.
    GotBlock(BlockNumber),
    /// A worker failed to download the block at the given height and
    /// scheduled it for refetch.
    FetchFailed(BlockNumber),
}
