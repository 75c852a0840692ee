//! Messages exchanged between the backfill component and the network layer.

use lightsync_types::BlockNumber;
use zksync_concurrency::oneshot;

use crate::queue::BlockResponse;

/// Messages produced by the backfill component. The component consumes no
/// messages: its inputs are the [`crate::BlockQueue`] calls made by the
/// fetch workers and the consumer.
#[derive(Debug)]
pub enum OutputMessage {
    /// Message to the network layer.
    Network(GetBlockMessage),
}

impl From<GetBlockMessage> for OutputMessage {
    fn from(message: GetBlockMessage) -> Self {
        Self::Network(message)
    }
}

/// Request to download one block from any peer that has it. Picking the peer
/// is up to the network layer; the serving peer is reported back in the
/// response.
#[derive(Debug)]
pub struct GetBlockMessage {
    /// Number of the requested block.
    pub number: BlockNumber,
    /// Channel to send the outcome to. Dropping it without responding is
    /// treated as a failed fetch.
    pub response: oneshot::Sender<Result<BlockResponse, GetBlockError>>,
}

/// Failure of a block request, as reported by the network layer.
#[derive(Debug, thiserror::Error)]
pub enum GetBlockError {
    /// No connected peer has the requested block.
    #[error("no connected peer has the requested block")]
    NotAvailable,
    /// Transport-level failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
