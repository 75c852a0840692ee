//! Ledger block primitives.

use std::fmt;

use zksync_concurrency::time;

/// Sequential number of a block in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    /// Returns the next block number.
    pub fn next(self) -> Self {
        Self(self.0.checked_add(1).unwrap())
    }

    /// Returns the previous block number, or `None` for the genesis block.
    pub fn prev(self) -> Option<Self> {
        Some(Self(self.0.checked_sub(1)?))
    }
}

impl std::ops::Add<u64> for BlockNumber {
    type Output = BlockNumber;
    fn add(self, n: u64) -> Self {
        Self(self.0.checked_add(n).unwrap())
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, formatter)
    }
}

/// Header-level view of a block: enough to place it in the chain and judge
/// its age. Content validation happens outside this crate, so payloads and
/// commit certificates are not carried here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightBlock {
    /// Number of the block.
    pub number: BlockNumber,
    /// Time the block was committed at.
    pub time: time::Utc,
}
