//! Random generation of types for tests.

use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use zksync_concurrency::time;

use crate::{BlockNumber, LightBlock, PeerId};

impl Distribution<BlockNumber> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BlockNumber {
        BlockNumber(rng.gen())
    }
}

impl Distribution<PeerId> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PeerId {
        PeerId(rng.gen())
    }
}

impl Distribution<LightBlock> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> LightBlock {
        LightBlock {
            number: rng.gen(),
            time: time::UNIX_EPOCH + time::Duration::seconds(rng.gen_range(0..=i64::from(i32::MAX))),
        }
    }
}
