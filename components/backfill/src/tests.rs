//! Shared test helpers and end-to-end tests of the backfill component.

use std::sync::Arc;

use anyhow::Context as _;
use lightsync_types::{BlockNumber, LightBlock};
use rand::Rng;
use test_casing::{test_casing, Product};
use zksync_concurrency::{
    ctx::{self, channel},
    scope,
    testonly::abort_on_panic,
    time,
};

use crate::{io, BlockQueue, BlockResponse, Config};

const TEST_TIMEOUT: time::Duration = time::Duration::seconds(30);

/// Cutoff timestamp all test blocks are generated relative to.
pub(crate) fn stop_time() -> time::Utc {
    time::UNIX_EPOCH + time::Duration::hours(10)
}

/// Timestamp satisfying the time bound of the backfill.
pub(crate) fn end_time() -> time::Utc {
    stop_time() - time::Duration::seconds(1)
}

pub(crate) fn block_response(
    rng: &mut impl Rng,
    number: BlockNumber,
    time: time::Utc,
) -> BlockResponse {
    BlockResponse {
        block: LightBlock { number, time },
        peer: rng.gen(),
    }
}

const FAILURE_RATES: [f64; 3] = [0.0, 0.1, 0.25];

#[test_casing(6, Product(([1, 4], FAILURE_RATES)))]
#[tokio::test]
async fn backfills_down_to_stop_height(fetchers: usize, failure_rate: f64) {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock).with_timeout(TEST_TIMEOUT);
    let config = Config::new(BlockNumber(100), BlockNumber(50), stop_time())
        .unwrap()
        .with_capacity(8)
        .unwrap()
        .with_fetchers(fetchers)
        .unwrap();
    let queue = Arc::new(BlockQueue::new(&config));
    let (message_sender, mut message_receiver) = channel::unbounded();

    scope::run!(ctx, |ctx, s| async {
        s.spawn_bg(config.run(ctx, queue.clone(), message_sender));
        // Emulates the network layer, failing a fraction of the requests.
        s.spawn_bg(async {
            let rng = &mut ctx.rng();
            loop {
                let Ok(message) = message_receiver.recv(ctx).await else {
                    return Ok(());
                };
                let io::OutputMessage::Network(message) = message;
                if rng.gen_bool(failure_rate) {
                    message
                        .response
                        .send(Err(io::GetBlockError::NotAvailable))
                        .ok();
                } else {
                    message
                        .response
                        .send(Ok(block_response(rng, message.number, end_time())))
                        .ok();
                }
            }
        });

        // The consumer rejects a fraction of the delivered blocks.
        let rng = &mut ctx.rng();
        let mut expected = BlockNumber(100);
        while let Some(resp) = queue.verify_next(ctx).await? {
            assert_eq!(resp.block.number, expected);
            if rng.gen_bool(failure_rate) {
                queue.retry(resp.block.number);
            } else {
                queue.success(resp.block.number);
                expected = resp.block.number.prev().unwrap();
            }
        }
        assert_eq!(expected, BlockNumber(49));
        assert!(queue.is_closed());
        Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn explicit_shutdown_stops_the_component() {
    abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock).with_timeout(TEST_TIMEOUT);
    let config = Config::new(BlockNumber(100), BlockNumber(50), stop_time()).unwrap();
    let queue = Arc::new(BlockQueue::new(&config));
    let (message_sender, mut message_receiver) = channel::unbounded();

    scope::run!(ctx, |ctx, s| async {
        // Spawned as a regular task: the scope only finishes once the workers
        // have observed the shutdown and returned.
        s.spawn(config.run(ctx, queue.clone(), message_sender));
        s.spawn_bg(async {
            let rng = &mut ctx.rng();
            loop {
                let Ok(message) = message_receiver.recv(ctx).await else {
                    return Ok(());
                };
                let io::OutputMessage::Network(message) = message;
                message
                    .response
                    .send(Ok(block_response(rng, message.number, end_time())))
                    .ok();
            }
        });

        let resp = queue
            .verify_next(ctx)
            .await?
            .context("queue closed early")?;
        assert_eq!(resp.block.number, BlockNumber(100));
        queue.close();
        Ok(())
    })
    .await
    .unwrap();
    assert!(queue.is_closed());
    assert_eq!(queue.num_pending(), 0);
}
