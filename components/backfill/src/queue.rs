//! Queue reconciling unordered concurrent block fetching with ordered,
//! gap-free consumption.

use std::collections::{BTreeMap, VecDeque};

use lightsync_types::{BlockNumber, LightBlock, PeerId};
use zksync_concurrency::{ctx, oneshot, sync, time};

use crate::Config;


/// Outcome of fetching one block, as reported by the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResponse {
    /// The fetched block.
    pub block: LightBlock,
    /// Peer which served the block.
    pub peer: PeerId,
}

/// Mutable state of the [`BlockQueue`]. All fields are guarded together:
/// every operation is a short, non-blocking transition of the whole state.
#[derive(Debug)]
struct Inner {
    start_height: BlockNumber,
    /// Effective lowest height to backfill. Starts at the configured stop
    /// height and decreases while verified blocks are still newer than
    /// `stop_time`.
    stop_height: BlockNumber,
    stop_time: time::Utc,
    capacity: usize,
    /// Highest height not handed to any fetcher yet; `None` once the genesis
    /// block has been handed out. Only decreases.
    next: Option<BlockNumber>,
    /// Heights whose fetch or verification failed, served before `next`,
    /// most recent first.
    retry: Vec<BlockNumber>,
    /// Fetched blocks awaiting verification, keyed by height.
    pending: BTreeMap<BlockNumber, BlockResponse>,
    /// Heights dispatched from `next` and not verified yet; never exceeds
    /// `capacity`.
    inflight: usize,
    /// The single height the consumer receives next.
    verify_cursor: BlockNumber,
    /// Blocked `next_height()` calls, in arrival order.
    waiters: VecDeque<oneshot::Sender<BlockNumber>>,
    closed: bool,
}

impl Inner {
    /// Takes the next height to hand to a fetcher, if any is available.
    /// Failed heights are re-dispatched before the frontier advances; fresh
    /// frontier heights additionally require a free capacity slot.
    fn take_available(&mut self) -> Option<BlockNumber> {
        if let Some(number) = self.retry.pop() {
            return Some(number);
        }
        if self.inflight >= self.capacity {
            return None;
        }
        let number = self.next.filter(|next| *next >= self.stop_height)?;
        self.next = number.prev();
        self.inflight += 1;
        Some(number)
    }

    /// Hands available heights to blocked `next_height()` calls, one waiter
    /// per height. A height refused by every live waiter goes back to the
    /// retry backlog, never on the floor.
    fn wake_waiters(&mut self) {
        while !self.waiters.is_empty() {
            let Some(mut number) = self.take_available() else {
                return;
            };
            loop {
                match self.waiters.pop_front() {
                    Some(waiter) => match waiter.send(number) {
                        Ok(()) => break,
                        // The call behind this waiter was canceled.
                        Err(refused) => number = refused,
                    },
                    None => {
                        self.retry.push(number);
                        return;
                    }
                }
            }
        }
    }

    /// Whether `number` has been handed to a fetcher and no result for it
    /// has been buffered, verified or scheduled for refetch yet.
    fn is_outstanding(&self, number: BlockNumber) -> bool {
        number <= self.start_height
            && number <= self.verify_cursor
            && self.next.map_or(true, |next| number > next)
            && !self.pending.contains_key(&number)
            && !self.retry.contains(&number)
    }

    /// Transitions to the terminal state: buffered work is discarded and
    /// blocked calls observe shutdown (dropping the waiter senders wakes
    /// them).
    fn close(&mut self) {
        self.closed = true;
        self.waiters.clear();
        self.pending.clear();
        self.retry.clear();
    }
}

/// Queue of block heights to backfill.
///
/// Fetch workers pull heights via [`Self::next_height`] and hand results back
/// via [`Self::add`] or [`Self::retry`]; a single consumer drains
/// [`Self::verify_next`] and reports [`Self::success`] or [`Self::retry`].
/// Blocks reach the consumer in strictly descending height order with no gaps
/// or repeats, regardless of the order fetches complete in, down to the first
/// height at which both the height bound and the time bound of the backfill
/// hold. At most `capacity` heights are dispatched and unverified at a time,
/// so a slow consumer stalls the workers instead of growing the buffer.
#[derive(Debug)]
pub struct BlockQueue {
    state: sync::watch::Sender<Inner>,
}

impl BlockQueue {
    /// Constructs an open queue spanning `config.start_height` down to
    /// `config.stop_height`, or further if needed to cross
    /// `config.stop_time`.
    pub fn new(config: &Config) -> Self {
        Self {
            state: sync::watch::channel(Inner {
                start_height: config.start_height,
                stop_height: config.stop_height,
                stop_time: config.stop_time,
                capacity: config.capacity,
                next: Some(config.start_height),
                retry: Vec::new(),
                pending: BTreeMap::new(),
                inflight: 0,
                verify_cursor: config.start_height,
                waiters: VecDeque::new(),
                closed: false,
            })
            .0,
        }
    }

    /// Next height for the caller to fetch. Returns `None` iff the queue is
    /// closed. Blocks while nothing can be dispatched: no failed height
    /// awaits a refetch, and the frontier is either exhausted or `capacity`
    /// heights are already in flight.
    pub async fn next_height(&self, ctx: &ctx::Ctx) -> ctx::OrCanceled<Option<BlockNumber>> {
        let (send, recv) = oneshot::channel();
        let mut ready = None;
        self.state.send_if_modified(|inner| {
            if inner.closed {
                ready = Some(None);
                return false;
            }
            if let Some(number) = inner.take_available() {
                ready = Some(Some(number));
                return true;
            }
            inner.waiters.push_back(send);
            false
        });
        if let Some(ready) = ready {
            return Ok(ready);
        }
        match recv.recv_or_disconnected(ctx).await? {
            Ok(number) => Ok(Some(number)),
            // Waiters are dropped when the queue closes.
            Err(sync::Disconnected) => Ok(None),
        }
    }

    /// Buffers a fetched block until the consumer reaches its height.
    /// Responses for heights that are not outstanding (never dispatched,
    /// already buffered, already verified, or awaiting a refetch) are
    /// dropped, so duplicate and late fetches are harmless.
    pub fn add(&self, resp: BlockResponse) {
        self.state.send_if_modified(|inner| {
            let number = resp.block.number;
            if inner.closed || !inner.is_outstanding(number) {
                tracing::debug!(%number, "dropping duplicate or stale block response");
                return false;
            }
            inner.pending.insert(number, resp);
            true
        });
    }

    /// Next block for the consumer to verify: the buffered response for the
    /// single expected height. Blocks until that height is fetched. Returns
    /// `None` iff the queue is closed.
    ///
    /// The response stays buffered until the consumer reports the outcome
    /// via [`Self::success`] or [`Self::retry`]; calling `verify_next` again
    /// before that yields the same block.
    pub async fn verify_next(&self, ctx: &ctx::Ctx) -> ctx::OrCanceled<Option<BlockResponse>> {
        let mut sub = self.state.subscribe();
        sync::wait_for_some(ctx, &mut sub, |inner| {
            if inner.closed {
                return Some(None);
            }
            inner.pending.get(&inner.verify_cursor).cloned().map(Some)
        })
        .await
    }

    /// Confirms that the consumer verified the block at `number`, freeing its
    /// capacity slot. Then evaluates the stop condition: once the block at
    /// the effective stop height is verified, the queue closes if that block
    /// precedes the stop time, and extends the backfill window one height
    /// down otherwise.
    ///
    /// # Panics
    ///
    /// `number` must be the height delivered by [`Self::verify_next`].
    /// Confirming any other height is a bug in the consumer.
    pub fn success(&self, number: BlockNumber) {
        self.state.send_if_modified(|inner| {
            if inner.closed {
                return false;
            }
            assert_eq!(
                number, inner.verify_cursor,
                "blocks must be confirmed in order: expected #{}, got #{number}",
                inner.verify_cursor,
            );
            let resp = inner
                .pending
                .remove(&number)
                .expect("confirmed a block that was never delivered");
            inner.inflight -= 1;
            if number == inner.stop_height {
                if resp.block.time < inner.stop_time {
                    tracing::debug!(%number, "backfill complete");
                    inner.close();
                    return true;
                }
                // The block at the stop height is still newer than the stop
                // time: extend the window one height down and keep fetching.
                match inner.stop_height.prev() {
                    Some(stop_height) => inner.stop_height = stop_height,
                    None => {
                        tracing::warn!("reached the genesis block without crossing the stop time");
                        inner.close();
                        return true;
                    }
                }
            }
            let Some(cursor) = number.prev() else {
                // Height 0 equals the stop height and was handled above.
                inner.close();
                return true;
            };
            inner.verify_cursor = cursor;
            inner.wake_waiters();
            true
        });
    }

    /// Schedules `number` to be fetched again, ahead of all fresh heights.
    /// Valid both for heights whose fetch failed and for delivered blocks the
    /// consumer rejected; any buffered response for the height is discarded,
    /// making the refetch authoritative. Reports for heights no longer
    /// outstanding are dropped.
    pub fn retry(&self, number: BlockNumber) {
        self.state.send_if_modified(|inner| {
            if inner.closed {
                return false;
            }
            let buffered = inner.pending.remove(&number).is_some();
            if !buffered && !inner.is_outstanding(number) {
                tracing::debug!(%number, "dropping stale retry request");
                return false;
            }
            inner.retry.push(number);
            inner.wake_waiters();
            true
        });
    }

    /// Closes the queue: blocked and future [`Self::next_height`] and
    /// [`Self::verify_next`] calls yield `None`, all other calls become
    /// no-ops. Used for caller-initiated shutdown; the queue also closes
    /// itself once the backfill terminates. Idempotent.
    pub fn close(&self) {
        self.state.send_if_modified(|inner| {
            if inner.closed {
                return false;
            }
            inner.close();
            true
        });
    }

    /// Waits until the queue is closed.
    pub async fn done(&self, ctx: &ctx::Ctx) -> ctx::OrCanceled<()> {
        let mut sub = self.state.subscribe();
        sync::wait_for(ctx, &mut sub, |inner| inner.closed).await?;
        Ok(())
    }

    /// Whether the queue has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Number of fetched blocks buffered and awaiting verification.
    pub fn num_pending(&self) -> usize {
        self.state.borrow().pending.len()
    }
}
