use core::cmp::Ordering;
use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, Result, SnowflakeGenerator, SnowflakeId, TWITTER_EPOCH_MILLIS, time::TimeSource,
};

/// Number of busy polls before the clock wait starts yielding the thread.
const SPIN_LIMIT: u32 = 64;

/// Mutable allocator state. Only ever touched with the lock held.
#[derive(Debug, Clone, Copy)]
struct State {
    /// Unix millis of the last minted ID, `None` until the first allocation.
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The generator state lives behind an [`Arc<Mutex<_>>`]; clones share it, so
/// every clone mints from the same sequence. The lock is held for the whole of
/// one allocation, including the wait for the next millisecond when the
/// 4096-per-millisecond budget is spent. All callers are therefore serialised
/// and sequence numbers follow arrival order.
///
/// `parking_lot` mutexes do not poison, so a panicking caller cannot wedge the
/// allocator for everyone else.
///
/// ## Example
/// ```
/// use mintflake::{LockSnowflakeGenerator, SystemClock};
///
/// let generator = LockSnowflakeGenerator::try_new(7, 3, SystemClock)?;
/// let id = generator.try_next_id()?;
///
/// assert_eq!(id.datacenter_id(), 7);
/// assert_eq!(id.worker_id(), 3);
/// # Ok::<(), mintflake::Error>(())
/// ```
pub struct LockSnowflakeGenerator<T>
where
    T: TimeSource<u64>,
{
    state: Arc<Mutex<State>>,
    datacenter_id: u64,
    worker_id: u64,
    time: T,
}

impl<T> LockSnowflakeGenerator<T>
where
    T: TimeSource<u64>,
{
    /// Creates a new generator with no recorded timestamp.
    ///
    /// IDs wider than their 5-bit fields are masked. Use [`Self::try_new`] to
    /// reject them instead.
    pub fn new(datacenter_id: u64, worker_id: u64, time: T) -> Self {
        Self::from_components(None, datacenter_id, worker_id, 0, time)
    }

    /// Creates a new generator, validating that both IDs fit the layout.
    ///
    /// # Errors
    /// - [`Error::DatacenterIdOutOfRange`] if `datacenter_id > 31`
    /// - [`Error::WorkerIdOutOfRange`] if `worker_id > 31`
    pub fn try_new(datacenter_id: u64, worker_id: u64, time: T) -> Result<Self> {
        if datacenter_id > SnowflakeId::MAX_DATACENTER_ID {
            return Err(Error::DatacenterIdOutOfRange(datacenter_id));
        }
        if worker_id > SnowflakeId::MAX_WORKER_ID {
            return Err(Error::WorkerIdOutOfRange(worker_id));
        }
        Ok(Self::new(datacenter_id, worker_id, time))
    }

    /// Creates a generator from explicit state.
    ///
    /// Useful to restart an instance with the last timestamp it is known to
    /// have used, so a clock that was stepped back across the restart is
    /// detected instead of producing duplicates.
    ///
    /// # Parameters
    /// - `last_timestamp`: Unix millis of the last minted ID, if any
    /// - `datacenter_id`, `worker_id`: identity embedded in every ID
    /// - `sequence`: the sequence last used at `last_timestamp`
    /// - `time`: the [`TimeSource`] to sample
    pub fn from_components(
        last_timestamp: Option<u64>,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
        time: T,
    ) -> Self {
        debug_assert!(
            datacenter_id <= SnowflakeId::MAX_DATACENTER_ID,
            "datacenter_id overflow"
        );
        debug_assert!(worker_id <= SnowflakeId::MAX_WORKER_ID, "worker_id overflow");
        debug_assert!(sequence <= SnowflakeId::MAX_SEQUENCE, "sequence overflow");
        Self {
            state: Arc::new(Mutex::new(State {
                last_timestamp,
                sequence: sequence & SnowflakeId::SEQUENCE_MASK,
            })),
            datacenter_id: datacenter_id & SnowflakeId::DATACENTER_ID_MASK,
            worker_id: worker_id & SnowflakeId::WORKER_ID_MASK,
            time,
        }
    }

    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// Unix millis of the last minted ID.
    pub fn last_timestamp(&self) -> Option<u64> {
        self.state.lock().last_timestamp
    }

    /// Sequence number of the last minted ID.
    pub fn sequence(&self) -> u64 {
        self.state.lock().sequence
    }

    /// Mints the next ID.
    ///
    /// When the sequence for the current millisecond is exhausted, this call
    /// blocks (with the lock held) until the clock advances.
    ///
    /// # Errors
    /// - [`Error::ClockMovedBackward`] if the clock reads earlier than the
    ///   last minted timestamp. Nothing is mutated and nothing is retried.
    /// - [`Error::ClockBeforeEpoch`] if the clock reads earlier than
    ///   [`TWITTER_EPOCH`](crate::TWITTER_EPOCH).
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.state.lock();
        let mut now = self.time.current_millis();

        // Reject before touching the sequence.
        if let Some(last) = state.last_timestamp {
            if now < last {
                return Err(Self::cold_clock_behind(now, last));
            }
        }
        if now < TWITTER_EPOCH_MILLIS {
            return Err(Error::ClockBeforeEpoch {
                now,
                epoch: TWITTER_EPOCH_MILLIS,
            });
        }

        match state.last_timestamp.map(|last| now.cmp(&last)) {
            Some(Ordering::Equal) => {
                state.sequence = (state.sequence + 1) & SnowflakeId::SEQUENCE_MASK;
                if state.sequence == 0 {
                    now = self.wait_next_millis(now);
                }
            }
            _ => state.sequence = 0,
        }
        state.last_timestamp = Some(now);

        Ok(SnowflakeId::from(
            now - TWITTER_EPOCH_MILLIS,
            self.datacenter_id,
            self.worker_id,
            state.sequence,
        ))
    }

    /// Like [`Self::try_next_id`], but sleeps out a backward clock jump and
    /// tries again instead of failing.
    ///
    /// # Errors
    /// - [`Error::ClockBeforeEpoch`], which waiting cannot fix.
    pub fn next_id(&self) -> Result<SnowflakeId> {
        loop {
            match self.try_next_id() {
                Err(Error::ClockMovedBackward { wait_until }) => {
                    let behind = wait_until.saturating_sub(self.time.current_millis());
                    std::thread::sleep(Duration::from_millis(behind.max(1)));
                }
                other => return other,
            }
        }
    }

    /// Polls until the clock passes `last`. Backs off from spinning to
    /// yielding, but never gives up the caller's lock.
    #[cold]
    #[inline(never)]
    fn wait_next_millis(&self, last: u64) -> u64 {
        let mut spins = 0;
        loop {
            let now = self.time.current_millis();
            if now > last {
                return now;
            }
            if spins < SPIN_LIMIT {
                spins += 1;
                core::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(now, last, "clock moved backward by {}ms", last - now);
        #[cfg(not(feature = "tracing"))]
        let _ = now;
        Error::ClockMovedBackward { wait_until: last }
    }
}

impl<T> Clone for LockSnowflakeGenerator<T>
where
    T: TimeSource<u64> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            datacenter_id: self.datacenter_id,
            worker_id: self.worker_id,
            time: self.time.clone(),
        }
    }
}

impl<T> SnowflakeGenerator for LockSnowflakeGenerator<T>
where
    T: TimeSource<u64>,
{
    fn try_next_id(&self) -> Result<SnowflakeId> {
        self.try_next_id()
    }
}

impl<T> core::fmt::Debug for LockSnowflakeGenerator<T>
where
    T: TimeSource<u64>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockSnowflakeGenerator")
            .field("datacenter_id", &self.datacenter_id)
            .field("worker_id", &self.worker_id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
