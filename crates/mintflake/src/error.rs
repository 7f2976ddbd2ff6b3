/// A result type defaulting to the allocator [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `mintflake` can emit.
///
/// The allocator is infallible except for clock anomalies and invalid
/// identity configuration. Sequence exhaustion within a millisecond is never an
/// error: the allocator stalls until the clock advances.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The wall clock regressed below the last recorded timestamp (e.g. an
    /// NTP step). The generator state is left untouched.
    ///
    /// `wait_until` is the Unix timestamp (milliseconds) the clock must reach
    /// again before IDs can be minted.
    #[error("clock moved backward, refusing to mint until {wait_until}ms")]
    ClockMovedBackward {
        /// The last timestamp an ID was minted at.
        wait_until: u64,
    },

    /// The wall clock reads earlier than the custom epoch, so the timestamp
    /// field cannot be encoded.
    #[error("clock reads {now}ms which is before the epoch {epoch}ms")]
    ClockBeforeEpoch {
        /// Current Unix time in milliseconds.
        now: u64,
        /// The custom epoch in Unix milliseconds.
        epoch: u64,
    },

    /// The configured datacenter ID does not fit its 5-bit field.
    #[error(
        "datacenter id {0} must be between 0 and {max}",
        max = crate::SnowflakeId::MAX_DATACENTER_ID
    )]
    DatacenterIdOutOfRange(u64),

    /// The configured worker ID does not fit its 5-bit field.
    #[error("worker id {0} must be between 0 and {max}", max = crate::SnowflakeId::MAX_WORKER_ID)]
    WorkerIdOutOfRange(u64),
}
