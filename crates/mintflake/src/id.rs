use core::fmt;

use crate::TWITTER_EPOCH_MILLIS;

/// A 64-bit Snowflake ID with separate datacenter and worker fields.
///
/// - 1 bit reserved
/// - 41 bits timestamp (ms since [`TWITTER_EPOCH`])
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21             17 16         12 11             0
///              +--------------+----------------+-----------------+-------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter (5)  | worker (5)  | sequence (12) |
///              +--------------+----------------+-----------------+-------------+---------------+
///              |<------------------ MSB ------------ 64 bits ------------ LSB ---------------->|
/// ```
///
/// [`TWITTER_EPOCH`]: crate::TWITTER_EPOCH
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

    /// Bitmask for extracting the 5-bit datacenter ID field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 5-bit worker ID field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << 12) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 = 22;

    /// Number of bits to shift the datacenter ID to its correct position (bit
    /// 17).
    pub const DATACENTER_ID_SHIFT: u64 = 17;

    /// Number of bits to shift the worker ID to its correct position (bit 12).
    pub const WORKER_ID_SHIFT: u64 = 12;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Largest datacenter ID that fits the layout.
    pub const MAX_DATACENTER_ID: u64 = Self::DATACENTER_ID_MASK;

    /// Largest worker ID that fits the layout.
    pub const MAX_WORKER_ID: u64 = Self::WORKER_ID_MASK;

    /// Largest sequence value minted within one millisecond.
    pub const MAX_SEQUENCE: u64 = Self::SEQUENCE_MASK;

    /// Packs the four components into an ID. Each component is masked to its
    /// field width.
    pub const fn from(timestamp: u64, datacenter_id: u64, worker_id: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id =
            (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Extracts the timestamp (ms since the custom epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID from the packed ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Unix time (ms) the ID was minted at.
    pub const fn unix_millis(&self) -> u64 {
        self.timestamp() + TWITTER_EPOCH_MILLIS
    }

    /// Converts this type into its raw representation.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Converts a raw value into this type.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Network byte order, as written on the wire.
    pub const fn to_be_bytes(&self) -> [u8; 8] {
        self.id.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self::from_raw(u64::from_be_bytes(bytes))
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<u64> for SnowflakeId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_round_trip() {
        let ts = 1_234_567_890;
        let id = SnowflakeId::from(ts, 7, 3, 42);

        assert_eq!(id.timestamp(), ts);
        assert_eq!(id.datacenter_id(), 7);
        assert_eq!(id.worker_id(), 3);
        assert_eq!(id.sequence(), 42);
    }

    #[test]
    fn layout_matches_shift_amounts() {
        let id = SnowflakeId::from(5, 7, 3, 42);
        assert_eq!(id.to_raw(), (5 << 22) | (7 << 17) | (3 << 12) | 42);
    }

    #[test]
    fn sign_bit_is_never_set() {
        let id = SnowflakeId::from(u64::MAX, u64::MAX, u64::MAX, u64::MAX);

        assert_eq!(id.to_raw() >> 63, 0);
        assert_eq!(id.timestamp(), SnowflakeId::TIMESTAMP_MASK);
        assert_eq!(id.datacenter_id(), SnowflakeId::MAX_DATACENTER_ID);
        assert_eq!(id.worker_id(), SnowflakeId::MAX_WORKER_ID);
        assert_eq!(id.sequence(), SnowflakeId::MAX_SEQUENCE);
    }

    #[test]
    fn fields_do_not_bleed_into_each_other() {
        let only_worker = SnowflakeId::from(0, 0, 31, 0);
        assert_eq!(only_worker.datacenter_id(), 0);
        assert_eq!(only_worker.sequence(), 0);

        let only_datacenter = SnowflakeId::from(0, 31, 0, 0);
        assert_eq!(only_datacenter.worker_id(), 0);
        assert_eq!(only_datacenter.timestamp(), 0);
    }

    #[test]
    fn big_endian_bytes() {
        let id = SnowflakeId::from_raw(0x0102_0304_0506_0708);
        assert_eq!(id.to_be_bytes(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(SnowflakeId::from_be_bytes(id.to_be_bytes()), id);
    }

    #[test]
    fn ordering_follows_timestamp_then_sequence() {
        let a = SnowflakeId::from(10, 31, 31, 4095);
        let b = SnowflakeId::from(11, 0, 0, 0);
        let c = SnowflakeId::from(11, 0, 0, 1);
        assert!(a < b && b < c);
    }

    #[test]
    fn unix_millis_adds_epoch() {
        let id = SnowflakeId::from(1000, 0, 0, 0);
        assert_eq!(id.unix_millis(), TWITTER_EPOCH_MILLIS + 1000);
    }

    #[test]
    fn padded_string() {
        assert_eq!(SnowflakeId::from_raw(42).to_padded_string(), "00000000000000000042");
        assert_eq!(SnowflakeId::from_raw(42).to_string(), "42");
    }
}
