//! # Shared ID types and wire constants
//!
//! Client and server agree on these at compile time; changing any of them
//! changes the wire format.

use mintflake::{LockSnowflakeGenerator, SystemClock};

pub use mintflake::SnowflakeId;

/// Number of bytes a single [`SnowflakeId`] occupies on the wire
/// (big-endian).
pub const SNOWFLAKE_ID_SIZE: usize = core::mem::size_of::<u64>();

/// Largest batch a single request byte can ask for.
pub const MAX_IDS_PER_REQUEST: usize = u8::MAX as usize;

/// Reserved first byte of the auth header.
pub const AUTH_VERSION: u8 = 0;

/// Longest token the one-byte auth length prefix can carry.
pub const MAX_TOKEN_LEN: usize = u8::MAX as usize;

/// The clock used to timestamp IDs.
pub type Clock = SystemClock;

/// The allocator shared by every connection of one server process.
pub type Generator = LockSnowflakeGenerator<Clock>;
