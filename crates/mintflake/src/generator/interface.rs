use std::sync::Arc;

use crate::{Result, SnowflakeId};

/// A minimal interface for minting Snowflake IDs.
///
/// Implementations must be safe to share between connections; the server
/// only ever holds a shared reference.
pub trait SnowflakeGenerator {
    /// Mints the next ID, or reports why it cannot be minted right now.
    fn try_next_id(&self) -> Result<SnowflakeId>;
}

impl<G> SnowflakeGenerator for &G
where
    G: SnowflakeGenerator + ?Sized,
{
    fn try_next_id(&self) -> Result<SnowflakeId> {
        (**self).try_next_id()
    }
}

impl<G> SnowflakeGenerator for Arc<G>
where
    G: SnowflakeGenerator + ?Sized,
{
    fn try_next_id(&self) -> Result<SnowflakeId> {
        (**self).try_next_id()
    }
}
