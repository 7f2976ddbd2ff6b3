//! Shared-secret handshake.
//!
//! Sent once by the client, before its first request:
//!
//! ```text
//! +-----------+------------+-------------------+
//! | 0x00 (1)  | length (1) | token (length)    |
//! +-----------+------------+-------------------+
//! ```
//!
//! The server never replies. A good token lets the request loop start; a bad
//! one closes the connection.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Error, Result, types::AUTH_VERSION};

/// Reads one auth header from `reader` and checks it against `token`.
///
/// # Errors
/// - [`Error::InvalidRequest`] if the reserved byte is not `0`.
/// - [`Error::InvalidAuth`] if the presented token differs from `token`.
/// - [`Error::Io`] (`UnexpectedEof`) if the peer hangs up mid-header.
pub async fn authenticate<R>(reader: &mut R, token: &[u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0_u8; 2];
    reader.read_exact(&mut header).await?;

    let [version, len] = header;
    if version != AUTH_VERSION {
        return Err(Error::InvalidRequest {
            reason: format!("unsupported auth header version {version}"),
        });
    }

    let mut presented = vec![0_u8; usize::from(len)];
    reader.read_exact(&mut presented).await?;

    if !constant_time_eq(&presented, token) {
        return Err(Error::InvalidAuth);
    }

    tracing::debug!("client authenticated");
    Ok(())
}

/// Compares two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
