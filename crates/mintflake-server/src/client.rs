//! A minimal async client for the binary ID protocol.
//!
//! ```no_run
//! # async fn run() -> mintflake_server::Result<()> {
//! use mintflake_server::client::Client;
//!
//! let mut client = Client::connect("127.0.0.1:4444").await?;
//! client.authenticate(b"s3cret").await?;
//! let ids = client.next_ids(16).await?;
//! assert_eq!(ids.len(), 16);
//! # Ok(())
//! # }
//! ```

use bytes::Buf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::{
    Error, Result,
    types::{AUTH_VERSION, MAX_TOKEN_LEN, SNOWFLAKE_ID_SIZE, SnowflakeId},
};

/// One persistent connection to an ID server.
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    stream: S,
}

impl Client<TcpStream> {
    /// Opens a TCP connection to `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already connected stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Sends the auth header. Must be the first thing sent on a connection to
    /// a server with a token configured.
    ///
    /// The server does not acknowledge; a wrong token surfaces as a closed
    /// connection on the next request.
    ///
    /// # Errors
    /// - [`Error::InvalidRequest`] if `token` is longer than 255 bytes.
    pub async fn authenticate(&mut self, token: &[u8]) -> Result<()> {
        let len = u8::try_from(token.len()).map_err(|_| Error::InvalidRequest {
            reason: format!("token is {} bytes, at most {MAX_TOKEN_LEN} allowed", token.len()),
        })?;

        let mut header = Vec::with_capacity(2 + token.len());
        header.extend_from_slice(&[AUTH_VERSION, len]);
        header.extend_from_slice(token);
        self.stream.write_all(&header).await?;
        Ok(())
    }

    /// Requests `count` IDs and waits for all of them.
    ///
    /// # Errors
    /// - [`Error::InvalidRequest`] if `count` is 0. Nothing is sent.
    /// - [`Error::Io`] with `UnexpectedEof` if the server closed the
    ///   connection (bad token, clock regression).
    pub async fn next_ids(&mut self, count: u8) -> Result<Vec<SnowflakeId>> {
        if count == 0 {
            return Err(Error::InvalidRequest {
                reason: "Count must be greater than 0".to_string(),
            });
        }

        self.stream.write_all(&[count]).await?;
        self.stream.flush().await?;

        let mut response = vec![0_u8; usize::from(count) * SNOWFLAKE_ID_SIZE];
        self.stream.read_exact(&mut response).await?;

        let mut buf = &response[..];
        let mut ids = Vec::with_capacity(usize::from(count));
        while buf.has_remaining() {
            ids.push(SnowflakeId::from_raw(buf.get_u64()));
        }
        Ok(ids)
    }

    pub async fn next_id(&mut self) -> Result<SnowflakeId> {
        let ids = self.next_ids(1).await?;
        Ok(ids[0])
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
