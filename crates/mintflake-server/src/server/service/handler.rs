//! Request loop and the per-process ID service.
//!
//! The loop only sees a byte source and a byte sink, so the same code serves
//! a raw TCP stream, a Unix socket, and an HTTP request body.
//!
//! ## Wire format
//!
//! - Request: one byte `n`, the number of IDs wanted (1..=255).
//! - Response: `n * 8` bytes, each ID big-endian, in minting order.

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use mintflake::SnowflakeGenerator;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    Error, Result,
    server::{config::ServerConfig, service::auth::authenticate},
    types::{Clock, Generator, MAX_IDS_PER_REQUEST, SNOWFLAKE_ID_SIZE},
};

/// Serves requests from `reader` until it is exhausted.
///
/// Returns `Ok(())` when the peer closes the stream at a request boundary.
///
/// # Errors
/// - [`Error::InvalidRequest`] for a zero-count request. Nothing is written
///   for it.
/// - [`Error::IdGeneration`] if the allocator refuses to mint. The partially
///   filled batch is discarded.
/// - [`Error::Io`] if reading or writing fails.
pub async fn serve<R, W, G>(reader: &mut R, writer: &mut W, generator: &G) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    G: SnowflakeGenerator + ?Sized,
{
    // Reused across requests to avoid heap churn.
    let mut buf = BytesMut::with_capacity(MAX_IDS_PER_REQUEST * SNOWFLAKE_ID_SIZE);

    loop {
        let count = match reader.read_u8().await {
            Ok(count) => count,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if count == 0 {
            return Err(Error::InvalidRequest {
                reason: "Count must be greater than 0".to_string(),
            });
        }

        buf.clear();
        for _ in 0..count {
            let id = generator.try_next_id()?;
            buf.put_u64(id.to_raw());
        }

        writer.write_all(&buf).await?;
        writer.flush().await?;
        tracing::trace!(count, "served batch");
    }
}

/// The ID service shared by every connection of one server process.
///
/// Holds the single allocator and the optional shared secret. Cloning is
/// cheap and every clone mints from the same allocator.
pub struct IdService<G = Generator> {
    generator: Arc<G>,
    token: Option<Arc<[u8]>>,
}

impl<G> Clone for IdService<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            token: self.token.clone(),
        }
    }
}

impl IdService<Generator> {
    /// Builds the production allocator from the validated configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        let generator = Generator::from_components(
            config.last_timestamp,
            config.datacenter_id,
            config.worker_id,
            0,
            Clock::default(),
        );
        let service = Self::new(generator);
        match &config.token {
            Some(token) => service.with_token(token.as_bytes()),
            None => service,
        }
    }
}

impl<G> IdService<G>
where
    G: SnowflakeGenerator,
{
    /// Creates a service without authentication.
    pub fn new(generator: G) -> Self {
        Self {
            generator: Arc::new(generator),
            token: None,
        }
    }

    /// Requires every connection-oriented client to present `token` first.
    pub fn with_token(mut self, token: impl AsRef<[u8]>) -> Self {
        self.token = Some(Arc::from(token.as_ref()));
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn requires_auth(&self) -> bool {
        self.token.is_some()
    }

    /// Serves a persistent connection: the auth handshake (if a token is
    /// configured), then the request loop.
    pub async fn serve_connection<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Some(token) = &self.token {
            authenticate(reader, token).await?;
        }
        serve(reader, writer, &*self.generator).await
    }

    /// Serves one stateless request/response exchange. Never authenticates.
    pub async fn serve_request<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        serve(reader, writer, &*self.generator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintflake::{
        LockSnowflakeGenerator, SnowflakeId, SystemClock, TWITTER_EPOCH_MILLIS, TimeSource,
    };

    struct MockTime {
        millis: u64,
    }

    impl TimeSource<u64> for MockTime {
        fn current_millis(&self) -> u64 {
            self.millis
        }
    }

    /// Fails every allocation, as if the clock had been stepped back.
    struct BackwardGenerator;

    impl SnowflakeGenerator for BackwardGenerator {
        fn try_next_id(&self) -> mintflake::Result<SnowflakeId> {
            Err(mintflake::Error::ClockMovedBackward { wait_until: 7 })
        }
    }

    fn generator() -> LockSnowflakeGenerator<SystemClock> {
        LockSnowflakeGenerator::new(7, 3, SystemClock)
    }

    async fn serve_bytes(input: &[u8]) -> (Result<()>, Vec<u8>) {
        let mut reader = input;
        let mut out = Vec::new();
        let res = serve(&mut reader, &mut out, &generator()).await;
        (res, out)
    }

    fn decode(out: &[u8]) -> Vec<SnowflakeId> {
        out.chunks_exact(SNOWFLAKE_ID_SIZE)
            .map(|c| SnowflakeId::from_be_bytes(c.try_into().unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn response_is_eight_bytes_per_id() {
        for (n, expected) in [(1_u8, 8), (2, 16), (255, 2040)] {
            let (res, out) = serve_bytes(&[n]).await;
            res.unwrap();
            assert_eq!(out.len(), expected);
        }
    }

    #[tokio::test]
    async fn every_count_is_sized_exactly() {
        let generator = generator();
        for n in 1..=u8::MAX {
            let mut reader: &[u8] = &[n];
            let mut out = Vec::new();
            serve(&mut reader, &mut out, &generator).await.unwrap();
            assert_eq!(out.len(), usize::from(n) * SNOWFLAKE_ID_SIZE);
        }
    }

    #[tokio::test]
    async fn zero_count_terminates_without_output() {
        let (res, out) = serve_bytes(&[0]).await;
        assert!(matches!(res, Err(Error::InvalidRequest { .. })));
        assert!(out.is_empty());

        // Requests before the zero are still answered.
        let (res, out) = serve_bytes(&[2, 0, 1]).await;
        assert!(matches!(res, Err(Error::InvalidRequest { .. })));
        assert_eq!(out.len(), 16);
    }

    #[tokio::test]
    async fn empty_input_is_a_clean_end() {
        let (res, out) = serve_bytes(&[]).await;
        res.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn loop_serves_every_request_in_order() {
        let (res, out) = serve_bytes(&[3, 1, 4]).await;
        res.unwrap();

        let ids = decode(&out);
        assert_eq!(ids.len(), 8);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|id| id.datacenter_id() == 7 && id.worker_id() == 3));
    }

    #[tokio::test]
    async fn ids_are_big_endian_on_the_wire() {
        let t = TWITTER_EPOCH_MILLIS + 1000;
        let generator = LockSnowflakeGenerator::new(7, 3, MockTime { millis: t });
        let mut reader: &[u8] = &[1];
        let mut out = Vec::new();
        serve(&mut reader, &mut out, &generator).await.unwrap();

        let expected = SnowflakeId::from(1000, 7, 3, 0).to_raw().to_be_bytes();
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn allocation_failure_aborts_the_batch() {
        let mut reader: &[u8] = &[5];
        let mut out = Vec::new();
        let err = serve(&mut reader, &mut out, &BackwardGenerator)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::IdGeneration(mintflake::Error::ClockMovedBackward { wait_until: 7 })
        ));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn service_gates_on_token() {
        let service = IdService::new(generator()).with_token("s3cret");
        assert!(service.requires_auth());

        let mut reader: &[u8] = b"\x00\x06s3cret\x01";
        let mut out = Vec::new();
        service.serve_connection(&mut reader, &mut out).await.unwrap();
        assert_eq!(out.len(), 8);

        let mut reader: &[u8] = b"\x00\x06wrong!\x01";
        let mut out = Vec::new();
        let err = service.serve_connection(&mut reader, &mut out).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAuth));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn stateless_requests_skip_auth() {
        let service = IdService::new(generator()).with_token("s3cret");

        let mut reader: &[u8] = &[2];
        let mut out = Vec::new();
        service.serve_request(&mut reader, &mut out).await.unwrap();
        assert_eq!(out.len(), 16);
    }

    #[tokio::test]
    async fn clones_share_the_allocator() {
        let service = IdService::new(LockSnowflakeGenerator::new(
            0,
            0,
            MockTime {
                millis: TWITTER_EPOCH_MILLIS + 5,
            },
        ));
        let other = service.clone();

        let (mut a, mut b) = (Vec::new(), Vec::new());
        service.serve_request(&mut &[1_u8][..], &mut a).await.unwrap();
        other.serve_request(&mut &[1_u8][..], &mut b).await.unwrap();

        assert_eq!(decode(&a)[0].sequence(), 0);
        assert_eq!(decode(&b)[0].sequence(), 1);
    }

    #[tokio::test]
    async fn from_config_applies_identity_and_token() {
        let config = ServerConfig {
            worker_id: 3,
            datacenter_id: 7,
            listen: "127.0.0.1:0".to_string(),
            last_timestamp: None,
            token: Some("s3cret".to_string()),
            http: false,
            uds: false,
        };
        let service = IdService::from_config(&config);

        assert!(service.requires_auth());
        assert_eq!(service.generator().worker_id(), 3);
        assert_eq!(service.generator().datacenter_id(), 7);
    }
}
