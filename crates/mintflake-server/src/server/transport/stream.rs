use core::{fmt::Display, future::Future};

use mintflake::SnowflakeGenerator;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_stream::{Stream, StreamExt, wrappers::TcpListenerStream};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::Instrument;

use crate::{Error, server::service::handler::IdService};

/// Accepts TCP connections until `shutdown` resolves.
pub async fn serve_tcp<G, F>(listener: TcpListener, service: IdService<G>, shutdown: F)
where
    G: SnowflakeGenerator + Send + Sync + 'static,
    F: Future<Output = ()>,
{
    serve_incoming(TcpListenerStream::new(listener), service, shutdown).await;
}

/// Accepts Unix socket connections until `shutdown` resolves.
#[cfg(unix)]
pub async fn serve_uds<G, F>(listener: tokio::net::UnixListener, service: IdService<G>, shutdown: F)
where
    G: SnowflakeGenerator + Send + Sync + 'static,
    F: Future<Output = ()>,
{
    use tokio_stream::wrappers::UnixListenerStream;
    serve_incoming(UnixListenerStream::new(listener), service, shutdown).await;
}

/// Runs one task per accepted connection until `shutdown` resolves or
/// `incoming` ends.
///
/// Connections are fully independent; within one connection requests are
/// handled strictly in order. On shutdown the accept loop stops, every open
/// connection is closed, and this returns once all connection tasks are done.
///
/// Accept errors are logged and skipped.
pub async fn serve_incoming<I, IO, E, G, F>(mut incoming: I, service: IdService<G>, shutdown: F)
where
    I: Stream<Item = Result<IO, E>> + Unpin,
    IO: AsyncRead + AsyncWrite + Send + 'static,
    E: Display,
    G: SnowflakeGenerator + Send + Sync + 'static,
    F: Future<Output = ()>,
{
    let tracker = TaskTracker::new();
    let cancel = CancellationToken::new();
    let mut conn_id: u64 = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            conn = incoming.next() => match conn {
                Some(Ok(io)) => {
                    conn_id += 1;
                    let span = tracing::info_span!("connection", id = conn_id);
                    let conn = handle_connection(io, service.clone(), cancel.child_token());
                    tracker.spawn(conn.instrument(span));
                }
                Some(Err(e)) => tracing::error!("Failed to accept connection: {e}"),
                None => break,
            },
        }
    }

    tracker.close();
    cancel.cancel();
    tracing::debug!("Waiting for {} open connections to close", tracker.len());
    tracker.wait().await;
}

async fn handle_connection<IO, G>(io: IO, service: IdService<G>, cancel: CancellationToken)
where
    IO: AsyncRead + AsyncWrite,
    G: SnowflakeGenerator,
{
    tracing::debug!("Connection opened");
    let (mut reader, mut writer) = tokio::io::split(io);

    let res = tokio::select! {
        res = service.serve_connection(&mut reader, &mut writer) => res,
        () = cancel.cancelled() => {
            tracing::debug!("Closing connection for shutdown");
            return;
        }
    };

    // Both halves drop here, which closes the connection.
    match res {
        Ok(()) => tracing::debug!("Connection closed by peer"),
        Err(e) if e.is_disconnect() => tracing::debug!("Connection dropped: {e}"),
        Err(e @ Error::IdGeneration(_)) => tracing::error!("Closing connection: {e}"),
        Err(e) => tracing::warn!("Closing connection: {e}"),
    }
}
