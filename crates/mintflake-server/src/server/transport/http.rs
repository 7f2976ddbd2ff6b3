//! HTTP binding.
//!
//! `POST /` with the request bytes as the body returns the response bytes as
//! the body. The body may hold up to [`MAX_BODY_LEN`] request bytes; each is
//! answered in order. The whole body is checked before anything is minted, so
//! a zero count anywhere yields 400 and a longer body yields 413. Every other
//! method or path is a 404.
//!
//! HTTP is stateless, so the auth handshake is never run here.

use core::future::Future;
use std::io;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use mintflake::SnowflakeGenerator;
use tokio::net::TcpListener;

use crate::{Error, server::service::handler::IdService, types::SNOWFLAKE_ID_SIZE};

/// Most request bytes one HTTP body may carry.
pub const MAX_BODY_LEN: usize = 64;

/// Builds the router serving `service`.
pub fn router<G>(service: IdService<G>) -> Router
where
    G: SnowflakeGenerator + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(mint_ids::<G>).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_LEN))
        .with_state(service)
}

/// Serves HTTP on `listener` until `shutdown` resolves.
pub async fn serve_http<G, F>(
    listener: TcpListener,
    service: IdService<G>,
    shutdown: F,
) -> io::Result<()>
where
    G: SnowflakeGenerator + Send + Sync + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn mint_ids<G>(
    State(service): State<IdService<G>>,
    body: Bytes,
) -> Result<Response, Error>
where
    G: SnowflakeGenerator + Send + Sync + 'static,
{
    if body.contains(&0) {
        return Err(Error::InvalidRequest {
            reason: "Count must be greater than 0".to_string(),
        });
    }

    // Bounded by the body limit.
    let capacity: usize = body.iter().map(|&n| usize::from(n) * SNOWFLAKE_ID_SIZE).sum();
    let mut reader = &body[..];
    let mut out = Vec::with_capacity(capacity);

    service.serve_request(&mut reader, &mut out).await?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], out).into_response())
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidRequest { .. } | Error::InvalidAuth => StatusCode::BAD_REQUEST,
            Error::IdGeneration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        } else {
            tracing::warn!("Rejected request: {self}");
        }

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use mintflake::{LockSnowflakeGenerator, SnowflakeId, SystemClock};
    use tower::ServiceExt;

    /// Fails every allocation, as if the clock had been stepped back.
    struct BackwardGenerator;

    impl SnowflakeGenerator for BackwardGenerator {
        fn try_next_id(&self) -> mintflake::Result<SnowflakeId> {
            Err(mintflake::Error::ClockMovedBackward { wait_until: 7 })
        }
    }

    fn app() -> Router {
        router(service())
    }

    fn service() -> IdService<LockSnowflakeGenerator<SystemClock>> {
        IdService::new(LockSnowflakeGenerator::new(7, 3, SystemClock)).with_token("s3cret")
    }

    async fn call(app: Router, method: Method, uri: &str, body: Vec<u8>) -> (StatusCode, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn post_returns_packed_ids() {
        let (status, body) = call(app(), Method::POST, "/", vec![3]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.len(), 24);

        let id = SnowflakeId::from_be_bytes(body[..8].try_into().unwrap());
        assert_eq!(id.datacenter_id(), 7);
        assert_eq!(id.worker_id(), 3);
    }

    #[tokio::test]
    async fn post_answers_every_request_byte() {
        let (status, body) = call(app(), Method::POST, "/", vec![1, 255]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.len(), 256 * 8);
    }

    #[tokio::test]
    async fn empty_body_is_empty_response() {
        let (status, body) = call(app(), Method::POST, "/", vec![]).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn zero_count_is_bad_request() {
        let (status, _) = call(app(), Method::POST, "/", vec![0]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_count_anywhere_rejects_before_minting() {
        let service = service();
        let app = router(service.clone());
        let (status, _) = call(app, Method::POST, "/", vec![3, 255, 0]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(service.generator().last_timestamp(), None);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_before_minting() {
        let service = service();
        let app = router(service.clone());
        let (status, _) = call(app, Method::POST, "/", vec![0xFF; MAX_BODY_LEN + 1]).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(service.generator().last_timestamp(), None);

        let (status, body) = call(router(service), Method::POST, "/", vec![1; MAX_BODY_LEN]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.len(), MAX_BODY_LEN * 8);
    }

    #[tokio::test]
    async fn other_methods_and_paths_are_not_found() {
        let (status, _) = call(app(), Method::GET, "/", vec![]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(app(), Method::PUT, "/", vec![1]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(app(), Method::POST, "/ids", vec![1]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn clock_regression_is_unavailable() {
        let app = router(IdService::new(BackwardGenerator));
        let (status, body) = call(app, Method::POST, "/", vec![1]).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let message = std::str::from_utf8(&body).unwrap();
        assert!(message.contains("clock moved backward"));
    }
}
