//! Transports that feed byte streams to [`IdService`].
//!
//! - [`stream`] - accept loop for persistent duplex connections (TCP or Unix
//!   socket), one task per connection.
//! - [`http`] - the `POST /` binding, one request per exchange.
//!
//! [`IdService`]: crate::server::service::handler::IdService

pub mod http;
pub mod stream;
