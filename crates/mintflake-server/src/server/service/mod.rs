//! The binary ID protocol, independent of any transport.
//!
//! - [`auth`] - one-shot token handshake for connection-oriented transports.
//! - [`handler`] - the request loop and [`IdService`](handler::IdService).

pub mod auth;
pub mod handler;
