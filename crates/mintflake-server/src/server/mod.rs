//! Server-side building blocks.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration and validation.
//! - [`service`] - The transport-agnostic protocol: auth handshake and the
//!   request loop.
//! - [`transport`] - Accept loops for TCP and Unix sockets, and the HTTP
//!   binding.
//! - [`telemetry`] - `tracing` subscriber setup.

pub mod config;
pub mod service;
pub mod telemetry;
pub mod transport;
