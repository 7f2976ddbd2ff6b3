#![doc = include_str!("../README.md")]

pub mod client;
mod common;
pub mod server;

pub use common::*;
pub use common::error::{Error, Result};
// Public re-export so downstream crates can reach the allocator through
// `mintflake_server::mintflake`.
pub use mintflake;
