//! Client library for a blockchain RPC gateway.
//!
//! The gateway proxies read-only queries to the underlying chain and is
//! itself rate-limited; this crate handles request formatting, per-attempt
//! timeouts, failure classification, retry with backoff, and advisory
//! per-method rate-limit bookkeeping.

pub mod cli;
pub mod client;
pub mod config;
pub mod log;
pub mod registry;

pub use crate::client::{ClientError, ClientOptions, GatewayClient};
pub use crate::config::GatewayConfig;
pub use crate::registry::{Endpoint, MethodDescriptor, Network, Registry};
