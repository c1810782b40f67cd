//! Relay bridge — non-blocking message passing between a polling host and a
//! background service.
//!
//! Public API surface:
//! - [`message`] — command/response types crossing the bridge
//! - [`bridge`] — the channel pair and the host-side façade
//! - [`service`] — the service loop, handler trait, and spawn helper
//! - [`error`] — [`BridgeError`], [`ServiceError`]

pub mod bridge;
pub mod error;
pub mod message;
pub mod service;

pub use bridge::{Bridge, CommandSender, CommandWait, ServiceEndpoint};
pub use error::{BridgeError, ServiceError};
pub use message::{Command, Response};
pub use service::{run, spawn, CommandHandler, PingHandler, ServiceHandle, DEFAULT_POLL_TIMEOUT};
