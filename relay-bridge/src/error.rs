//! Error types for relay-bridge.

use thiserror::Error;

/// Errors surfaced across the host-side façade.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The consumer on the far side of the channel is gone. For the command
    /// channel this means the service already processed `Stop` (or exited);
    /// post-stop sends fail fast instead of queueing forever.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

/// Errors from the service loop and its command handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A handler failed while processing a command. Reported back to the
    /// host as [`Response::Error`](crate::Response::Error); never fatal to
    /// the loop.
    #[error("command handler failed: {0}")]
    Handler(String),

    /// Could not build the dedicated runtime or spawn the service thread.
    #[error("failed to start service: {0}")]
    Spawn(#[from] std::io::Error),

    /// The service thread panicked before it could be joined.
    #[error("service thread panicked")]
    Panicked,
}
