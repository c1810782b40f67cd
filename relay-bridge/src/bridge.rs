//! The bridge handle pair: a non-blocking host façade and the service-side
//! endpoint, connected by two unbounded channels.
//!
//! Construction is explicit — [`Bridge::channel`] builds both halves, and the
//! caller hands the [`ServiceEndpoint`] to the spawning code and keeps the
//! [`Bridge`] for the poll loop. There is no ambient or process-wide state.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::BridgeError;
use crate::message::{Command, Response};

/// Host-side façade. Every operation returns immediately; the host's tick
/// budget is never spent waiting on the service.
#[derive(Debug)]
pub struct Bridge {
    commands: mpsc::UnboundedSender<Command>,
    responses: mpsc::UnboundedReceiver<Response>,
}

/// A cloneable producer handle for additional command sources.
#[derive(Debug, Clone)]
pub struct CommandSender {
    inner: mpsc::UnboundedSender<Command>,
}

/// Service-side endpoint: the single consumer of commands and the producer
/// of responses.
#[derive(Debug)]
pub struct ServiceEndpoint {
    commands: mpsc::UnboundedReceiver<Command>,
    responses: mpsc::UnboundedSender<Response>,
}

/// Outcome of a bounded wait on the command channel.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandWait {
    /// A command arrived.
    Command(Command),
    /// Nothing arrived within the timeout; poll again. Not an error.
    TimedOut,
    /// Every producer hung up; no further commands can arrive.
    Closed,
}

impl Bridge {
    /// Build a connected bridge pair.
    pub fn channel() -> (Bridge, ServiceEndpoint) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let bridge = Bridge {
            commands: command_tx,
            responses: response_rx,
        };
        let endpoint = ServiceEndpoint {
            commands: command_rx,
            responses: response_tx,
        };
        (bridge, endpoint)
    }

    /// Enqueue a command without blocking. Fails only once the service has
    /// stopped and dropped its end of the command channel.
    pub fn send(&self, command: Command) -> Result<(), BridgeError> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::ChannelClosed("commands"))
    }

    /// Drain one response if present. Returns immediately either way.
    pub fn try_receive(&mut self) -> Option<Response> {
        match self.responses.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Clone a producer handle for another command source.
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            inner: self.commands.clone(),
        }
    }
}

impl CommandSender {
    /// Enqueue a command without blocking; same contract as [`Bridge::send`].
    pub fn send(&self, command: Command) -> Result<(), BridgeError> {
        self.inner
            .send(command)
            .map_err(|_| BridgeError::ChannelClosed("commands"))
    }
}

impl ServiceEndpoint {
    /// Wait up to `timeout` for the next command. This is the only blocking
    /// point in the whole bridge; the timeout bounds stop latency without
    /// busy-spinning.
    pub async fn next_command(&mut self, timeout: Duration) -> CommandWait {
        match tokio::time::timeout(timeout, self.commands.recv()).await {
            Ok(Some(command)) => CommandWait::Command(command),
            Ok(None) => CommandWait::Closed,
            Err(_) => CommandWait::TimedOut,
        }
    }

    /// Non-blocking pop of the next command, if one is already queued.
    pub fn try_next_command(&mut self) -> Option<Command> {
        self.commands.try_recv().ok()
    }

    /// Push a response to the host. Fails once the host has dropped its
    /// [`Bridge`].
    pub fn respond(&self, response: Response) -> Result<(), BridgeError> {
        self.responses
            .send(response)
            .map_err(|_| BridgeError::ChannelClosed("responses"))
    }
}
