//! Command and response messages crossing the bridge.
//!
//! Messages are immutable once sent. Within one producer's sequence of sends
//! the service observes commands in send order, and responses come back in
//! the same relative order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A host-to-service command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Liveness probe; answered with [`Response::Pong`] carrying the same
    /// sequence number.
    Ping { seq: u64 },

    /// Graceful shutdown request; answered with [`Response::Stopped`], after
    /// which the service loop exits and closes the command channel.
    Stop,

    /// Free-form payload. The stock handler answers with
    /// [`Response::Unknown`] rather than failing silently.
    Raw(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping { seq } => write!(f, "ping_{seq}"),
            Command::Stop => write!(f, "stop"),
            Command::Raw(payload) => write!(f, "{payload}"),
        }
    }
}

/// A service-to-host response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Answer to [`Command::Ping`].
    Pong { seq: u64 },

    /// Final response of a service loop; nothing follows it.
    Stopped,

    /// The service did not recognize the command; `payload` echoes it back.
    Unknown { payload: String },

    /// A handler fault, reported instead of killing the loop.
    Error(String),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Pong { seq } => write!(f, "pong_{seq}"),
            Response::Stopped => write!(f, "stopped"),
            Response::Unknown { payload } => write!(f, "unknown: {payload}"),
            Response::Error(message) => write!(f, "error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_vocabulary() {
        assert_eq!(Command::Ping { seq: 3 }.to_string(), "ping_3");
        assert_eq!(Command::Stop.to_string(), "stop");
        assert_eq!(Response::Pong { seq: 3 }.to_string(), "pong_3");
        assert_eq!(Response::Stopped.to_string(), "stopped");
        assert_eq!(
            Response::Unknown {
                payload: "xyz".to_string()
            }
            .to_string(),
            "unknown: xyz"
        );
    }

    #[test]
    fn messages_round_trip_through_json() {
        let command = Command::Ping { seq: 7 };
        let encoded = serde_json::to_string(&command).expect("encode command");
        let decoded: Command = serde_json::from_str(&encoded).expect("decode command");
        assert_eq!(decoded, command);

        let response = Response::Error("handler exploded".to_string());
        let encoded = serde_json::to_string(&response).expect("encode response");
        let decoded: Response = serde_json::from_str(&encoded).expect("decode response");
        assert_eq!(decoded, response);
    }
}
