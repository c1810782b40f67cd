//! Relay host — the tick-driven, non-blocking side of the bridge.
//!
//! Public API surface:
//! - [`poll`] — the poll-loop state machine driven one tick at a time
//! - [`driver`] — a tokio interval driver and run summary
//! - [`report`] — the host's status-line boundary

pub mod driver;
pub mod poll;
pub mod report;

pub use driver::{drive, PollSummary};
pub use poll::{PollConfig, PollLoop, PollState};
pub use report::{MemorySink, StatusSink, TracingSink};
