//! The host poll loop as an explicit state machine.
//!
//! The host schedules the ticks (a UI timer, a frame callback, a tokio
//! interval via [`crate::driver`]); this module only defines what one tick
//! does. Every tick drains available responses first, then applies
//! state-specific policy. Nothing here ever blocks.

use relay_bridge::{Bridge, Command, Response};
use serde::Serialize;
use tracing::debug;

use crate::report::StatusSink;

/// Host-side lifecycle of one bridged session.
///
/// `Idle → Active` on the first tick, `Active → Finishing` once `Stop` has
/// been sent, `Finishing → Finished` when `Stopped` is observed or the grace
/// period runs out. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollState {
    Idle,
    Active,
    Finishing,
    Finished,
}

/// Tick-based policy for the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Send a `Ping` every this-many ticks. Zero disables pinging.
    pub ping_every: u64,
    /// Send `Stop` once this many ticks have elapsed.
    pub stop_after: u64,
    /// How many ticks to wait for `Stopped` after sending `Stop` before
    /// giving up. Bounds the host's wait on an uncooperative service, at
    /// the cost of leaking the background task if it truly never answers.
    pub grace_ticks: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        // One ping per second and a five second session at a 100ms tick.
        Self {
            ping_every: 10,
            stop_after: 50,
            grace_ticks: 20,
        }
    }
}

/// Counter-driven poll loop. Owns the tick counter and the host-visible
/// response history; shares nothing with the service but the bridge.
#[derive(Debug)]
pub struct PollLoop {
    config: PollConfig,
    state: PollState,
    ticks: u64,
    finishing_ticks: u64,
    pings_sent: u64,
    stopped_seen: bool,
    observed: Vec<Response>,
}

impl PollLoop {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            state: PollState::Idle,
            ticks: 0,
            finishing_ticks: 0,
            pings_sent: 0,
            stopped_seen: false,
            observed: Vec::new(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Ticks processed since start. Not incremented once `Finished`.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pings_sent(&self) -> u64 {
        self.pings_sent
    }

    /// Every response observed so far, in arrival order.
    pub fn observed(&self) -> &[Response] {
        &self.observed
    }

    pub fn stopped_observed(&self) -> bool {
        self.stopped_seen
    }

    /// Advance the loop by one host tick. Never blocks; returns the state
    /// after the tick so the scheduler knows when to stop ticking.
    pub fn on_tick(&mut self, bridge: &mut Bridge, sink: &mut dyn StatusSink) -> PollState {
        if self.state == PollState::Finished {
            return self.state;
        }
        if self.state == PollState::Idle {
            debug!("poll loop activated");
            self.state = PollState::Active;
        }
        self.ticks += 1;

        self.drain(bridge, sink);
        if self.stopped_seen {
            if self.state != PollState::Finished {
                sink.info("service stopped");
                self.state = PollState::Finished;
            }
            return self.state;
        }

        match self.state {
            PollState::Active => self.tick_active(bridge, sink),
            PollState::Finishing => self.tick_finishing(sink),
            PollState::Idle | PollState::Finished => {}
        }
        self.state
    }

    /// Drain zero-or-more responses that arrived since the last tick.
    fn drain(&mut self, bridge: &mut Bridge, sink: &mut dyn StatusSink) {
        while let Some(response) = bridge.try_receive() {
            sink.info(&format!("received: {response}"));
            self.stopped_seen |= matches!(response, Response::Stopped);
            self.observed.push(response);
        }
    }

    fn tick_active(&mut self, bridge: &mut Bridge, sink: &mut dyn StatusSink) {
        // Stop condition wins over the ping cadence on a shared tick.
        if self.ticks >= self.config.stop_after {
            match bridge.send(Command::Stop) {
                Ok(()) => {
                    sink.info("sent: stop");
                    self.state = PollState::Finishing;
                }
                Err(err) => {
                    sink.warn(&format!("stop not delivered: {err}"));
                    self.state = PollState::Finished;
                }
            }
            return;
        }

        if self.config.ping_every > 0 && self.ticks % self.config.ping_every == 0 {
            let seq = self.pings_sent + 1;
            match bridge.send(Command::Ping { seq }) {
                Ok(()) => {
                    self.pings_sent = seq;
                    sink.info(&format!("sent: ping_{seq}"));
                }
                Err(err) => {
                    sink.warn(&format!("ping not delivered: {err}"));
                    self.state = PollState::Finished;
                }
            }
        }
    }

    fn tick_finishing(&mut self, sink: &mut dyn StatusSink) {
        self.finishing_ticks += 1;
        if self.finishing_ticks > self.config.grace_ticks {
            sink.warn("no stopped response within grace period, giving up");
            self.state = PollState::Finished;
        }
    }
}
