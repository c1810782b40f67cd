//! Timer-driven poll-loop runner for hosts that live on a tokio runtime.
//!
//! Hosts with their own scheduler (a UI timer callback) call
//! [`PollLoop::on_tick`] directly; this driver covers the CLI and test case
//! of owning the timer ourselves.

use std::time::Duration;

use relay_bridge::{Bridge, Response};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::poll::{PollLoop, PollState};
use crate::report::StatusSink;

/// Final accounting for one driven session.
#[derive(Debug, Clone, Serialize)]
pub struct PollSummary {
    pub ticks: u64,
    pub pings_sent: u64,
    pub pongs_received: u64,
    pub stopped_observed: bool,
}

/// Tick `poll` against `bridge` on a fixed period until it reaches
/// `Finished`, then summarize the session.
pub async fn drive(
    bridge: &mut Bridge,
    poll: &mut PollLoop,
    sink: &mut dyn StatusSink,
    period: Duration,
) -> PollSummary {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the first immediate tick

    loop {
        interval.tick().await;
        if poll.on_tick(bridge, sink) == PollState::Finished {
            break;
        }
    }

    let pongs_received = poll
        .observed()
        .iter()
        .filter(|response| matches!(response, Response::Pong { .. }))
        .count() as u64;

    PollSummary {
        ticks: poll.ticks(),
        pings_sent: poll.pings_sent(),
        pongs_received,
        stopped_observed: poll.stopped_observed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::PollConfig;
    use crate::report::MemorySink;
    use relay_bridge::{run, Bridge, PingHandler};

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn driven_session_completes_with_clean_summary() {
        let (mut bridge, endpoint) = Bridge::channel();
        let service = tokio::spawn(run(endpoint, PingHandler, Duration::from_millis(25)));

        let mut poll = PollLoop::new(PollConfig::default());
        let mut sink = MemorySink::default();
        let summary = drive(
            &mut bridge,
            &mut poll,
            &mut sink,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(summary.pings_sent, 4);
        assert_eq!(summary.pongs_received, 4);
        assert!(summary.stopped_observed, "service must stop cleanly");
        assert!(summary.ticks >= 50, "stop is only sent at the stop tick");

        service.await.expect("service task");
        assert!(sink.contains("sent: stop"));
        assert!(sink.contains("received: stopped"));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn driver_gives_up_after_grace_when_service_never_answers() {
        // No service at all: the endpoint is parked so sends succeed but
        // nothing ever responds.
        let (mut bridge, _endpoint) = Bridge::channel();

        let mut poll = PollLoop::new(PollConfig {
            ping_every: 0,
            stop_after: 2,
            grace_ticks: 3,
        });
        let mut sink = MemorySink::default();
        let summary = drive(
            &mut bridge,
            &mut poll,
            &mut sink,
            Duration::from_millis(10),
        )
        .await;

        assert!(!summary.stopped_observed);
        assert_eq!(summary.pongs_received, 0);
        assert!(sink.contains("grace period"));
    }

    #[test]
    fn summary_serializes_for_host_reporting() {
        let summary = PollSummary {
            ticks: 52,
            pings_sent: 4,
            pongs_received: 4,
            stopped_observed: true,
        };
        let encoded = serde_json::to_string(&summary).expect("encode summary");
        assert!(encoded.contains("\"stopped_observed\":true"));
    }
}
