//! `relay run` — drive a real timer-based poll loop against a live service.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use relay_bridge::{spawn, Bridge, PingHandler, DEFAULT_POLL_TIMEOUT};
use relay_host::{drive, PollConfig, PollLoop, StatusSink};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Tick period in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub period_ms: u64,

    /// Send a ping every N ticks (0 disables pinging).
    #[arg(long, default_value_t = 10)]
    pub ping_every: u64,

    /// Send stop after N ticks.
    #[arg(long, default_value_t = 50)]
    pub stop_after: u64,

    /// Grace period in ticks to wait for the stopped response.
    #[arg(long, default_value_t = 20)]
    pub grace: u64,

    /// Print the session summary as pretty JSON.
    #[arg(long)]
    pub json: bool,
}

/// Prints poll-loop status lines as they happen.
struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn info(&mut self, line: &str) {
        println!("{line}");
    }

    fn warn(&mut self, line: &str) {
        eprintln!("{} {line}", "warning:".yellow().bold());
    }
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let (mut bridge, endpoint) = Bridge::channel();
        let handle =
            spawn(endpoint, PingHandler, DEFAULT_POLL_TIMEOUT).context("spawn service")?;

        let mut poll = PollLoop::new(PollConfig {
            ping_every: self.ping_every,
            stop_after: self.stop_after,
            grace_ticks: self.grace,
        });
        let mut sink = ConsoleSink;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("build driver runtime")?;
        let summary = runtime.block_on(drive(
            &mut bridge,
            &mut poll,
            &mut sink,
            Duration::from_millis(self.period_ms),
        ));

        if summary.stopped_observed {
            handle.join().context("join service thread")?;
        } else {
            // The grace period expired; the service thread is left behind
            // rather than blocking the host on join.
            eprintln!(
                "{} service never reported stopped; leaking its thread",
                "warning:".yellow().bold()
            );
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("encode summary")?
            );
        } else {
            println!(
                "session finished: {} ticks, {} pings, {} pongs, stopped={}",
                summary.ticks, summary.pings_sent, summary.pongs_received, summary.stopped_observed
            );
        }
        Ok(())
    }
}
