//! `relay check` — scripted bridge checks, one PASS/FAIL line per phase.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use relay_bridge::{spawn, Bridge, Command, PingHandler, Response, DEFAULT_POLL_TIMEOUT};
use relay_host::{drive, MemorySink, PollConfig, PollLoop};

/// How long a phase waits for any single response before failing.
const RESPONSE_DEADLINE: Duration = Duration::from_secs(2);

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Tick period for the poll-loop phase, in milliseconds.
    #[arg(long, default_value_t = 10)]
    pub period_ms: u64,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let phases: Vec<(&str, fn(&CheckArgs) -> Result<()>)> = vec![
            ("ping/pong round trip", check_ping_pong),
            ("graceful stop", check_graceful_stop),
            ("unknown payload echo", check_unknown_payload),
            ("modal poll loop", check_poll_loop),
        ];

        let total = phases.len();
        let mut failed = 0usize;
        for (name, phase) in phases {
            match phase(&self) {
                Ok(()) => println!("{} {name}", "PASS".green().bold()),
                Err(err) => {
                    failed += 1;
                    println!("{} {name}: {err:#}", "FAIL".red().bold());
                }
            }
        }

        if failed > 0 {
            bail!("{failed} of {total} checks failed");
        }
        println!("{} all {total} checks passed", "SUCCESS".green().bold());
        Ok(())
    }
}

/// Poll the bridge until a response shows up or the deadline passes.
fn wait_for_response(bridge: &mut Bridge) -> Result<Response> {
    let started = Instant::now();
    loop {
        if let Some(response) = bridge.try_receive() {
            return Ok(response);
        }
        if started.elapsed() > RESPONSE_DEADLINE {
            bail!("no response within {RESPONSE_DEADLINE:?}");
        }
        thread::sleep(Duration::from_millis(5));
    }
}

fn check_ping_pong(_args: &CheckArgs) -> Result<()> {
    let (mut bridge, endpoint) = Bridge::channel();
    let handle = spawn(endpoint, PingHandler, DEFAULT_POLL_TIMEOUT).context("spawn service")?;

    bridge.send(Command::Ping { seq: 1 }).context("send ping")?;
    let response = wait_for_response(&mut bridge)?;
    if response != (Response::Pong { seq: 1 }) {
        bail!("expected pong_1, got {response}");
    }

    bridge.send(Command::Stop).context("send stop")?;
    wait_for_response(&mut bridge)?;
    handle.join().context("join service thread")?;
    Ok(())
}

fn check_graceful_stop(_args: &CheckArgs) -> Result<()> {
    let (mut bridge, endpoint) = Bridge::channel();
    let handle = spawn(endpoint, PingHandler, DEFAULT_POLL_TIMEOUT).context("spawn service")?;

    bridge.send(Command::Stop).context("send stop")?;
    let response = wait_for_response(&mut bridge)?;
    if response != Response::Stopped {
        bail!("expected stopped, got {response}");
    }

    handle.join().context("join service thread")?;

    // The command channel must be closed now; post-stop sends fail fast.
    if bridge.send(Command::Ping { seq: 99 }).is_ok() {
        bail!("send after stop should be rejected");
    }
    if let Some(extra) = bridge.try_receive() {
        bail!("unexpected response after stopped: {extra}");
    }
    Ok(())
}

fn check_unknown_payload(_args: &CheckArgs) -> Result<()> {
    let (mut bridge, endpoint) = Bridge::channel();
    let handle = spawn(endpoint, PingHandler, DEFAULT_POLL_TIMEOUT).context("spawn service")?;

    bridge
        .send(Command::Raw("xyz".to_string()))
        .context("send raw payload")?;
    let response = wait_for_response(&mut bridge)?;
    match response {
        Response::Unknown { ref payload } if payload == "xyz" => {}
        other => bail!("expected unknown echo of 'xyz', got {other}"),
    }

    bridge.send(Command::Stop).context("send stop")?;
    wait_for_response(&mut bridge)?;
    handle.join().context("join service thread")?;
    Ok(())
}

fn check_poll_loop(args: &CheckArgs) -> Result<()> {
    let (mut bridge, endpoint) = Bridge::channel();
    let handle = spawn(endpoint, PingHandler, DEFAULT_POLL_TIMEOUT).context("spawn service")?;

    let mut poll = PollLoop::new(PollConfig::default());
    let mut sink = MemorySink::default();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("build driver runtime")?;
    let summary = runtime.block_on(drive(
        &mut bridge,
        &mut poll,
        &mut sink,
        Duration::from_millis(args.period_ms),
    ));

    if !summary.stopped_observed {
        bail!("service did not stop within the grace period");
    }
    if summary.pongs_received != summary.pings_sent {
        bail!(
            "expected {} pongs, observed {}",
            summary.pings_sent,
            summary.pongs_received
        );
    }

    // Responses must arrive in send order: pong_1..pong_n, then stopped.
    let expected: Vec<Response> = (1..=summary.pings_sent)
        .map(|seq| Response::Pong { seq })
        .chain(std::iter::once(Response::Stopped))
        .collect();
    if poll.observed() != expected.as_slice() {
        bail!("out-of-order responses: {:?}", poll.observed());
    }

    handle.join().context("join service thread")?;
    Ok(())
}
