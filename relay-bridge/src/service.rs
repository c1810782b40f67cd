//! The service loop: a single background task that consumes commands,
//! produces responses, and terminates on `Stop`.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bridge::{CommandWait, ServiceEndpoint};
use crate::error::ServiceError;
use crate::message::{Command, Response};

/// Default bounded wait on the command channel. Short enough that a `Stop`
/// is observed promptly, long enough to avoid busy-spinning.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Handles one non-`Stop` command. The loop intercepts `Stop` itself, so a
/// handler never sees it. A returned error is reported to the host as
/// [`Response::Error`]; the loop keeps running.
pub trait CommandHandler: Send + 'static {
    fn handle(&mut self, command: Command) -> Result<Response, ServiceError>;
}

/// Stock handler: answers pings and echoes anything it does not recognize.
#[derive(Debug, Default)]
pub struct PingHandler;

impl CommandHandler for PingHandler {
    fn handle(&mut self, command: Command) -> Result<Response, ServiceError> {
        match command {
            Command::Ping { seq } => Ok(Response::Pong { seq }),
            Command::Raw(payload) => Ok(Response::Unknown { payload }),
            // Unreachable through the loop; answered anyway for direct use.
            Command::Stop => Ok(Response::Stopped),
        }
    }
}

/// Run the service loop until a `Stop` command arrives or every producer
/// hangs up. The final message pushed is always `Stopped`; after that the
/// endpoint is dropped, so later sends from the host fail fast.
pub async fn run<H: CommandHandler>(
    mut endpoint: ServiceEndpoint,
    mut handler: H,
    poll_timeout: Duration,
) {
    info!("service loop started");
    loop {
        match endpoint.next_command(poll_timeout).await {
            CommandWait::TimedOut => continue,
            CommandWait::Closed => {
                // All producers gone: nothing more can arrive, treat it as
                // an implicit stop.
                debug!("command channel closed, stopping service loop");
                let _ = endpoint.respond(Response::Stopped);
                break;
            }
            CommandWait::Command(Command::Stop) => {
                info!("stop command received, shutting down service loop");
                let _ = endpoint.respond(Response::Stopped);
                break;
            }
            CommandWait::Command(command) => {
                debug!(command = %command, "handling command");
                let response = match handler.handle(command) {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(error = %err, "command handler fault");
                        Response::Error(err.to_string())
                    }
                };
                if endpoint.respond(response).is_err() {
                    // Host dropped its bridge; no one is left to answer.
                    debug!("response channel closed, stopping service loop");
                    break;
                }
            }
        }
    }
    info!("service loop exited");
}

/// Handle to a spawned service thread.
#[derive(Debug)]
pub struct ServiceHandle {
    thread: thread::JoinHandle<()>,
}

impl ServiceHandle {
    /// Block until the service loop has exited. Call after `Stopped` has
    /// been observed, otherwise this waits for the loop to terminate on its
    /// own.
    pub fn join(self) -> Result<(), ServiceError> {
        self.thread.join().map_err(|_| ServiceError::Panicked)
    }

    /// Whether the service loop has already exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Spawn the service loop on a dedicated thread with its own current-thread
/// runtime, so hosts without an ambient async runtime can still drive the
/// bridge from their own event loop.
pub fn spawn<H: CommandHandler>(
    endpoint: ServiceEndpoint,
    handler: H,
    poll_timeout: Duration,
) -> Result<ServiceHandle, ServiceError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let thread = thread::Builder::new()
        .name("relay-service".to_string())
        .spawn(move || runtime.block_on(run(endpoint, handler, poll_timeout)))?;

    Ok(ServiceHandle { thread })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;
    use crate::error::BridgeError;

    const TEST_TIMEOUT: Duration = Duration::from_millis(25);

    /// Poll the bridge until a response shows up. Yields to the runtime so
    /// the in-process service task gets to run.
    async fn next_response(bridge: &mut Bridge) -> Response {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(response) = bridge.try_receive() {
                return response;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "no response before deadline"
            );
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    struct FlakyHandler;

    impl CommandHandler for FlakyHandler {
        fn handle(&mut self, command: Command) -> Result<Response, ServiceError> {
            match command {
                Command::Ping { seq } => Ok(Response::Pong { seq }),
                other => Err(ServiceError::Handler(format!("cannot handle {other}"))),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ping_yields_pong() {
        let (mut bridge, endpoint) = Bridge::channel();
        let service = tokio::spawn(run(endpoint, PingHandler, TEST_TIMEOUT));

        bridge.send(Command::Ping { seq: 1 }).expect("send ping");
        assert_eq!(next_response(&mut bridge).await, Response::Pong { seq: 1 });

        bridge.send(Command::Stop).expect("send stop");
        assert_eq!(next_response(&mut bridge).await, Response::Stopped);
        service.await.expect("service task");
    }

    #[tokio::test(start_paused = true)]
    async fn responses_preserve_single_producer_send_order() {
        let (mut bridge, endpoint) = Bridge::channel();
        let service = tokio::spawn(run(endpoint, PingHandler, TEST_TIMEOUT));

        bridge.send(Command::Ping { seq: 1 }).expect("send");
        bridge.send(Command::Ping { seq: 2 }).expect("send");
        bridge.send(Command::Stop).expect("send");

        assert_eq!(next_response(&mut bridge).await, Response::Pong { seq: 1 });
        assert_eq!(next_response(&mut bridge).await, Response::Pong { seq: 2 });
        assert_eq!(next_response(&mut bridge).await, Response::Stopped);
        service.await.expect("service task");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_terminates_loop_and_closes_command_channel() {
        let (mut bridge, endpoint) = Bridge::channel();
        let service = tokio::spawn(run(endpoint, PingHandler, TEST_TIMEOUT));

        bridge.send(Command::Stop).expect("send stop");
        assert_eq!(next_response(&mut bridge).await, Response::Stopped);
        service.await.expect("service task");

        // The endpoint is gone, so post-stop sends are rejected rather than
        // queued forever.
        let err = bridge.send(Command::Ping { seq: 99 }).unwrap_err();
        assert!(matches!(err, BridgeError::ChannelClosed("commands")));
        assert_eq!(bridge.try_receive(), None, "nothing follows stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_payload_is_echoed_not_fatal() {
        let (mut bridge, endpoint) = Bridge::channel();
        let service = tokio::spawn(run(endpoint, PingHandler, TEST_TIMEOUT));

        bridge.send(Command::Raw("xyz".to_string())).expect("send");
        assert_eq!(
            next_response(&mut bridge).await,
            Response::Unknown {
                payload: "xyz".to_string()
            }
        );

        // The loop must still be alive and answering.
        bridge.send(Command::Ping { seq: 5 }).expect("send");
        assert_eq!(next_response(&mut bridge).await, Response::Pong { seq: 5 });

        bridge.send(Command::Stop).expect("send");
        assert_eq!(next_response(&mut bridge).await, Response::Stopped);
        service.await.expect("service task");
    }

    #[tokio::test(start_paused = true)]
    async fn handler_fault_becomes_error_response() {
        let (mut bridge, endpoint) = Bridge::channel();
        let service = tokio::spawn(run(endpoint, FlakyHandler, TEST_TIMEOUT));

        bridge.send(Command::Raw("boom".to_string())).expect("send");
        match next_response(&mut bridge).await {
            Response::Error(message) => assert!(message.contains("boom")),
            other => panic!("expected error response, got {other:?}"),
        }

        // Fault must not have killed the loop.
        bridge.send(Command::Ping { seq: 1 }).expect("send");
        assert_eq!(next_response(&mut bridge).await, Response::Pong { seq: 1 });

        bridge.send(Command::Stop).expect("send");
        assert_eq!(next_response(&mut bridge).await, Response::Stopped);
        service.await.expect("service task");
    }

    #[tokio::test(start_paused = true)]
    async fn producer_hangup_is_an_implicit_stop() {
        let (bridge, endpoint) = Bridge::channel();
        let service = tokio::spawn(run(endpoint, PingHandler, TEST_TIMEOUT));

        drop(bridge);
        service.await.expect("service task must exit on hangup");
    }

    #[test]
    fn spawned_thread_answers_and_joins_cleanly() {
        let (mut bridge, endpoint) = Bridge::channel();
        let handle = spawn(endpoint, PingHandler, TEST_TIMEOUT).expect("spawn service");

        bridge.send(Command::Ping { seq: 1 }).expect("send ping");

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let pong = loop {
            if let Some(response) = bridge.try_receive() {
                break response;
            }
            assert!(std::time::Instant::now() < deadline, "no pong in time");
            thread::sleep(Duration::from_millis(2));
        };
        assert_eq!(pong, Response::Pong { seq: 1 });

        bridge.send(Command::Stop).expect("send stop");
        let stopped = loop {
            if let Some(response) = bridge.try_receive() {
                break response;
            }
            assert!(std::time::Instant::now() < deadline, "no stopped in time");
            thread::sleep(Duration::from_millis(2));
        };
        assert_eq!(stopped, Response::Stopped);

        handle.join().expect("join service thread");
    }
}
