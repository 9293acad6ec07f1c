//! Broker main (§4.G): accept loop, worker spawn/reap, idle sweep,
//! graceful shutdown join.

use std::os::unix::io::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use nix::poll::{poll, PollFd, PollFlags};
use tracing::{error, info, warn};

use crate::consts;
use crate::daemon::config::Config;
use crate::framing::{self, FrameError};
use crate::handlers;
use crate::netconf::{AllowAnyHostKey, HostKeyPolicy};
use crate::protocol::message::{Reply, Request};
use crate::protocol::wire::MsgType;
use crate::registry::SessionRegistry;

pub struct Server {
    config: Config,
    registry: Arc<SessionRegistry>,
    host_key_policy: Arc<dyn HostKeyPolicy>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    pub fn new(config: Config, shutdown: Arc<AtomicBool>) -> Server {
        Server {
            config,
            registry: Arc::new(SessionRegistry::new()),
            host_key_policy: Arc::new(AllowAnyHostKey),
            shutdown,
        }
    }

    /// Runs the accept loop until the shutdown flag is set, then joins
    /// outstanding workers (bounded by the configured deadline) and
    /// tears down every remaining session before returning.
    pub fn serve(&self, listener: UnixListener) -> anyhow::Result<()> {
        listener.set_nonblocking(true)?;

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        let mut last_sweep = Instant::now();
        let activity_check_interval = self.config.activity_check_interval();
        let activity_timeout = self.config.activity_timeout();

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown flag set, leaving accept loop");
                break;
            }

            match listener.accept() {
                Ok((stream, _addr)) => {
                    info!("accepted new client connection");
                    let registry = Arc::clone(&self.registry);
                    let host_key_policy = Arc::clone(&self.host_key_policy);
                    let shutdown = Arc::clone(&self.shutdown);
                    workers.push(thread::spawn(move || {
                        if let Err(e) = handle_conn(stream, &registry, host_key_policy.as_ref(), &shutdown) {
                            error!("connection worker exited with error: {:?}", e);
                        }
                    }));
                }
                Err(e) if e.raw_os_error() == Some(libc::EAGAIN) => {
                    thread::sleep(consts::ACCEPT_EAGAIN_SLEEP);
                }
                Err(e) if e.raw_os_error() == Some(libc::EINTR) => {}
                Err(e) => {
                    error!("fatal accept error: {:?}", e);
                    return Err(e.into());
                }
            }

            // opportunistic, non-blocking reap of finished workers so
            // the table doesn't grow without bound across a long run.
            workers.retain(|w| !w.is_finished());

            if last_sweep.elapsed() > activity_check_interval {
                self.sweep_idle(activity_timeout);
                last_sweep = Instant::now();
            }
        }

        self.join_workers(workers, self.config.shutdown_join_deadline());
        self.close_all_sessions();
        Ok(())
    }

    fn sweep_idle(&self, timeout: std::time::Duration) {
        let reaped = self.registry.sweep_idle(timeout);
        if !reaped.is_empty() {
            info!(count = reaped.len(), "idle sweep reaping sessions");
        }
        for record in &reaped {
            record.teardown();
        }
    }

    fn close_all_sessions(&self) {
        let all = self.registry.drain_all();
        info!(count = all.len(), "closing all sessions on shutdown");
        for record in &all {
            record.teardown();
        }
    }

    fn join_workers(&self, workers: Vec<JoinHandle<()>>, deadline: std::time::Duration) {
        let start = Instant::now();
        for worker in workers {
            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() || !wait_for_finish(&worker, remaining) {
                warn!("abandoning a worker that did not finish within the shutdown deadline");
                continue;
            }
            let _ = worker.join();
        }
    }
}

fn wait_for_finish(worker: &JoinHandle<()>, deadline: std::time::Duration) -> bool {
    let start = Instant::now();
    while !worker.is_finished() {
        if start.elapsed() >= deadline {
            return false;
        }
        thread::sleep(consts::JOIN_POLL_DURATION);
    }
    true
}

/// Per-client dispatch loop (§4.F): poll for readability with a 1s
/// timeout rather than a read-timeout on the stream itself, so a
/// timeout can never land mid-frame and desync the chunked codec.
fn handle_conn(
    mut stream: UnixStream,
    registry: &SessionRegistry,
    host_key_policy: &dyn HostKeyPolicy,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("shutdown flag observed, closing client worker");
            return Ok(());
        }

        let mut fds = [PollFd::new(stream.as_raw_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, consts::DISPATCH_POLL_TIMEOUT.as_millis() as i32) {
            Ok(0) => continue, // timed out; loop back around to recheck the shutdown flag
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
                if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
                    return Ok(());
                }
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }

        let frame = match framing::decode(&mut stream) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(()), // peer closed cleanly before a new frame started
            Err(FrameError::Eof) => return Ok(()),
            Err(e) => {
                info!("closing connection on frame error: {}", e);
                return Ok(());
            }
        };

        let req = match Request::decode(&frame) {
            Ok(r) => r,
            Err(e) => {
                warn!("dropping malformed request: {}", e);
                continue;
            }
        };

        // every request but CONNECT names the session it operates on;
        // the dispatch loop rejects a missing one up front rather than
        // pushing that check into every handler (§4.F step 4).
        if req.msg_type != MsgType::Connect && req.session.is_none() {
            write_reply(&mut stream, &Reply::error("Missing session specification"))?;
            continue;
        }

        let reply = handlers::dispatch(&req, registry, host_key_policy);
        write_reply(&mut stream, &reply)?;
    }
}

fn write_reply(stream: &mut UnixStream, reply: &Reply) -> anyhow::Result<()> {
    framing::encode(stream, &reply.to_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};

    use super::*;
    use crate::registry::{compute_session_key, Hello, SessionRecord};

    fn test_config() -> Config {
        Config {
            activity_check_interval_secs: Some(1),
            shutdown_join_deadline_secs: Some(1),
            ..Config::default()
        }
    }

    fn roundtrip(stream: &mut UnixStream, request: Value) -> Value {
        framing::encode(stream, serde_json::to_vec(&request).unwrap().as_slice()).unwrap();
        let bytes = framing::decode(stream).unwrap().expect("server closed before replying");
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Drives the real socket: framing, JSON decode, dispatch, framing
    /// back out, against a broker whose registry is seeded with a fake
    /// connected session standing in for a NETCONF device (its `nc` is
    /// `None`, so it can't actually send an RPC, but it is a perfectly
    /// good stand-in for every handler exercised below).
    #[test]
    fn dispatch_loop_drives_the_wire_protocol_against_a_fake_backend() {
        let tmp_dir = tempfile::Builder::new().prefix("mod-netconf-broker-test").tempdir().unwrap();
        let sock_path = tmp_dir.path().join("broker.sock");

        let shutdown = Arc::new(AtomicBool::new(false));
        let server = Server::new(test_config(), Arc::clone(&shutdown));

        let key = compute_session_key("10.0.0.1", "830", "1");
        let hello = Hello {
            sid: "1".to_string(),
            version: "1.1".to_string(),
            host: "10.0.0.1".to_string(),
            port: "830".to_string(),
            user: "u".to_string(),
            capabilities: vec!["urn:ietf:params:netconf:base:1.1".to_string()],
        };
        server.registry.insert(key.clone(), Arc::new(SessionRecord::new_with_hello_for_test(hello))).unwrap();

        let listener = UnixListener::bind(&sock_path).unwrap();
        let join_handle = thread::spawn(move || server.serve(listener));

        // give the accept loop a moment to start polling.
        thread::sleep(Duration::from_millis(50));
        let mut client = UnixStream::connect(&sock_path).unwrap();

        let missing_session = roundtrip(&mut client, json!({"type": MsgType::Get as u8}));
        assert_eq!(missing_session["error-message"], "Missing session specification");

        let unknown_session = roundtrip(&mut client, json!({"type": MsgType::Get as u8, "session": "deadbeef"}));
        assert_eq!(unknown_session["error-message"], "Unknown session to process.");

        let info = roundtrip(&mut client, json!({"type": MsgType::Info as u8, "session": key}));
        assert_eq!(info["sid"], "1");
        assert_eq!(info["host"], "10.0.0.1");

        let disconnect = roundtrip(&mut client, json!({"type": MsgType::Disconnect as u8, "session": key}));
        assert_eq!(disconnect["type"], 0);
        assert!(disconnect.get("error-message").is_none());

        let second_disconnect = roundtrip(&mut client, json!({"type": MsgType::Disconnect as u8, "session": key}));
        assert_eq!(second_disconnect["error-message"], "Invalid session identifier.");

        drop(client);
        shutdown.store(true, Ordering::SeqCst);
        join_handle.join().unwrap().unwrap();
    }

    /// §8: "Shutdown join honours the 5s deadline even with a hung
    /// worker" — here exercised directly against `join_workers` with a
    /// short deadline instead of waiting out the real constant.
    #[test]
    fn join_workers_abandons_a_hung_worker_at_the_deadline() {
        let server = Server::new(test_config(), Arc::new(AtomicBool::new(false)));
        let hung = thread::spawn(|| thread::sleep(Duration::from_secs(5)));

        let deadline = Duration::from_millis(150);
        let start = Instant::now();
        server.join_workers(vec![hung], deadline);
        let elapsed = start.elapsed();

        assert!(elapsed < deadline + Duration::from_millis(400), "join_workers should bail out at the deadline, took {:?}", elapsed);
    }
}
