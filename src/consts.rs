use std::time;

/// How long the accept loop sleeps after an EAGAIN before polling again.
pub const ACCEPT_EAGAIN_SLEEP: time::Duration = time::Duration::from_millis(100);

/// How often the broker main loop checks whether it is time to run
/// the idle-session sweep.
pub const ACTIVITY_CHECK_INTERVAL: time::Duration = time::Duration::from_secs(10);

/// Records whose last_activity is older than this are reaped by the sweep.
pub const ACTIVITY_TIMEOUT: time::Duration = time::Duration::from_secs(3600);

/// How long the poll() in a worker's dispatch loop waits before
/// looping back around to check the shutdown flag.
pub const DISPATCH_POLL_TIMEOUT: time::Duration = time::Duration::from_secs(1);

/// Bound on how long the broker main loop waits for worker threads to
/// join during a graceful shutdown before giving up on them.
pub const SHUTDOWN_JOIN_DEADLINE: time::Duration = time::Duration::from_secs(5);

/// How long join_timeout polls in between checks while waiting out the
/// shutdown deadline.
pub const JOIN_POLL_DURATION: time::Duration = time::Duration::from_millis(100);

/// Capacity of the per-session bounded notification FIFO (drop-oldest).
pub const NOTIFICATION_QUEUE_CAPACITY: usize = 10;

/// TCP connect + SSH handshake timeout when establishing a new session.
pub const SSH_HANDSHAKE_TIMEOUT: time::Duration = time::Duration::from_secs(10);

pub const BUF_SIZE: usize = 1024 * 16;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/mod_netconf.sock";

pub const DEFAULT_NETCONF_PORT: &str = "830";
