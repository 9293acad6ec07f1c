//! Daemon wiring: load config, install the SIGTERM flag, bind the
//! socket, and hand both off to `server::Server` (§4.G, §6).

pub mod config;
pub mod server;
pub mod signals;

use std::fs;
use std::os::unix::net::UnixListener;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber writing to stdout. `-v`/`-vv` raise
/// the floor below whatever `RUST_LOG` already requests, matching the
/// teacher's `--verbose` counter semantics.
pub fn init_logging(verbose: u8) {
    let floor = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(floor));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn run(config_file: Option<String>, socket_override: Option<String>, verbose: u8) -> anyhow::Result<()> {
    init_logging(verbose);
    info!("starting broker daemon");

    let mut cfg = config::Config::default();
    if let Some(path) = config_file {
        let raw = fs::read_to_string(&path).context("reading config toml")?;
        cfg = toml::from_str(&raw).context("parsing config file")?;
    }
    if let Some(socket) = socket_override {
        cfg.socket = Some(socket);
    }

    let socket_path = cfg.socket_path().to_string();
    let _ = fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("binding to socket {}", socket_path))?;
    info!(socket = %socket_path, "listening");

    let shutdown = signals::install().context("installing signal handler")?;
    let server = server::Server::new(cfg, shutdown);

    let result = server.serve(listener);

    let _ = fs::remove_file(&socket_path);
    result
}
