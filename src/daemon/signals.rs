//! SIGTERM -> graceful shutdown flag (§5, §6). Other signals are left
//! at their default disposition, matching the spec's "other signals
//! left default". The flag is polled by the accept loop and every
//! dispatch worker between blocking operations rather than acted on
//! asynchronously from within a signal handler.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use signal_hook::consts::SIGTERM;

pub fn install() -> anyhow::Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown)).context("registering SIGTERM handler")?;
    Ok(shutdown)
}
