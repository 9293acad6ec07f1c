//! RELOADHELLO (§4.E, §9): opens a transient secondary channel on the
//! existing SSH session, exchanges a fresh hello on it, and replaces
//! the cached `hello` wholesale with the result before closing the
//! channel. Rust drops the old `Hello` value on reassignment, so the
//! reference design's leak has no analog here; only the replace-not-
//! merge behavior needs to be preserved.

use crate::netconf::NetconfError;
use crate::protocol::message::{Reply, Request};
use crate::registry::{Hello, SessionRegistry};

use super::with_record;

pub fn handle(req: &Request, registry: &SessionRegistry) -> Reply {
    let session_key = match &req.session {
        Some(k) => k.clone(),
        None => return NetconfError::validation("Missing session parameter.").into_reply(),
    };

    with_record(registry, &session_key, |record| {
        let mut state = record.state.lock().unwrap();
        let (host, port, user) = match &state.hello {
            Some(h) => (h.host.clone(), h.port.clone(), h.user.clone()),
            None => return NetconfError::validation("Invalid session identifier.").into_reply(),
        };
        let nc = match state.nc.as_mut() {
            Some(nc) => nc,
            None => return NetconfError::validation("Invalid session identifier.").into_reply(),
        };

        let (mut channel, fresh) = match nc.open_secondary_channel() {
            Ok(pair) => pair,
            Err(e) => return e.into_reply(),
        };
        let _ = channel.close();

        state.hello = Some(Hello {
            sid: fresh.session_id,
            version: fresh.version.as_str().to_string(),
            host,
            port,
            user,
            capabilities: fresh.capabilities,
        });
        drop(state);
        record.touch();
        Reply::ok()
    })
}
