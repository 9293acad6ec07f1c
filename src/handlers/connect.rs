use std::sync::Arc;

use tracing::info;

use crate::consts::DEFAULT_NETCONF_PORT;
use crate::netconf::{ConnectParams, HostKeyPolicy, NetconfError, NetconfSession};
use crate::protocol::message::{Reply, Request};
use crate::registry::{compute_session_key, Hello, SessionRecord, SessionRegistry};

pub fn handle(
    req: &Request,
    registry: &SessionRegistry,
    host_key_policy: &dyn HostKeyPolicy,
) -> Reply {
    match try_connect(req, registry, host_key_policy) {
        Ok(session_key) => Reply::ok_with_session(session_key),
        Err(e) => e.into_reply(),
    }
}

fn try_connect(
    req: &Request,
    registry: &SessionRegistry,
    host_key_policy: &dyn HostKeyPolicy,
) -> Result<String, NetconfError> {
    let host = req.field_str("host").ok_or_else(|| NetconfError::validation("Missing session parameter."))?;
    let user = req.field_str("user").ok_or_else(|| NetconfError::validation("Missing session parameter."))?;
    let port = req.field_str("port").unwrap_or(DEFAULT_NETCONF_PORT);
    let pass = req.field_str("pass");

    let params = ConnectParams { host, port, user, pass };
    let mut nc = NetconfSession::connect(&params, host_key_policy)?;

    let key = compute_session_key(host, port, &nc.device_session_id);
    let hello = Hello {
        sid: nc.device_session_id.clone(),
        version: nc.version.as_str().to_string(),
        host: host.to_string(),
        port: port.to_string(),
        user: user.to_string(),
        capabilities: nc.capabilities.clone(),
    };

    let record = Arc::new(SessionRecord::new(nc, hello));
    match registry.insert(key.clone(), record.clone()) {
        Ok(()) => {
            info!(session = %key, host, "connected new netconf session");
            Ok(key)
        }
        Err(_) => {
            // the key collided with an existing live session; tear
            // down the one we just opened rather than leaking it.
            record.teardown();
            Err(NetconfError::validation("Duplicate session"))
        }
    }
}
