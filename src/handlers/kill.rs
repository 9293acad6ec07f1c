//! KILL (§4.E): requires `session-id`, the NETCONF session-id of the
//! (possibly different) device session to terminate, sent as a
//! `kill-session` RPC over the connection named by `session`.

use crate::netconf::rpc;
use crate::netconf::NetconfError;
use crate::protocol::message::{Reply, Request};
use crate::registry::SessionRegistry;

use super::send_rpc;

pub fn handle(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| {
        let session_id = req
            .field_str("session-id")
            .ok_or_else(|| NetconfError::validation("Missing session-id parameter."))?;
        Ok(rpc::build_kill_session(session_id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    #[test]
    fn rejects_missing_session_id() {
        let r = Req::decode(br#"{"type":10,"session":"K"}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => {
                assert_eq!(e.error_message.as_deref(), Some("Missing session-id parameter."))
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
