//! DISCONNECT (§4.E, §8): removes the session from the registry and
//! tears it down. Idempotent modulo error — the first call succeeds,
//! every later call on the same key reports `"Invalid session
//! identifier."`, the one lookup-miss wording the spec spells out by
//! name outside of the GET-family table (see `handlers::with_record`).

use crate::netconf::NetconfError;
use crate::protocol::message::{Reply, Request};
use crate::registry::SessionRegistry;

pub fn handle(req: &Request, registry: &SessionRegistry) -> Reply {
    let session_key = match &req.session {
        Some(k) => k,
        None => return NetconfError::validation("Missing session parameter.").into_reply(),
    };

    match registry.remove(session_key) {
        Some(record) => {
            record.teardown();
            Reply::ok()
        }
        None => NetconfError::validation("Invalid session identifier.").into_reply(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;
    use crate::protocol::wire::REPLY_OK;

    #[test]
    fn second_disconnect_is_an_error() {
        let registry = SessionRegistry::new();
        let key = crate::registry::compute_session_key("h", "830", "1");
        registry
            .insert(key.clone(), std::sync::Arc::new(crate::registry::SessionRecord::new_empty_for_test()))
            .unwrap();

        let r = Req::decode(format!(r#"{{"type":11,"session":"{}"}}"#, key).as_bytes()).unwrap();
        match handle(&r, &registry) {
            Reply::Ok { kind, .. } => assert_eq!(kind, REPLY_OK),
            other => panic!("expected Ok, got {:?}", other),
        }

        match handle(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Invalid session identifier.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
