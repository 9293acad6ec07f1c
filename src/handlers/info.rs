//! INFO (§4.E): returns the session's cached `hello` object verbatim;
//! ERROR if the key is unknown. Does not touch `last_activity` since
//! the cached value never changes underneath a read.

use crate::protocol::message::{Reply, Request};
use crate::registry::SessionRegistry;

use super::with_record;

pub fn handle(req: &Request, registry: &SessionRegistry) -> Reply {
    let session_key = match &req.session {
        Some(k) => k.clone(),
        None => return crate::netconf::NetconfError::validation("Missing session parameter.").into_reply(),
    };

    with_record(registry, &session_key, |record| {
        let state = record.state.lock().unwrap();
        match &state.hello {
            Some(hello) => Reply::raw(serde_json::to_value(hello).expect("Hello always serializes")),
            None => crate::netconf::NetconfError::internal("session has no hello cached").into_reply(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    #[test]
    fn unknown_session_is_an_error() {
        let r = Req::decode(br#"{"type":12,"session":"deadbeef"}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Unknown session to process.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
