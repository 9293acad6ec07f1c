//! LOCK / UNLOCK (§4.E): both require only a valid `target`.

use crate::netconf::rpc;
use crate::netconf::NetconfError;
use crate::protocol::message::{Reply, Request};
use crate::protocol::wire::Datastore;
use crate::registry::SessionRegistry;

use super::send_rpc;

fn target(req: &Request) -> Result<Datastore, NetconfError> {
    req.field_str("target")
        .and_then(Datastore::parse)
        .ok_or_else(|| NetconfError::validation("Invalid target repository type requested."))
}

pub fn lock(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| rpc::build_lock(target(req)?))
}

pub fn unlock(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| rpc::build_unlock(target(req)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    #[test]
    fn lock_rejects_missing_target() {
        let r = Req::decode(br#"{"type":8,"session":"K"}"#).unwrap();
        let registry = SessionRegistry::new();
        match lock(&r, &registry) {
            Reply::Error(e) => {
                assert_eq!(e.error_message.as_deref(), Some("Invalid target repository type requested."))
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
