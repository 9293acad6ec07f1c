//! DELETECONFIG (§4.E): requires a valid `target`; `url` is required
//! when `target` is `url`.

use crate::netconf::rpc;
use crate::netconf::NetconfError;
use crate::protocol::message::{Reply, Request};
use crate::protocol::wire::Datastore;
use crate::registry::SessionRegistry;

use super::send_rpc;

pub fn handle(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| {
        let target = req
            .field_str("target")
            .and_then(Datastore::parse)
            .ok_or_else(|| NetconfError::validation("Invalid target repository type requested."))?;
        let url = if target == Datastore::Url {
            Some(req.field_str("url").ok_or_else(|| NetconfError::validation("Missing content parameter."))?)
        } else {
            None
        };
        rpc::build_delete_config(target, url)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    #[test]
    fn rejects_invalid_target() {
        let r = Req::decode(br#"{"type":7,"session":"K","target":"frobnitz"}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => {
                assert_eq!(e.error_message.as_deref(), Some("Invalid target repository type requested."))
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
