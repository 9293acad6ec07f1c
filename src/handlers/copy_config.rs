//! COPYCONFIG (§4.E, §9): requires `target`; `source` is optional —
//! when absent, `config` supplies an inline source. URL datastores use
//! distinct `source-url`/`target-url` fields rather than a single
//! shared `url`, resolving the reference design's one-URL ambiguity.

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
        let target_url = if target == Datastore::Url {
            Some(req.field_str("target-url").ok_or_else(|| NetconfError::validation("Missing content parameter."))?)
        } else {
            None
        };

        let source = match req.field_str("source") {
            Some(s) => Some(
                Datastore::parse(s)
                    .ok_or_else(|| NetconfError::validation("Invalid source repository type requested."))?,
            ),
            None => None,
        };
        let source_url = match source {
            Some(Datastore::Url) => {
                Some(req.field_str("source-url").ok_or_else(|| NetconfError::validation("Missing content parameter."))?)
            }
            _ => None,
        };
        let inline_config = if source.is_none() { req.field_str("config") } else { None };

        rpc::build_copy_config(target, target_url, source, source_url, inline_config)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    #[test]
    fn inline_config_used_when_source_absent() {
        let r = Req::decode(br#"{"type":6,"session":"K","target":"running","config":"<x/>"}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Unknown session to process.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn url_target_without_target_url_is_rejected() {
        let r = Req::decode(br#"{"type":6,"session":"K","target":"url","config":"<x/>"}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Missing content parameter.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
