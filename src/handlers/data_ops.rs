//! GET / GETCONFIG / GETSCHEMA / GENERIC / VALIDATE: every handler
//! here fetches data (or validates) and returns DATA on success, so
//! they all reduce to `send_rpc` plus their own field parsing (§4.E).

use crate::netconf::rpc;
use crate::netconf::NetconfError;
use crate::protocol::message::{Reply, Request};
use crate::protocol::wire::Datastore;
use crate::registry::SessionRegistry;

use super::send_rpc;

pub fn get(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |_req| Ok(rpc::build_get(None)))
}

pub fn get_config(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| {
        let source = req
            .field_str("source")
            .and_then(Datastore::parse)
            .ok_or_else(|| NetconfError::validation("Invalid source repository type requested."))?;
        rpc::build_get_config(source, None)
    })
}

pub fn get_schema(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| {
        let identifier = req
            .field_str("identifier")
            .ok_or_else(|| NetconfError::validation("Missing content parameter."))?;
        Ok(rpc::build_get_schema(identifier, req.field_str("version"), req.field_str("format")))
    })
}

pub fn generic(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| {
        let content = req
            .field_str("content")
            .ok_or_else(|| NetconfError::validation("Missing content parameter."))?;
        Ok(rpc::build_generic(content))
    })
}

pub fn validate(req: &Request, registry: &SessionRegistry) -> Reply {
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
        rpc::build_validate(target, url)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    fn req(json: &str) -> Req {
        Req::decode(json.as_bytes()).unwrap()
    }

    #[test]
    fn get_config_rejects_invalid_source() {
        let r = req(r#"{"type":3,"session":"deadbeef","source":"frobnitz"}"#);
        let registry = SessionRegistry::new();
        match get_config(&r, &registry) {
            Reply::Error(e) => {
                assert_eq!(e.error_message.as_deref(), Some("Invalid source repository type requested."))
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn get_on_unknown_session_reports_unknown() {
        let r = req(r#"{"type":2,"session":"deadbeef"}"#);
        let registry = SessionRegistry::new();
        match get(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Unknown session to process.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
