//! EDITCONFIG (§4.E): requires `target` and `config`; `default-operation`
//! and `error-option` are optional enumerations validated against a
//! fixed set of NETCONF-legal values. `test-option` is always fixed to
//! `test-then-set`, matching the reference design.

use crate::netconf::rpc;
use crate::netconf::NetconfError;
use crate::protocol::message::{Reply, Request};
use crate::protocol::wire::Datastore;
use crate::registry::SessionRegistry;

use super::send_rpc;

const DEFAULT_OPERATIONS: &[&str] = &["merge", "replace", "none"];
const ERROR_OPTIONS: &[&str] = &["continue-on-error", "stop-on-error", "rollback-on-error"];

pub fn handle(req: &Request, registry: &SessionRegistry) -> Reply {
    send_rpc(req, registry, |req| {
        let target = req
            .field_str("target")
            .and_then(Datastore::parse)
            .ok_or_else(|| NetconfError::validation("Invalid target repository type requested."))?;
        let config = req
            .field_str("config")
            .ok_or_else(|| NetconfError::validation("Missing content parameter."))?;

        let default_operation = match req.field_str("default-operation") {
            Some(op) if DEFAULT_OPERATIONS.contains(&op) => Some(op),
            Some(_) => return Err(NetconfError::validation("Invalid default-operation parameter.")),
            None => None,
        };
        let error_option = match req.field_str("error-option") {
            Some(opt) if ERROR_OPTIONS.contains(&opt) => Some(opt),
            Some(_) => return Err(NetconfError::validation("Invalid error-option parameter.")),
            None => None,
        };

        rpc::build_edit_config(target, config, default_operation, error_option)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    #[test]
    fn rejects_bad_default_operation() {
        let r = Req::decode(
            br#"{"type":5,"session":"K","target":"running","default-operation":"maybe","config":"<x/>"}"#,
        )
        .unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => {
                assert_eq!(e.error_message.as_deref(), Some("Invalid default-operation parameter."))
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_error_option() {
        let r = Req::decode(
            br#"{"type":5,"session":"K","target":"running","error-option":"panic","config":"<x/>"}"#,
        )
        .unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Invalid error-option parameter.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_missing_target() {
        let r = Req::decode(br#"{"type":5,"session":"K","config":"<x/>"}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => {
                assert_eq!(e.error_message.as_deref(), Some("Invalid target repository type requested."))
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
