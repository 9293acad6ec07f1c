//! One module per request family (§4.E). `dispatch` is the single
//! entry point the worker loop (§4.F) calls after decoding a request.

pub mod connect;
pub mod copy_config;
pub mod data_ops;
pub mod delete_config;
pub mod disconnect;
pub mod edit_config;
pub mod info;
pub mod kill;
pub mod lock_ops;
pub mod ntf_gethistory;
pub mod reload_hello;

use std::sync::Arc;

use crate::netconf::{HostKeyPolicy, NetconfError};
use crate::protocol::message::{Reply, Request};
use crate::protocol::wire::MsgType;
use crate::registry::{SessionRecord, SessionRegistry};

/// Looks up `key` under the registry's read lock, clones the `Arc`,
/// releases the read lock, then runs `f` against the record (§4.D's
/// canonical registry-then-record pattern). A miss is reported with
/// the wording the GET-family scenario in §8 uses; DISCONNECT spells
/// its own miss message out separately since the spec calls that
/// string out explicitly for idempotence (see DESIGN.md).
pub fn with_record<F>(registry: &SessionRegistry, key: &str, f: F) -> Reply
where
    F: FnOnce(&Arc<SessionRecord>) -> Reply,
{
    match registry.lookup(key) {
        Some(record) => f(&record),
        None => NetconfError::validation("Unknown session to process.").into_reply(),
    }
}

/// Shared shape for "validate fields, build an rpc, send it on the
/// session the request names, classify the reply" handlers: every
/// mutating op (EDITCONFIG, COPYCONFIG, ...) and every data-fetching
/// op (GET, GETCONFIG, ...) follows this exact sequence, differing
/// only in how they build the outbound RPC. `build`'s `Err` is
/// reported as a validation error without touching the session.
pub fn send_rpc<F>(req: &Request, registry: &SessionRegistry, build: F) -> Reply
where
    F: FnOnce(&Request) -> Result<String, NetconfError>,
{
    let session_key = match &req.session {
        Some(k) => k.clone(),
        None => return NetconfError::validation("Missing session parameter.").into_reply(),
    };

    let rpc_xml = match build(req) {
        Ok(x) => x,
        Err(e) => return e.into_reply(),
    };

    with_record(registry, &session_key, |record| {
        let mut state = record.state.lock().unwrap();
        let nc = match state.nc.as_mut() {
            Some(nc) => nc,
            None => return NetconfError::validation("Invalid session identifier.").into_reply(),
        };

        let reply_bytes = match nc.send_recv(&rpc_xml) {
            Ok(b) => b,
            Err(e) => {
                let needs_teardown = e.teardown_required();
                drop(state);
                if needs_teardown {
                    // mirrors disconnect.rs: remove from the registry
                    // before freeing nc, so §3's "reachable iff
                    // closed==false" never sees a half-torn-down entry.
                    registry.remove(&session_key);
                    record.teardown();
                }
                return e.into_reply();
            }
        };
        drop(state);

        match crate::netconf::rpc::classify(&reply_bytes) {
            Ok(crate::netconf::rpc::Outcome::Ok) => {
                record.touch();
                Reply::ok()
            }
            Ok(crate::netconf::rpc::Outcome::Data(data)) => {
                record.touch();
                Reply::data(data)
            }
            Err(e) => e.into_reply(),
        }
    })
}

/// Routes a decoded request to its handler. `session` has already been
/// checked non-null for every type but `Connect` by the dispatch loop
/// (§4.F step 4); handlers still receive `req.session` directly since
/// several of them need the raw `Option` (CONNECT has none at all).
pub fn dispatch(req: &Request, registry: &SessionRegistry, host_key_policy: &dyn HostKeyPolicy) -> Reply {
    match req.msg_type {
        MsgType::Connect => connect::handle(req, registry, host_key_policy),
        MsgType::Get => data_ops::get(req, registry),
        MsgType::GetConfig => data_ops::get_config(req, registry),
        MsgType::GetSchema => data_ops::get_schema(req, registry),
        MsgType::Generic => data_ops::generic(req, registry),
        MsgType::Validate => data_ops::validate(req, registry),
        MsgType::EditConfig => edit_config::handle(req, registry),
        MsgType::CopyConfig => copy_config::handle(req, registry),
        MsgType::DeleteConfig => delete_config::handle(req, registry),
        MsgType::Lock => lock_ops::lock(req, registry),
        MsgType::Unlock => lock_ops::unlock(req, registry),
        MsgType::Kill => kill::handle(req, registry),
        MsgType::Disconnect => disconnect::handle(req, registry),
        MsgType::Info => info::handle(req, registry),
        MsgType::ReloadHello => reload_hello::handle(req, registry),
        MsgType::NtfGetHistory => ntf_gethistory::handle(req, registry),
    }
}
