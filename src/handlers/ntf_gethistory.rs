//! NTF_GETHISTORY (§4.E, §4.H): `from`/`to` are second offsets from
//! wall-clock now, forming an absolute `[startTime, stopTime]` window
//! handed to the device's `create-subscription`. Collected
//! notifications are returned as a request-owned `Vec` (§3
//! PerRequestContext) rather than through any thread-local or global
//! accumulator.

use chrono::Utc;

use crate::netconf::NetconfError;
use crate::notify;
use crate::protocol::message::{Reply, Request};
use crate::registry::SessionRegistry;

use super::with_record;

pub fn handle(req: &Request, registry: &SessionRegistry) -> Reply {
    let session_key = match &req.session {
        Some(k) => k.clone(),
        None => return NetconfError::validation("Missing session parameter.").into_reply(),
    };
    let from = match req.field_i64("from") {
        Some(v) => v,
        None => return NetconfError::validation("Missing from parameter.").into_reply(),
    };
    let to = match req.field_i64("to") {
        Some(v) => v,
        None => return NetconfError::validation("Missing to parameter.").into_reply(),
    };

    let now = Utc::now();
    let start_time = (now + chrono::Duration::seconds(from)).to_rfc3339();
    let stop_time = (now + chrono::Duration::seconds(to)).to_rfc3339();

    with_record(registry, &session_key, |record| {
        let mut state = record.state.lock().unwrap();
        let nc = match state.nc.as_mut() {
            Some(nc) => nc,
            None => return NetconfError::validation("Invalid session identifier.").into_reply(),
        };

        let events = match notify::replay_history(nc, &start_time, &stop_time) {
            Ok(events) => events,
            Err(e) => return e.into_reply(),
        };
        drop(state);
        record.touch();

        let notifications: Vec<serde_json::Value> = events
            .into_iter()
            .map(|e| serde_json::json!({"eventtime": e.eventtime, "content": e.content}))
            .collect();
        Reply::raw(serde_json::json!({ "notifications": notifications }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Request as Req;

    #[test]
    fn rejects_missing_from() {
        let r = Req::decode(br#"{"type":15,"session":"K","to":0}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Missing from parameter.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_missing_to() {
        let r = Req::decode(br#"{"type":15,"session":"K","from":-60}"#).unwrap();
        let registry = SessionRegistry::new();
        match handle(&r, &registry) {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Missing to parameter.")),
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
