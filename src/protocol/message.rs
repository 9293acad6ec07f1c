//! Request/reply JSON shapes exchanged with local clients (§4.B).
//!
//! Requests are polymorphic on `type`: op-specific fields live
//! alongside the envelope fields rather than in a nested payload, so
//! the envelope is decoded with `serde_json::Value` and individual
//! handlers pull the fields they need out of the map.

use serde_derive::Serialize;
use serde_json::{Map, Value};

use super::wire::{self, MsgType};

/// A decoded request envelope. `fields` holds the full original JSON
/// object, including `type` and `session`, so handlers can read
/// whatever op-specific keys they need without this struct growing a
/// field per handler.
pub struct Request {
    pub msg_type: MsgType,
    pub session: Option<String>,
    pub fields: Map<String, Value>,
}

#[derive(Debug)]
pub enum DecodeError {
    NotAnObject,
    MissingType,
    UnknownType(u64),
}

impl Request {
    pub fn decode(bytes: &[u8]) -> Result<Request, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        // callers treat any of these as "silently drop the message"
        // per §4.F step 3, so we fold them into serde_json::Error's
        // custom-error constructor rather than a separate enum.
        let obj = match value {
            Value::Object(m) => m,
            _ => return Err(serde::de::Error::custom("request is not a JSON object")),
        };
        let type_num = obj
            .get("type")
            .and_then(Value::as_u64)
            .ok_or_else(|| serde::de::Error::custom("missing or non-numeric 'type'"))?;
        let msg_type = MsgType::try_from(type_num as u8)
            .map_err(|_| serde::de::Error::custom(format!("unknown request type {}", type_num)))?;
        let session = obj.get("session").and_then(Value::as_str).map(str::to_string);
        Ok(Request { msg_type, session, fields: obj })
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn field_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }
}

/// A reply, built up by handlers and encoded as JSON before framing.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ok {
        #[serde(rename = "type")]
        kind: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<String>,
    },
    Data { #[serde(rename = "type")] kind: u8, data: String },
    Error(ErrorReply),
    /// Used for handlers that return a bespoke JSON shape (INFO's
    /// cached hello object, NTF_GETHISTORY's notification array) that
    /// does not carry a `type` tag at all, matching §8 scenario 1.
    Raw(Value),
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ErrorReply {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(rename = "error-tag", skip_serializing_if = "Option::is_none")]
    pub error_tag: Option<String>,
    #[serde(rename = "error-type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(rename = "error-severity", skip_serializing_if = "Option::is_none")]
    pub error_severity: Option<String>,
    #[serde(rename = "error-app-tag", skip_serializing_if = "Option::is_none")]
    pub error_app_tag: Option<String>,
    #[serde(rename = "error-path", skip_serializing_if = "Option::is_none")]
    pub error_path: Option<String>,
    #[serde(rename = "error-message", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "bad-attribute", skip_serializing_if = "Option::is_none")]
    pub bad_attribute: Option<String>,
    #[serde(rename = "bad-element", skip_serializing_if = "Option::is_none")]
    pub bad_element: Option<String>,
    #[serde(rename = "bad-namespace", skip_serializing_if = "Option::is_none")]
    pub bad_namespace: Option<String>,
    #[serde(rename = "session-id", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Reply {
    pub fn ok() -> Reply {
        Reply::Ok { kind: wire::REPLY_OK, session: None }
    }

    pub fn ok_with_session(session: String) -> Reply {
        Reply::Ok { kind: wire::REPLY_OK, session: Some(session) }
    }

    pub fn data(data: String) -> Reply {
        Reply::Data { kind: wire::REPLY_DATA, data }
    }

    pub fn error(message: impl Into<String>) -> Reply {
        Reply::Error(ErrorReply {
            kind: wire::REPLY_ERROR,
            error_message: Some(message.into()),
            ..Default::default()
        })
    }

    pub fn raw(value: Value) -> Reply {
        Reply::Raw(value)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("reply values are always serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_ok_omits_session_field() {
        let bytes = Reply::ok().to_bytes();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"type": 0}));
    }

    #[test]
    fn connect_ok_carries_session_field() {
        let bytes = Reply::ok_with_session("deadbeef".to_string()).to_bytes();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"type": 0, "session": "deadbeef"}));
    }
}
