//! Crate-level error taxonomy (§7). A single enum, one variant per
//! category, each carrying whatever the corresponding wire ERROR needs.

use crate::protocol::message::{ErrorReply, Reply};

#[derive(Debug, Clone)]
pub enum NetconfError {
    /// A populated `<rpc-error>` came back from the device.
    Protocol(ErrorReply),
    /// The SSH/TCP transport itself failed. `teardown` is true when the
    /// session is no longer usable and must be removed from the registry.
    Transport { message: String, teardown: bool },
    /// A request was missing a required field or supplied an invalid
    /// enumerated value. The session is left untouched.
    Validation(String),
    /// Anything else unexpected (serialization bugs, poisoned locks).
    Internal(String),
}

impl NetconfError {
    pub fn transport(message: impl Into<String>, teardown: bool) -> NetconfError {
        NetconfError::Transport { message: message.into(), teardown }
    }

    pub fn validation(message: impl Into<String>) -> NetconfError {
        NetconfError::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> NetconfError {
        NetconfError::Internal(message.into())
    }

    pub fn teardown_required(&self) -> bool {
        matches!(self, NetconfError::Transport { teardown: true, .. })
    }

    pub fn into_reply(self) -> Reply {
        match self {
            NetconfError::Protocol(fields) => Reply::Error(fields),
            NetconfError::Transport { message, .. } => Reply::error(message),
            NetconfError::Validation(message) => Reply::error(message),
            NetconfError::Internal(message) => Reply::error(format!("Internal: {}", message)),
        }
    }
}

impl std::fmt::Display for NetconfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetconfError::Protocol(e) => {
                write!(f, "protocol error: {}", e.error_message.as_deref().unwrap_or("unspecified"))
            }
            NetconfError::Transport { message, .. } => write!(f, "transport error: {}", message),
            NetconfError::Validation(m) => write!(f, "validation error: {}", m),
            NetconfError::Internal(m) => write!(f, "internal error: {}", m),
        }
    }
}

impl std::error::Error for NetconfError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Reply;

    #[test]
    fn protocol_and_transport_errors_carry_their_message_verbatim() {
        let protocol = NetconfError::Protocol(ErrorReply {
            error_message: Some("No data from reply received".to_string()),
            ..Default::default()
        });
        match protocol.into_reply() {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("No data from reply received")),
            other => panic!("expected Error, got {:?}", other),
        }

        match NetconfError::transport("Receiving RPC-REPLY failed", true).into_reply() {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Receiving RPC-REPLY failed")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn only_internal_errors_get_prefixed() {
        match NetconfError::internal("poisoned lock").into_reply() {
            Reply::Error(e) => assert_eq!(e.error_message.as_deref(), Some("Internal: poisoned lock")),
            other => panic!("expected Error, got {:?}", other),
        }
    }
}
