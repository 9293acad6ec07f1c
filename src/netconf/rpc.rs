//! `<rpc>` XML construction and reply classification (§4.C).

use std::sync::atomic::{AtomicU64, Ordering};

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::netconf::error::NetconfError;
use crate::protocol::message::ErrorReply;
use crate::protocol::wire::Datastore;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

fn next_message_id() -> u64 {
    NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed)
}

fn rpc_open(message_id: u64) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<rpc message-id=\"{}\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">",
        message_id,
    )
}

const RPC_CLOSE: &str = "</rpc>";

/// Wraps a `<get>`/`<get-config>` source-selection filter so every
/// outbound get/get-config request asks the device to include
/// default-valued nodes, per §4.C.
const WITH_DEFAULTS_REPORT_ALL: &str =
    "<with-defaults xmlns=\"urn:ietf:params:xml:ns:yang:ietf-netconf-with-defaults\">report-all</with-defaults>";

fn datastore_element(tag: &str, ds: Datastore, url: Option<&str>) -> Result<String, NetconfError> {
    match ds {
        Datastore::Url => {
            let url = url.ok_or_else(|| NetconfError::validation("Missing content parameter."))?;
            Ok(format!("<{tag}><url>{}</url></{tag}>", escape(url), tag = tag))
        }
        other => Ok(format!("<{tag}><{name}/></{tag}>", name = other.as_str(), tag = tag)),
    }
}

pub fn build_get(filter: Option<&str>) -> String {
    let body = filter.unwrap_or("");
    format!(
        "{}<get>{}{}</get>{}",
        rpc_open(next_message_id()),
        body,
        WITH_DEFAULTS_REPORT_ALL,
        RPC_CLOSE,
    )
}

pub fn build_get_config(source: Datastore, filter: Option<&str>) -> Result<String, NetconfError> {
    let source_el = datastore_element("source", source, None)?;
    let body = filter.unwrap_or("");
    Ok(format!(
        "{}<get-config>{}{}{}</get-config>{}",
        rpc_open(next_message_id()),
        source_el,
        body,
        WITH_DEFAULTS_REPORT_ALL,
        RPC_CLOSE,
    ))
}

pub fn build_get_schema(identifier: &str, version: Option<&str>, format: Option<&str>) -> String {
    let mut body = format!("<identifier>{}</identifier>", escape(identifier));
    if let Some(v) = version {
        body.push_str(&format!("<version>{}</version>", escape(v)));
    }
    if let Some(f) = format {
        body.push_str(&format!("<format>{}</format>", escape(f)));
    }
    format!(
        "{}<get-schema xmlns=\"urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring\">{}</get-schema>{}",
        rpc_open(next_message_id()),
        body,
        RPC_CLOSE,
    )
}

pub fn build_edit_config(
    target: Datastore,
    config: &str,
    default_operation: Option<&str>,
    error_option: Option<&str>,
) -> Result<String, NetconfError> {
    let target_el = datastore_element("target", target, None)?;
    let mut body = target_el;
    if let Some(op) = default_operation {
        body.push_str(&format!("<default-operation>{}</default-operation>", op));
    }
    if let Some(opt) = error_option {
        body.push_str(&format!("<error-option>{}</error-option>", opt));
    }
    body.push_str("<test-option>test-then-set</test-option>");
    body.push_str(&format!("<config>{}</config>", config));
    Ok(format!("{}<edit-config>{}</edit-config>{}", rpc_open(next_message_id()), body, RPC_CLOSE))
}

pub fn build_copy_config(
    target: Datastore,
    target_url: Option<&str>,
    source: Option<Datastore>,
    source_url: Option<&str>,
    inline_config: Option<&str>,
) -> Result<String, NetconfError> {
    let target_el = datastore_element("target", target, target_url)?;
    let source_el = match source {
        Some(ds) => datastore_element("source", ds, source_url)?,
        None => {
            let config = inline_config.ok_or_else(|| NetconfError::validation("Missing content parameter."))?;
            format!("<source><config>{}</config></source>", config)
        }
    };
    Ok(format!(
        "{}<copy-config>{}{}</copy-config>{}",
        rpc_open(next_message_id()),
        target_el,
        source_el,
        RPC_CLOSE,
    ))
}

pub fn build_delete_config(target: Datastore, url: Option<&str>) -> Result<String, NetconfError> {
    let target_el = datastore_element("target", target, url)?;
    Ok(format!("{}<delete-config>{}</delete-config>{}", rpc_open(next_message_id()), target_el, RPC_CLOSE))
}

pub fn build_lock(target: Datastore) -> Result<String, NetconfError> {
    let target_el = datastore_element("target", target, None)?;
    Ok(format!("{}<lock>{}</lock>{}", rpc_open(next_message_id()), target_el, RPC_CLOSE))
}

pub fn build_unlock(target: Datastore) -> Result<String, NetconfError> {
    let target_el = datastore_element("target", target, None)?;
    Ok(format!("{}<unlock>{}</unlock>{}", rpc_open(next_message_id()), target_el, RPC_CLOSE))
}

pub fn build_kill_session(session_id: &str) -> String {
    format!(
        "{}<kill-session><session-id>{}</session-id></kill-session>{}",
        rpc_open(next_message_id()),
        escape(session_id),
        RPC_CLOSE,
    )
}

pub fn build_validate(source: Datastore, url: Option<&str>) -> Result<String, NetconfError> {
    let source_el = datastore_element("source", source, url)?;
    Ok(format!("{}<validate>{}</validate>{}", rpc_open(next_message_id()), source_el, RPC_CLOSE))
}

pub fn build_generic(content: &str) -> String {
    format!("{}{}{}", rpc_open(next_message_id()), content, RPC_CLOSE)
}

pub fn build_create_subscription(stream: Option<&str>, start_time: &str, stop_time: &str) -> String {
    let stream_el = stream.map(|s| format!("<stream>{}</stream>", escape(s))).unwrap_or_default();
    format!(
        "{}<create-subscription xmlns=\"urn:ietf:params:xml:ns:netconf:notification:1.0\">\
{}<startTime>{}</startTime><stopTime>{}</stopTime>\
</create-subscription>{}",
        rpc_open(next_message_id()),
        stream_el,
        start_time,
        stop_time,
        RPC_CLOSE,
    )
}

/// What a classified `rpc-reply` turned out to contain.
pub enum Outcome {
    Ok,
    Data(String),
}

/// Parses a raw `<rpc-reply>` payload and classifies it per §4.C's
/// table. Transport-level failures are handled by the caller before
/// this is reached; this only interprets a reply that was actually
/// received.
pub fn classify(reply_xml: &[u8]) -> Result<Outcome, NetconfError> {
    let text = std::str::from_utf8(reply_xml)
        .map_err(|e| NetconfError::internal(format!("rpc-reply was not valid utf8: {}", e)))?;

    if let Some(err) = parse_rpc_error(text)? {
        return Err(NetconfError::Protocol(err));
    }

    if contains_element(text, "ok") {
        return Ok(Outcome::Ok);
    }

    let data = extract_data_body(text)?;
    match data {
        Some(d) if !d.trim().is_empty() => Ok(Outcome::Data(d)),
        // Protocol, not Internal: the wire message is the literal
        // text §4.C specifies, not an implementation-bug message, so
        // it must not go through NetconfError::Internal's "Internal: "
        // prefix (see the sibling "Receiving RPC-REPLY failed" case).
        _ => Err(NetconfError::Protocol(ErrorReply {
            kind: crate::protocol::wire::REPLY_ERROR,
            error_message: Some("No data from reply received".to_string()),
            ..Default::default()
        })),
    }
}

fn contains_element(text: &str, local: &str) -> bool {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == local {
                    return true;
                }
            }
            Ok(Event::Eof) => return false,
            Err(_) => return false,
            _ => {}
        }
        buf.clear();
    }
}

/// Pulls the full inner XML of `<data>` (or, for bare RPC replies with
/// no wrapping `<rpc-reply>`, the whole body) out as a string, since
/// callers want the raw subtree rather than a parsed structure.
fn extract_data_body(text: &str) -> Result<Option<String>, NetconfError> {
    let start_tag = "<data";
    let end_tag = "</data>";
    if let Some(start) = text.find(start_tag) {
        let open_end = text[start..].find('>').map(|i| start + i + 1);
        let open_end = match open_end {
            Some(i) => i,
            None => return Ok(None),
        };
        if let Some(close) = text[open_end..].find(end_tag) {
            return Ok(Some(text[open_end..open_end + close].to_string()));
        }
    }
    Ok(None)
}

fn parse_rpc_error(text: &str) -> Result<Option<ErrorReply>, NetconfError> {
    if !text.contains("rpc-error") {
        return Ok(None);
    }

    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut err = ErrorReply { kind: crate::protocol::wire::REPLY_ERROR, ..Default::default() };
    let mut current: Option<&'static str> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = match local_name(e.name().as_ref()) {
                    "error-type" => Some("error-type"),
                    "error-tag" => Some("error-tag"),
                    "error-severity" => Some("error-severity"),
                    "error-app-tag" => Some("error-app-tag"),
                    "error-path" => Some("error-path"),
                    "error-message" => Some("error-message"),
                    "bad-attribute" => Some("bad-attribute"),
                    "bad-element" => Some("bad-element"),
                    "bad-namespace" => Some("bad-namespace"),
                    "session-id" => Some("session-id"),
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                if let Some(field) = current {
                    let text = t.unescape().map(|c| c.into_owned()).unwrap_or_default();
                    match field {
                        "error-type" => err.error_type = Some(text),
                        "error-tag" => err.error_tag = Some(text),
                        "error-severity" => err.error_severity = Some(text),
                        "error-app-tag" => err.error_app_tag = Some(text),
                        "error-path" => err.error_path = Some(text),
                        "error-message" => err.error_message = Some(text),
                        "bad-attribute" => err.bad_attribute = Some(text),
                        "bad-element" => err.bad_element = Some(text),
                        "bad-namespace" => err.bad_namespace = Some(text),
                        "session-id" => err.session_id = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(NetconfError::internal(format!("xml parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(Some(err))
}

fn local_name(qname: &[u8]) -> &str {
    let full = std::str::from_utf8(qname).unwrap_or("");
    full.rsplit(':').next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_config_sets_with_defaults_report_all() {
        let rpc = build_get_config(Datastore::Running, None).unwrap();
        assert!(rpc.contains("report-all"));
        assert!(rpc.contains("<running/>"));
    }

    #[test]
    fn get_config_rejects_url_without_url_field() {
        let err = build_get_config(Datastore::Url, None);
        // get-config's source is never `url` per the schema (only
        // copy-config/delete-config/validate accept url sources), but
        // the builder is defensive regardless: if called with Url and
        // no url string it reports the same missing-content error.
        assert!(err.is_err());
    }

    #[test]
    fn classify_ok_reply() {
        let xml = "<rpc-reply message-id=\"1\"><ok/></rpc-reply>";
        assert!(matches!(classify(xml.as_bytes()), Ok(Outcome::Ok)));
    }

    #[test]
    fn classify_data_reply() {
        let xml = "<rpc-reply message-id=\"1\"><data><foo>bar</foo></data></rpc-reply>";
        match classify(xml.as_bytes()).unwrap() {
            Outcome::Data(d) => assert!(d.contains("<foo>bar</foo>")),
            _ => panic!("expected Data"),
        }
    }

    #[test]
    fn classify_empty_data_is_error() {
        let xml = "<rpc-reply message-id=\"1\"><data></data></rpc-reply>";
        match classify(xml.as_bytes()) {
            Err(NetconfError::Protocol(e)) => {
                assert_eq!(e.error_message.as_deref(), Some("No data from reply received"))
            }
            other => panic!("expected Protocol error, got {:?}", other.is_err()),
        }
    }

    #[test]
    fn classify_rpc_error_reply() {
        let xml = "<rpc-reply message-id=\"1\"><rpc-error>\
<error-type>application</error-type><error-tag>invalid-value</error-tag>\
<error-severity>error</error-severity><error-message>bad value</error-message>\
</rpc-error></rpc-reply>";
        match classify(xml.as_bytes()) {
            Err(NetconfError::Protocol(e)) => {
                assert_eq!(e.error_message.as_deref(), Some("bad value"));
                assert_eq!(e.error_tag.as_deref(), Some("invalid-value"));
            }
            other => panic!("expected Protocol error, got {:?}", other.is_err()),
        }
    }
}
