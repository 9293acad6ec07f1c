//! Notification-history replay: a transient secondary NETCONF channel
//! used to replay a device's buffered notifications for a bounded
//! time window (§4.H).

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::netconf::error::NetconfError;
use crate::netconf::rpc::{self, Outcome};
use crate::netconf::transport::{self, NetconfSession};
use crate::registry::NotificationEvent;

/// Opens a secondary channel on `session`, subscribes for the
/// `[start_time, stop_time]` window, and drains every `<notification>`
/// the device sends until it closes the stream. The accumulator is an
/// ordinary owned `Vec` returned to the caller (§3 PerRequestContext);
/// nothing is stashed in thread-local or global storage.
pub fn replay_history(
    session: &mut NetconfSession,
    start_time: &str,
    stop_time: &str,
) -> Result<Vec<NotificationEvent>, NetconfError> {
    let (mut channel, secondary_hello) = session.open_secondary_channel()?;
    let version = secondary_hello.version;

    let subscribe = rpc::build_create_subscription(None, start_time, stop_time);
    transport::write_framed(&mut channel, version, subscribe.as_bytes())
        .map_err(|e| NetconfError::transport(format!("sending subscribe failed: {}", e), false))?;
    let ack = transport::read_framed(&mut channel, version)
        .map_err(|e| NetconfError::transport(format!("reading subscribe reply failed: {}", e), false))?
        .ok_or_else(|| NetconfError::transport("Receiving RPC-REPLY failed", false))?;
    if let Outcome::Data(_) = rpc::classify(&ack)? {
        // some devices ack the subscription with more than a bare
        // <ok/>; either shape counts as a successful subscribe.
    }

    let mut events = Vec::new();
    loop {
        match transport::read_framed(&mut channel, version) {
            Ok(Some(bytes)) => {
                if let Some(event) = parse_notification(&bytes)? {
                    events.push(event);
                }
            }
            // the device closes the notification stream once replay
            // finishes; that end-of-stream is expected, not an error.
            Ok(None) => break,
            Err(_) => break,
        }
    }

    let _ = channel.close();
    Ok(events)
}

fn parse_notification(bytes: &[u8]) -> Result<Option<NotificationEvent>, NetconfError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| NetconfError::internal(format!("notification was not valid utf8: {}", e)))?;
    if !text.contains("notification") {
        return Ok(None);
    }

    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut eventtime = None;
    let mut in_event_time = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if local_name(e.name().as_ref()) == "eventTime" => in_event_time = true,
            Ok(Event::End(e)) if local_name(e.name().as_ref()) == "eventTime" => in_event_time = false,
            Ok(Event::Text(t)) if in_event_time => {
                eventtime = Some(t.unescape().map(|c| c.into_owned()).unwrap_or_default());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(NetconfError::internal(format!("xml parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    let eventtime = eventtime.unwrap_or_default();
    let content = strip_event_time(text);
    Ok(Some(NotificationEvent { eventtime, content }))
}

/// The notification's raw content, minus the `eventTime` element:
/// callers already get the timestamp separately and don't need it
/// duplicated inside `content`.
fn strip_event_time(text: &str) -> String {
    match (text.find("<eventTime"), text.find("</eventTime>")) {
        (Some(start), Some(end_tag)) => {
            let after = end_tag + "</eventTime>".len();
            format!("{}{}", &text[..start], &text[after..])
        }
        _ => text.to_string(),
    }
}

fn local_name(qname: &[u8]) -> &str {
    let full = std::str::from_utf8(qname).unwrap_or("");
    full.rsplit(':').next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_eventtime_and_strips_it_from_content() {
        let xml = "<notification xmlns=\"urn:ietf:params:xml:ns:netconf:notification:1.0\">\
<eventTime>2024-01-01T00:00:00Z</eventTime><link-down><if-name>eth0</if-name></link-down>\
</notification>";
        let event = parse_notification(xml.as_bytes()).unwrap().unwrap();
        assert_eq!(event.eventtime, "2024-01-01T00:00:00Z");
        assert!(event.content.contains("<if-name>eth0</if-name>"));
        assert!(!event.content.contains("eventTime"));
    }

    #[test]
    fn non_notification_payload_is_ignored() {
        let xml = "<rpc-reply message-id=\"1\"><ok/></rpc-reply>";
        assert!(parse_notification(xml.as_bytes()).unwrap().is_none());
    }
}
