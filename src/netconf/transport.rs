//! SSH transport to a device: connect, authenticate, exchange hello,
//! and send/receive NETCONF RPCs framed the way the negotiated
//! capability set calls for.

use std::io::{Read, Write};
use std::net::TcpStream;

use quick_xml::events::Event;
use quick_xml::Reader;
use ssh2::{Channel, Session};

use crate::consts::SSH_HANDSHAKE_TIMEOUT;
use crate::framing;
use crate::netconf::error::NetconfError;

const NC_BASE_10_CAP: &str = "urn:ietf:params:netconf:base:1.0";
const NC_BASE_11_CAP: &str = "urn:ietf:params:netconf:base:1.1";
const EOM_10: &[u8] = b"]]>]]>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetconfVersion {
    V1_0,
    V1_1,
}

impl NetconfVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetconfVersion::V1_0 => "1.0",
            NetconfVersion::V1_1 => "1.1",
        }
    }
}

pub struct ConnectParams<'a> {
    pub host: &'a str,
    pub port: &'a str,
    pub user: &'a str,
    pub pass: Option<&'a str>,
}

/// A policy hook for approving or rejecting the remote host key.
/// The reference design unconditionally approves; this crate keeps
/// that as the default but leaves the decision as a replaceable value
/// rather than hardwiring it into `connect`.
pub trait HostKeyPolicy: Send + Sync {
    fn approve(&self, host: &str, port: &str) -> bool;
}

pub struct AllowAnyHostKey;

impl HostKeyPolicy for AllowAnyHostKey {
    fn approve(&self, _host: &str, _port: &str) -> bool {
        true
    }
}

/// One established NETCONF-over-SSH session: the SSH session itself
/// plus the single long-lived channel the `netconf` subsystem runs on.
pub struct NetconfSession {
    ssh: Session,
    channel: Channel,
    pub version: NetconfVersion,
    pub device_session_id: String,
    pub capabilities: Vec<String>,
}

pub struct HelloInfo {
    pub session_id: String,
    pub version: NetconfVersion,
    pub capabilities: Vec<String>,
}

impl NetconfSession {
    pub fn connect(
        params: &ConnectParams,
        host_key_policy: &dyn HostKeyPolicy,
    ) -> Result<NetconfSession, NetconfError> {
        if !host_key_policy.approve(params.host, params.port) {
            return Err(NetconfError::transport("host key rejected by policy", false));
        }

        let addr = format!("{}:{}", params.host, params.port);
        let tcp = TcpStream::connect(&addr)
            .map_err(|e| NetconfError::transport(format!("TCP connect failed: {}", e), false))?;
        tcp.set_read_timeout(Some(SSH_HANDSHAKE_TIMEOUT)).ok();

        let mut ssh = Session::new()
            .map_err(|e| NetconfError::internal(format!("creating SSH session: {}", e)))?;
        ssh.set_tcp_stream(tcp);
        ssh.handshake()
            .map_err(|e| NetconfError::transport(format!("SSH handshake failed: {}", e), false))?;

        // Public-key auth is disabled; password and keyboard-interactive
        // auth both use the supplied password, matching the reference
        // design's `nc_ssh_pref(NC_SSH_AUTH_PUBLIC_KEYS, -1)`.
        let password = params.pass.unwrap_or("");
        ssh.userauth_password(params.user, password)
            .map_err(|e| NetconfError::transport(format!("password auth failed: {}", e), false))?;
        if !ssh.authenticated() {
            return Err(NetconfError::transport("authentication failed", false));
        }

        let mut channel = ssh
            .channel_session()
            .map_err(|e| NetconfError::transport(format!("opening SSH channel failed: {}", e), false))?;
        channel
            .subsystem("netconf")
            .map_err(|e| NetconfError::transport(format!("requesting netconf subsystem failed: {}", e), false))?;

        let our_hello = build_client_hello();
        write_framed(&mut channel, NetconfVersion::V1_0, our_hello.as_bytes())
            .map_err(|e| NetconfError::transport(format!("sending hello failed: {}", e), false))?;

        let hello_bytes = read_framed(&mut channel, NetconfVersion::V1_0)
            .map_err(|e| NetconfError::transport(format!("reading device hello failed: {}", e), false))?
            .ok_or_else(|| NetconfError::transport("connection closed before device hello", false))?;
        let hello = parse_hello(&hello_bytes)?;

        Ok(NetconfSession {
            ssh,
            channel,
            version: hello.version,
            device_session_id: hello.session_id,
            capabilities: hello.capabilities,
        })
    }

    /// Sends one RPC payload and returns the raw reply payload,
    /// framed according to the negotiated NETCONF version. Per §4.C,
    /// a transport failure while the session is still `is_working()`
    /// surfaces the underlying detail without forcing teardown, while
    /// one that leaves the session no longer working is reported as
    /// the fixed "Receiving RPC-REPLY failed" and torn down.
    pub fn send_recv(&mut self, rpc_xml: &str) -> Result<Vec<u8>, NetconfError> {
        if let Err(e) = write_framed(&mut self.channel, self.version, rpc_xml.as_bytes()) {
            return Err(self.transport_failure(format!("writing rpc failed: {}", e)));
        }
        match read_framed(&mut self.channel, self.version) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(self.transport_failure("Receiving RPC-REPLY failed".to_string())),
            Err(e) => Err(self.transport_failure(format!("reading rpc-reply failed: {}", e))),
        }
    }

    fn transport_failure(&self, detail: String) -> NetconfError {
        if self.is_working() {
            NetconfError::transport(detail, false)
        } else {
            NetconfError::transport("Receiving RPC-REPLY failed", true)
        }
    }

    /// Opens a transient secondary channel on the same SSH session and
    /// performs its own hello exchange, used for RELOADHELLO and
    /// NTF_GETHISTORY (§4.E, §4.H). Each `netconf` subsystem channel is
    /// its own micro-session per RFC 6241, so the hello handshake is
    /// repeated even though the underlying SSH transport is shared.
    pub fn open_secondary_channel(&mut self) -> Result<(Channel, HelloInfo), NetconfError> {
        let mut channel = self
            .ssh
            .channel_session()
            .map_err(|e| NetconfError::transport(format!("opening secondary channel failed: {}", e), false))?;
        channel
            .subsystem("netconf")
            .map_err(|e| NetconfError::transport(format!("requesting netconf subsystem failed: {}", e), false))?;

        let our_hello = build_client_hello();
        // The secondary channel's own hello exchange always starts in
        // 1.0 framing, matching the base NETCONF handshake rules.
        write_framed(&mut channel, NetconfVersion::V1_0, our_hello.as_bytes())
            .map_err(|e| NetconfError::transport(format!("sending secondary hello failed: {}", e), false))?;
        let hello_bytes = read_framed(&mut channel, NetconfVersion::V1_0)
            .map_err(|e| NetconfError::transport(format!("reading secondary hello failed: {}", e), false))?
            .ok_or_else(|| NetconfError::transport("secondary channel closed before hello", false))?;
        let hello = parse_hello(&hello_bytes)?;
        Ok((channel, hello))
    }

    pub fn is_working(&self) -> bool {
        self.ssh.authenticated()
    }

    pub fn close(&mut self) {
        let _ = self.channel.close();
        let _ = self.ssh.disconnect(None, "session closed", None);
    }
}

/// Writes `payload` to `w` framed per the negotiated NETCONF version:
/// chunked framing for 1.1, the `]]>]]>` marker for 1.0. Shared by the
/// primary channel and any transient secondary channel.
pub fn write_framed<W: Write>(w: &mut W, version: NetconfVersion, payload: &[u8]) -> std::io::Result<()> {
    match version {
        NetconfVersion::V1_1 => framing::encode(w, payload),
        NetconfVersion::V1_0 => write_eom_framed(w, payload),
    }
}

/// Reads one framed message from `r` per the negotiated version.
/// Returns `Ok(None)` on a clean close before any bytes of a new
/// message arrive (1.1 only; 1.0's marker scan surfaces EOF as an
/// `UnexpectedEof` io error instead, since it has no concept of a
/// "no message started yet" boundary).
pub fn read_framed<R: Read>(r: &mut R, version: NetconfVersion) -> std::io::Result<Option<Vec<u8>>> {
    match version {
        NetconfVersion::V1_1 => framing::decode(r).map_err(|e| match e {
            framing::FrameError::Io(e) => e,
            framing::FrameError::Eof => std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"),
            framing::FrameError::Malformed(why) => std::io::Error::new(std::io::ErrorKind::InvalidData, why),
        }),
        NetconfVersion::V1_0 => read_eom_framed(r).map(Some),
    }
}

fn build_client_hello() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
<capabilities><capability>{}</capability><capability>{}</capability></capabilities>\
</hello>",
        NC_BASE_10_CAP, NC_BASE_11_CAP,
    )
}

fn parse_hello(bytes: &[u8]) -> Result<HelloInfo, NetconfError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| NetconfError::internal(format!("hello was not valid utf8: {}", e)))?;
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut capabilities = Vec::new();
    let mut session_id = None;
    let mut buf = Vec::new();
    let mut in_capability = false;
    let mut in_session_id = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                match local_name(e.name().as_ref()) {
                    "capability" => in_capability = true,
                    "session-id" => in_session_id = true,
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map(|c| c.into_owned()).unwrap_or_default();
                if in_capability {
                    capabilities.push(text);
                } else if in_session_id {
                    session_id = Some(text);
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                "capability" => in_capability = false,
                "session-id" => in_session_id = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(NetconfError::internal(format!("xml parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    let session_id = session_id.ok_or_else(|| NetconfError::internal("hello missing session-id"))?;
    let version = if capabilities.iter().any(|c| c == NC_BASE_11_CAP) {
        NetconfVersion::V1_1
    } else {
        NetconfVersion::V1_0
    };

    Ok(HelloInfo { session_id, version, capabilities })
}

fn local_name(qname: &[u8]) -> &str {
    let full = std::str::from_utf8(qname).unwrap_or("");
    full.rsplit(':').next().unwrap_or(full)
}

fn write_eom_framed<W: Write>(w: &mut W, payload: &[u8]) -> std::io::Result<()> {
    w.write_all(payload)?;
    w.write_all(EOM_10)?;
    Ok(())
}

fn read_eom_framed<R: Read>(r: &mut R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = r.read(&mut byte)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "eof before ]]>]]> marker",
            ));
        }
        buf.push(byte[0]);
        if buf.ends_with(EOM_10) {
            buf.truncate(buf.len() - EOM_10.len());
            return Ok(buf);
        }
    }
}
