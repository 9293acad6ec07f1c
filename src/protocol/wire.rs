//! The fixed numeric wire contract: request/reply type tags and the
//! datastore enum. Values here must never change without bumping a
//! protocol version, since both peers compile them in statically.

pub const REPLY_OK: u8 = 0;
pub const REPLY_DATA: u8 = 1;
pub const REPLY_ERROR: u8 = 2;

/// Request message types, numbered in the order the schema lists them.
/// The envelope carries this as a plain integer on the wire (see
/// `protocol::message::RequestEnvelope`); this enum is the typed view
/// handlers match on after `MsgType::try_from` decodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Connect = 1,
    Get = 2,
    GetConfig = 3,
    GetSchema = 4,
    EditConfig = 5,
    CopyConfig = 6,
    DeleteConfig = 7,
    Lock = 8,
    Unlock = 9,
    Kill = 10,
    Disconnect = 11,
    Info = 12,
    Generic = 13,
    ReloadHello = 14,
    NtfGetHistory = 15,
    Validate = 16,
}

impl TryFrom<u8> for MsgType {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, ()> {
        use MsgType::*;
        Ok(match v {
            1 => Connect,
            2 => Get,
            3 => GetConfig,
            4 => GetSchema,
            5 => EditConfig,
            6 => CopyConfig,
            7 => DeleteConfig,
            8 => Lock,
            9 => Unlock,
            10 => Kill,
            11 => Disconnect,
            12 => Info,
            13 => Generic,
            14 => ReloadHello,
            15 => NtfGetHistory,
            16 => Validate,
            _ => return Err(()),
        })
    }
}

/// A datastore as named on the wire. `Url` is the escape hatch used
/// whenever a request needs to source or target an arbitrary URL
/// instead of one of the three named stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datastore {
    Running,
    Startup,
    Candidate,
    Url,
}

impl Datastore {
    pub fn parse(s: &str) -> Option<Datastore> {
        match s {
            "running" => Some(Datastore::Running),
            "startup" => Some(Datastore::Startup),
            "candidate" => Some(Datastore::Candidate),
            "url" => Some(Datastore::Url),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Datastore::Running => "running",
            Datastore::Startup => "startup",
            Datastore::Candidate => "candidate",
            Datastore::Url => "url",
        }
    }
}
