pub mod error;
pub mod rpc;
pub mod transport;

pub use error::NetconfError;
pub use transport::{
    AllowAnyHostKey, ConnectParams, HelloInfo, HostKeyPolicy, NetconfSession, NetconfVersion,
};
