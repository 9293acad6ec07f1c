pub mod message;
pub mod wire;

pub use message::{ErrorReply, Reply, Request};
pub use wire::{Datastore, MsgType};
