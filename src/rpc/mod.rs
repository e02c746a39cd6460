//! Message passing between the controller and the tagger host.

mod channel;
mod messages;

pub use channel::{ChannelOptions, Endpoint, Notification, Outbox, RpcChannel, duplex};
pub use messages::{Call, CallMessage, Reply, ReplyMessage, SENTINEL_ID, WireNode};
