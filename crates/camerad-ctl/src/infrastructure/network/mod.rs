//! Network infrastructure: persistent controller connections and the
//! command broadcast engine.

pub mod broadcast;
pub mod hosts;

pub use broadcast::{BroadcastError, Broadcaster, HostReply};
pub use hosts::{ConnectionError, Host, HostEntry, HostSet};
