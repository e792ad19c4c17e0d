//! Protocol module containing the command builder and reply reduction.

pub mod command;
pub mod response;

pub use command::Command;
pub use response::ReplyBuffer;
