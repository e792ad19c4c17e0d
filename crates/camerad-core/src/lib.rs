//! # camerad-core
//!
//! Shared library for the camerad control-plane client containing the wire
//! command/response handling, the camera session domain model, and the
//! magic-board bit-register encoder.
//!
//! This crate is pure logic: it has zero dependencies on sockets, async
//! runtimes, or the filesystem.  Everything that touches the network lives
//! in `camerad-ctl`.
//!
//! # Architecture overview
//!
//! A camerad installation runs one controller daemon per physical host, each
//! speaking the same line-oriented ASCII protocol over a persistent TCP
//! connection.  The control client broadcasts every command to all connected
//! hosts and requires them to answer identically.  This crate defines:
//!
//! - **`protocol`** – How a command line is built (space-joined tokens plus a
//!   trailing newline) and how a controller's reply is accumulated and
//!   reduced to a single comparable token.
//!
//! - **`domain`** – The per-session camera state (mode, basename, image
//!   type, exposure time, …) that the operation layer keeps in sync with the
//!   controllers.
//!
//! - **`bitreg`** – The bit-register subprotocol used to program the
//!   auxiliary "magic board" one bit at a time.

pub mod bitreg;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `camerad_core::Command` instead of `camerad_core::protocol::command::Command`.
pub use bitreg::{ChannelId, UnknownChannelKind};
pub use domain::session::{ImageType, ParseImageTypeError, SessionState};
pub use protocol::command::Command;
pub use protocol::response::ReplyBuffer;
