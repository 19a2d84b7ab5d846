#![forbid(unsafe_code)]
//! Client-side driver for a remote JBOD disk array.
//!
//! The array is reachable only through a command protocol (mount/unmount,
//! seek, read-block, write-block) over one TCP connection. This crate turns
//! arbitrary byte-range reads and writes against the linear address space
//! into sequences of whole-block commands:
//!
//! - [`TcpTransport`] frames commands onto the socket and is the only code
//!   that performs wire I/O.
//! - [`Session`] owns the mount lifecycle, translates addresses, performs
//!   read-modify-write for partial blocks, and consults an optional
//!   [`njb_cache::BlockCache`].
//! - [`RemoteArray`] is the seam between the two, so tests can drive a
//!   session against an in-memory array.
//!
//! Everything is synchronous and single-threaded: one outstanding command at
//! a time over one connection, every call blocking until the remote replies
//! or the connection fails.

mod config;
mod session;
mod transport;

pub use config::Config;
pub use session::Session;
pub use transport::{TcpTransport, TransportStats};

use njb_error::Result;
use njb_proto::CommandWord;
use njb_types::Block;

/// Command execution seam between the session and the wire.
pub trait RemoteArray {
    /// Execute one command against the array and return its return code
    /// (0 = success).
    ///
    /// `block` supplies the outgoing payload for [`njb_proto::Command::WriteBlock`]
    /// and receives the incoming payload for [`njb_proto::Command::ReadBlock`];
    /// control commands pass `None`.
    fn execute(&mut self, word: CommandWord, block: Option<&mut Block>) -> Result<u16>;
}
