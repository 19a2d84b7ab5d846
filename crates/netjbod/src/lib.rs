#![forbid(unsafe_code)]
//! NetJBOD public API facade.
//!
//! Re-exports the driver surface from the workspace crates through one
//! stable interface. Typical use:
//!
//! ```no_run
//! use netjbod::{Config, Session};
//!
//! # fn main() -> netjbod::Result<()> {
//! let config = Config {
//!     cache_capacity: Some(1024),
//!     ..Config::default()
//! };
//! let mut session = Session::from_config(&config)?;
//! session.mount()?;
//!
//! let mut buf = [0_u8; 300];
//! session.read(200, &mut buf)?;
//!
//! session.unmount()?;
//! # Ok(())
//! # }
//! ```

pub use njb_cache::{BlockCache, CacheStats, MAX_ENTRIES, MIN_ENTRIES};
pub use njb_client::{Config, RemoteArray, Session, TcpTransport, TransportStats};
pub use njb_error::{NjbError, Result};
pub use njb_proto::{Command, CommandWord, PacketHeader, HEADER_LEN, PAYLOAD_LEN};
pub use njb_types::{
    check_range, Block, BlockAddress, BlockId, DiskId, BLOCKS_PER_DISK, BLOCK_SIZE, DISK_SIZE,
    MAX_IO_LEN, NUM_DISKS, TOTAL_SIZE,
};
