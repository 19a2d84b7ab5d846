#![forbid(unsafe_code)]
//! Disk geometry and strongly typed addressing for a JBOD array.
//!
//! The remote array is a fixed set of [`NUM_DISKS`] disks, each holding
//! [`BLOCKS_PER_DISK`] blocks of [`BLOCK_SIZE`] bytes, addressed as one
//! linear byte range with the disks laid back to back. [`BlockAddress`] is
//! the decomposed (disk, block, intra-block offset) form the I/O engine
//! iterates over; the newtypes keep disk and block indices from being mixed
//! with each other or with raw byte offsets.

use njb_error::{NjbError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per block; the minimum unit of remote I/O.
pub const BLOCK_SIZE: usize = 256;
/// Blocks on each disk.
pub const BLOCKS_PER_DISK: usize = 256;
/// Disks in the array.
pub const NUM_DISKS: usize = 16;
/// Bytes per disk.
pub const DISK_SIZE: usize = BLOCK_SIZE * BLOCKS_PER_DISK;
/// Total addressable bytes across the array.
pub const TOTAL_SIZE: usize = DISK_SIZE * NUM_DISKS;
/// Largest byte count a single read or write call may request.
pub const MAX_IO_LEN: usize = 1024;

/// Owned block-sized buffer.
pub type Block = [u8; BLOCK_SIZE];

/// Validated disk index (`0..NUM_DISKS`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DiskId(u8);

impl DiskId {
    pub const ZERO: Self = Self(0);

    /// Create a `DiskId` if `disk` is below [`NUM_DISKS`].
    pub fn new(disk: u8) -> Result<Self> {
        if usize::from(disk) >= NUM_DISKS {
            return Err(NjbError::DiskOutOfRange { disk });
        }
        Ok(Self(disk))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

/// Block index within one disk. Every `u8` value is a valid block id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockId(pub u8);

/// Decomposed position of one byte within the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAddress {
    pub disk: DiskId,
    pub block: BlockId,
    /// Byte offset inside the block (`0..BLOCK_SIZE`).
    pub offset: usize,
}

impl BlockAddress {
    /// Decompose a linear byte address into (disk, block, offset).
    pub fn from_linear(addr: u32) -> Result<Self> {
        let linear = addr as usize;
        if linear >= TOTAL_SIZE {
            return Err(NjbError::OutOfBounds { addr, len: 0 });
        }
        // Both quotients are in range by the check above.
        let disk = DiskId((linear / DISK_SIZE) as u8);
        let block = BlockId(((linear % DISK_SIZE) / BLOCK_SIZE) as u8);
        Ok(Self {
            disk,
            block,
            offset: linear % BLOCK_SIZE,
        })
    }

    /// Start of the following block.
    ///
    /// The offset resets to zero; the last block of a disk wraps to block 0
    /// of the next disk. The final block of the final disk wraps back to the
    /// origin, which per-request range checks keep unreachable mid-transfer.
    #[must_use]
    pub fn next_block(self) -> Self {
        if usize::from(self.block.0) < BLOCKS_PER_DISK - 1 {
            Self {
                disk: self.disk,
                block: BlockId(self.block.0 + 1),
                offset: 0,
            }
        } else {
            Self {
                disk: DiskId((self.disk.0 + 1) % NUM_DISKS as u8),
                block: BlockId(0),
                offset: 0,
            }
        }
    }
}

/// Validate one I/O request against the length cap and the array size.
pub fn check_range(addr: u32, len: usize) -> Result<()> {
    if len > MAX_IO_LEN {
        return Err(NjbError::LengthTooLarge {
            len,
            max: MAX_IO_LEN,
        });
    }
    let end = u64::from(addr) + len as u64;
    if end > TOTAL_SIZE as u64 {
        return Err(NjbError::OutOfBounds { addr, len });
    }
    Ok(())
}

impl fmt::Display for DiskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BlockAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.disk, self.block, self.offset)
    }
}
