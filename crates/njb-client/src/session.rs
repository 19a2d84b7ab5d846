//! Mount lifecycle and the multi-block read/write engine.

use crate::{Config, RemoteArray, TcpTransport};
use njb_cache::{BlockCache, CacheStats};
use njb_error::{NjbError, Result};
use njb_proto::{Command, CommandWord};
use njb_types::{check_range, Block, BlockAddress, BlockId, DiskId, BLOCK_SIZE};
use tracing::{debug, trace};

/// Local mirror of the remote array's head position.
///
/// Seeks move the head explicitly; a read-block command advances it by one
/// block on the remote side (wrapping to the next disk at a disk boundary),
/// so the mirror advances too. Write-block leaves the head in place. Keeping
/// the mirror accurate is what lets the session skip redundant seeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    disk: DiskId,
    block: BlockId,
}

impl Cursor {
    fn origin() -> Self {
        Self {
            disk: DiskId::ZERO,
            block: BlockId(0),
        }
    }

    fn advance(&mut self) {
        let next = BlockAddress {
            disk: self.disk,
            block: self.block,
            offset: 0,
        }
        .next_block();
        self.disk = next.disk;
        self.block = next.block;
    }
}

/// Client session against a remote JBOD array.
///
/// Owns the transport, the optional block cache, the mount flag, and the
/// head-position mirror. All I/O requires a mounted session; `mount` and
/// `unmount` are the only state transitions.
#[derive(Debug)]
pub struct Session<T: RemoteArray> {
    transport: T,
    cache: Option<BlockCache>,
    mounted: bool,
    cursor: Cursor,
}

impl Session<TcpTransport> {
    /// Connect a TCP transport and assemble a session (and cache) from
    /// `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = TcpTransport::connect(&config.host, config.port)?;
        let cache = config.cache_capacity.map(BlockCache::new).transpose()?;
        Ok(Self::new(transport, cache))
    }
}

impl<T: RemoteArray> Session<T> {
    /// Build a session over an already-connected transport. Pass `None` to
    /// run uncached.
    pub fn new(transport: T, cache: Option<BlockCache>) -> Self {
        Self {
            transport,
            cache,
            mounted: false,
            cursor: Cursor::origin(),
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(BlockCache::stats)
    }

    /// Remove and return the cache, leaving the session uncached.
    pub fn take_cache(&mut self) -> Option<BlockCache> {
        self.cache.take()
    }

    /// Ready the array for I/O.
    pub fn mount(&mut self) -> Result<()> {
        if self.mounted {
            return Err(NjbError::AlreadyMounted);
        }
        self.run(CommandWord::control(Command::Mount), None)?;
        self.mounted = true;
        self.cursor = Cursor::origin();
        debug!("array mounted");
        Ok(())
    }

    /// Release the array.
    pub fn unmount(&mut self) -> Result<()> {
        if !self.mounted {
            return Err(NjbError::NotMounted);
        }
        self.run(CommandWord::control(Command::Unmount), None)?;
        self.mounted = false;
        debug!("array unmounted");
        Ok(())
    }

    /// Read `buf.len()` bytes starting at linear address `addr`.
    ///
    /// Fails without wire traffic when the session is unmounted or the range
    /// is invalid. On a mid-transfer failure the call aborts and bytes
    /// already copied into `buf` are not rolled back.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<usize> {
        if !self.mounted {
            return Err(NjbError::NotMounted);
        }
        check_range(addr, buf.len())?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut position = BlockAddress::from_linear(addr)?;
        let mut staging: Block = [0_u8; BLOCK_SIZE];
        let mut copied = 0;
        while copied < buf.len() {
            self.seek_if_needed(position.disk, position.block)?;
            self.fetch_block(position.disk, position.block, &mut staging)?;

            let take = (buf.len() - copied).min(BLOCK_SIZE - position.offset);
            buf[copied..copied + take]
                .copy_from_slice(&staging[position.offset..position.offset + take]);
            copied += take;
            position = position.next_block();
        }
        trace!(addr, len = buf.len(), "read complete");
        Ok(buf.len())
    }

    /// Write `buf` starting at linear address `addr`.
    ///
    /// Partial-block spans are read-modify-write: the affected block is
    /// fetched, the new bytes spliced in, and the whole block written back.
    /// Same validation and partial-failure contract as [`Session::read`];
    /// blocks already written remotely are not rolled back.
    pub fn write(&mut self, addr: u32, buf: &[u8]) -> Result<usize> {
        if !self.mounted {
            return Err(NjbError::NotMounted);
        }
        check_range(addr, buf.len())?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut position = BlockAddress::from_linear(addr)?;
        let mut staging: Block = [0_u8; BLOCK_SIZE];
        let mut written = 0;
        while written < buf.len() {
            let (disk, block) = (position.disk, position.block);
            self.seek_if_needed(disk, block)?;
            self.fetch_block(disk, block, &mut staging)?;
            // The fetch may have advanced the remote head; re-establish the
            // position before writing back.
            self.seek_if_needed(disk, block)?;

            let take = (buf.len() - written).min(BLOCK_SIZE - position.offset);
            staging[position.offset..position.offset + take]
                .copy_from_slice(&buf[written..written + take]);
            self.run(
                CommandWord::new(Command::WriteBlock, disk, block),
                Some(&mut staging),
            )?;
            trace!(disk = %disk, block = %block, "wrote block");

            if let Some(cache) = self.cache.as_mut() {
                if !cache.update(disk, block, &staging) {
                    cache.insert(disk, block, &staging)?;
                }
            }

            written += take;
            position = position.next_block();
        }
        trace!(addr, len = buf.len(), "write complete");
        Ok(buf.len())
    }

    /// Issue a command and map a nonzero remote return code to an error.
    fn run(&mut self, word: CommandWord, block: Option<&mut Block>) -> Result<()> {
        let code = self.transport.execute(word, block)?;
        if code != 0 {
            return Err(NjbError::Remote { code });
        }
        Ok(())
    }

    /// Position the remote head, skipping commands the mirror shows as
    /// redundant.
    fn seek_if_needed(&mut self, disk: DiskId, block: BlockId) -> Result<()> {
        if self.cursor.block != block {
            self.run(
                CommandWord::new(Command::SeekToBlock, DiskId::ZERO, block),
                None,
            )?;
            self.cursor.block = block;
        }
        if self.cursor.disk != disk {
            self.run(
                CommandWord::new(Command::SeekToDisk, disk, BlockId(0)),
                None,
            )?;
            self.cursor.disk = disk;
        }
        Ok(())
    }

    /// Obtain one block's current content into `staging`, through the cache
    /// when one is present.
    ///
    /// A cache hit issues no wire command and leaves the remote head alone;
    /// a miss issues a read-block (whose auto-advance the mirror tracks) and
    /// makes the block resident.
    fn fetch_block(&mut self, disk: DiskId, block: BlockId, staging: &mut Block) -> Result<()> {
        if let Some(cache) = self.cache.as_mut() {
            if cache.lookup(disk, block, staging) {
                trace!(disk = %disk, block = %block, "cache hit");
                return Ok(());
            }
        }
        self.run(
            CommandWord::new(Command::ReadBlock, disk, block),
            Some(staging),
        )?;
        self.cursor.advance();
        trace!(disk = %disk, block = %block, "read block");
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(disk, block, staging)?;
        }
        Ok(())
    }
}
