#![forbid(unsafe_code)]
//! Wire protocol codec for the remote JBOD array.
//!
//! This crate is the single source of truth for wire compatibility: nothing
//! outside it shifts bits of the command word or packs header bytes by hand.
//!
//! # Command word
//!
//! A 32-bit word addressing one command at one (disk, block):
//!
//! | bits  | field    | width |
//! |-------|----------|-------|
//! | 0–7   | block id | 8     |
//! | 8–21  | reserved | 14    |
//! | 22–25 | disk id  | 4     |
//! | 26–31 | command  | 6     |
//!
//! Reserved bits are zero on encode and ignored on decode.
//!
//! # Packet framing
//!
//! Each exchange is one request frame out, one response frame in. A frame is
//! an 8-byte header (`length:u16 | opcode:u32 | return_code:u16`, all
//! big-endian) optionally followed by exactly one 256-byte block payload.
//! The payload is present iff `length > HEADER_LEN`: a [`Command::WriteBlock`]
//! request carries the data to write, and the response to a
//! [`Command::ReadBlock`] carries the data read.

use njb_error::{NjbError, Result};
use njb_types::{BlockId, DiskId, BLOCK_SIZE};

/// Bytes in a packet header.
pub const HEADER_LEN: usize = 8;
/// Bytes in a block payload.
pub const PAYLOAD_LEN: usize = BLOCK_SIZE;

const BLOCK_MASK: u32 = 0xFF;
const DISK_SHIFT: u32 = 22;
const DISK_MASK: u32 = 0xF;
const COMMAND_SHIFT: u32 = 26;
const COMMAND_MASK: u32 = 0x3F;

/// Commands understood by the remote array.
///
/// Discriminants are wire values. Seeks position the array head explicitly;
/// `ReadBlock` reads at the head and advances it by one block as a side
/// effect, `WriteBlock` writes at the head and leaves it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Mount = 0,
    Unmount = 1,
    SeekToDisk = 2,
    SeekToBlock = 3,
    ReadBlock = 4,
    WriteBlock = 5,
}

impl Command {
    /// Whether a request frame for this command carries a block payload.
    #[must_use]
    pub fn carries_payload(self) -> bool {
        matches!(self, Self::WriteBlock)
    }
}

impl TryFrom<u8> for Command {
    type Error = NjbError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Mount),
            1 => Ok(Self::Unmount),
            2 => Ok(Self::SeekToDisk),
            3 => Ok(Self::SeekToBlock),
            4 => Ok(Self::ReadBlock),
            5 => Ok(Self::WriteBlock),
            other => Err(NjbError::Protocol(format!("unknown command value {other}"))),
        }
    }
}

/// Decoded form of the 32-bit command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandWord {
    pub command: Command,
    pub disk: DiskId,
    pub block: BlockId,
}

impl CommandWord {
    #[must_use]
    pub fn new(command: Command, disk: DiskId, block: BlockId) -> Self {
        Self {
            command,
            disk,
            block,
        }
    }

    /// A command addressed at disk 0, block 0 (mount/unmount).
    #[must_use]
    pub fn control(command: Command) -> Self {
        Self::new(command, DiskId::ZERO, BlockId(0))
    }

    /// Pack into the wire layout; reserved bits are zero.
    #[must_use]
    pub fn encode(self) -> u32 {
        u32::from(self.block.0)
            | (u32::from(self.disk.get()) << DISK_SHIFT)
            | (u32::from(self.command as u8) << COMMAND_SHIFT)
    }

    /// Unpack from the wire layout; reserved bits are ignored.
    pub fn decode(word: u32) -> Result<Self> {
        let command = Command::try_from(((word >> COMMAND_SHIFT) & COMMAND_MASK) as u8)?;
        let disk = DiskId::new(((word >> DISK_SHIFT) & DISK_MASK) as u8)?;
        let block = BlockId((word & BLOCK_MASK) as u8);
        Ok(Self {
            command,
            disk,
            block,
        })
    }
}

/// Packet header, the fixed 8-byte prefix of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total frame length: `HEADER_LEN`, or `HEADER_LEN + PAYLOAD_LEN`
    /// when a payload follows.
    pub length: u16,
    /// The raw command word this frame carries or responds to.
    pub opcode: u32,
    /// Remote result, 0 = success. Zero in requests.
    pub return_code: u16,
}

impl PacketHeader {
    /// Build a request header for `word`, sizing the frame by whether the
    /// command carries a payload.
    #[must_use]
    pub fn request(word: CommandWord) -> Self {
        let length = if word.command.carries_payload() {
            (HEADER_LEN + PAYLOAD_LEN) as u16
        } else {
            HEADER_LEN as u16
        };
        Self {
            length,
            opcode: word.encode(),
            return_code: 0,
        }
    }

    /// Serialize in network byte order.
    #[must_use]
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0_u8; HEADER_LEN];
        out[0..2].copy_from_slice(&self.length.to_be_bytes());
        out[2..6].copy_from_slice(&self.opcode.to_be_bytes());
        out[6..8].copy_from_slice(&self.return_code.to_be_bytes());
        out
    }

    /// Deserialize from network byte order.
    #[must_use]
    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self {
            length: u16::from_be_bytes([bytes[0], bytes[1]]),
            opcode: u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
            return_code: u16::from_be_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Whether this header announces a 256-byte payload after it.
    #[must_use]
    pub fn has_payload(self) -> bool {
        usize::from(self.length) > HEADER_LEN
    }

    /// Reject frame lengths the protocol does not define.
    pub fn validate(self) -> Result<()> {
        let length = usize::from(self.length);
        if length != HEADER_LEN && length != HEADER_LEN + PAYLOAD_LEN {
            return Err(NjbError::Protocol(format!(
                "illegal frame length {length} (expected {HEADER_LEN} or {})",
                HEADER_LEN + PAYLOAD_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(command: Command, disk: u8, block: u8) -> CommandWord {
        CommandWord::new(command, DiskId::new(disk).unwrap(), BlockId(block))
    }

    #[test]
    fn command_word_bit_placement() {
        // ReadBlock=4 at disk 3, block 0x2A:
        //   4 << 26 | 3 << 22 | 0x2A = 0x10C0_002A
        assert_eq!(word(Command::ReadBlock, 3, 0x2A).encode(), 0x10C0_002A);

        // Mount encodes as all-zero fields.
        assert_eq!(CommandWord::control(Command::Mount).encode(), 0);

        // WriteBlock=5 at disk 15, block 255 sets the extremes.
        assert_eq!(
            word(Command::WriteBlock, 15, 255).encode(),
            (5 << 26) | (15 << 22) | 0xFF
        );
    }

    #[test]
    fn reserved_bits_are_zero_on_encode() {
        let encoded = word(Command::SeekToBlock, 15, 255).encode();
        assert_eq!(encoded & 0x003F_FF00, 0);
    }

    #[test]
    fn decode_ignores_reserved_bits() {
        let clean = word(Command::ReadBlock, 3, 0x2A);
        let dirty = clean.encode() | 0x003F_FF00;
        assert_eq!(CommandWord::decode(dirty).unwrap(), clean);
    }

    #[test]
    fn decode_rejects_unknown_command() {
        // Command field 0x3F is not assigned.
        let bad = 0x3F_u32 << 26;
        assert!(matches!(
            CommandWord::decode(bad),
            Err(NjbError::Protocol(_))
        ));
    }

    #[test]
    fn round_trip_all_commands() {
        for command in [
            Command::Mount,
            Command::Unmount,
            Command::SeekToDisk,
            Command::SeekToBlock,
            Command::ReadBlock,
            Command::WriteBlock,
        ] {
            let w = word(command, 7, 13);
            assert_eq!(CommandWord::decode(w.encode()).unwrap(), w);
        }
    }

    #[test]
    fn header_network_byte_order() {
        let header = PacketHeader {
            length: 264,
            opcode: 0x10C0_002A,
            return_code: 1,
        };
        assert_eq!(
            header.to_bytes(),
            [0x01, 0x08, 0x10, 0xC0, 0x00, 0x2A, 0x00, 0x01]
        );
        assert_eq!(PacketHeader::from_bytes(header.to_bytes()), header);
    }

    #[test]
    fn request_header_sizes_frame_by_command() {
        let bare = PacketHeader::request(word(Command::ReadBlock, 0, 0));
        assert_eq!(usize::from(bare.length), HEADER_LEN);
        assert!(!bare.has_payload());
        assert!(bare.validate().is_ok());

        let full = PacketHeader::request(word(Command::WriteBlock, 0, 0));
        assert_eq!(usize::from(full.length), HEADER_LEN + PAYLOAD_LEN);
        assert!(full.has_payload());
        assert!(full.validate().is_ok());
    }

    #[test]
    fn validate_rejects_odd_lengths() {
        for length in [0_u16, 7, 9, 263, 265, u16::MAX] {
            let header = PacketHeader {
                length,
                opcode: 0,
                return_code: 0,
            };
            assert!(header.validate().is_err(), "length {length} should fail");
        }
    }
}
