#![forbid(unsafe_code)]
//! Error types for the NetJBOD client.
//!
//! # Error Taxonomy
//!
//! Every failure the driver can produce falls into one of three groups,
//! all surfaced synchronously through the single [`NjbError`] enum:
//!
//! | Group | Variants | Origin |
//! |-------|----------|--------|
//! | Validation | `LengthTooLarge`, `OutOfBounds`, `DiskOutOfRange`, `InvalidCapacity`, `DuplicateEntry` | Arguments rejected before any wire traffic |
//! | State | `NotMounted`, `AlreadyMounted` | Operation issued in the wrong session state |
//! | Transport | `Io`, `Protocol`, `Remote` | Socket failures, malformed frames, nonzero remote return codes |
//!
//! Nothing is retried internally and nothing is logged here; callers decide
//! whether a failure is retryable. A transport error in the middle of a
//! multi-block operation aborts the whole call, and bytes already delivered
//! before the failing block are not rolled back.
//!
//! `njb-error` deliberately depends on nothing but `thiserror`, so every
//! other crate in the workspace can return [`Result`] without cycles.

use thiserror::Error;

/// Unified error type for all NetJBOD operations.
#[derive(Debug, Error)]
pub enum NjbError {
    /// Socket-level I/O error (wraps `std::io::Error`).
    ///
    /// Covers connect failures and short or failed reads/writes. The driver
    /// never reconnects on its own.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unexpected wire data.
    ///
    /// Raised when a frame decodes to something the protocol does not
    /// allow: an unknown command value, an out-of-range disk id in a
    /// command word, or a header announcing an illegal frame length.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote array executed the command and reported failure.
    #[error("remote array returned failure code {code}")]
    Remote { code: u16 },

    /// An operation that requires a mounted array was issued while unmounted.
    #[error("array is not mounted")]
    NotMounted,

    /// `mount` was issued while the array is already mounted.
    #[error("array is already mounted")]
    AlreadyMounted,

    /// A single read/write request exceeded the per-call length cap.
    #[error("request length {len} exceeds the {max}-byte limit")]
    LengthTooLarge { len: usize, max: usize },

    /// The request range runs past the end of the array.
    #[error("request out of bounds: addr={addr} len={len}")]
    OutOfBounds { addr: u32, len: usize },

    /// A disk id at or beyond the number of disks in the array.
    #[error("disk id {disk} out of range")]
    DiskOutOfRange { disk: u8 },

    /// Cache capacity outside the supported entry-count range.
    #[error("cache capacity {capacity} out of range (must be 2..=4096)")]
    InvalidCapacity { capacity: usize },

    /// Cache insert for a (disk, block) pair that is already resident.
    #[error("cache entry already present for disk {disk} block {block}")]
    DuplicateEntry { disk: u8, block: u8 },
}

/// Result alias using `NjbError`.
pub type Result<T> = std::result::Result<T, NjbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formatting() {
        let err = NjbError::Remote { code: 7 };
        assert_eq!(err.to_string(), "remote array returned failure code 7");

        let err = NjbError::LengthTooLarge { len: 2048, max: 1024 };
        assert_eq!(
            err.to_string(),
            "request length 2048 exceeds the 1024-byte limit"
        );

        let err = NjbError::OutOfBounds {
            addr: 1_048_570,
            len: 16,
        };
        assert_eq!(err.to_string(), "request out of bounds: addr=1048570 len=16");

        let err = NjbError::DuplicateEntry { disk: 3, block: 42 };
        assert_eq!(
            err.to_string(),
            "cache entry already present for disk 3 block 42"
        );
    }

    #[test]
    fn io_errors_convert_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err = NjbError::from(io);
        assert!(matches!(err, NjbError::Io(_)));
        assert!(err.to_string().contains("short read"));
    }
}
