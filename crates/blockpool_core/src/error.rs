//! # Pool Error Types
//!
//! All errors that can occur while building or using a block pool.

use thiserror::Error;

/// Errors returned by pool construction, allocation and release.
///
/// Every variant is recoverable. The pool never aborts the process on an
/// allocator error; what to do about it is the caller's decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool geometry is unusable.
    #[error("invalid configuration: total size {total_size} with block size {block_size}: {reason}")]
    InvalidConfiguration {
        /// Requested arena size in bytes.
        total_size: usize,
        /// Requested block size in bytes.
        block_size: usize,
        /// Which rule was broken.
        reason: &'static str,
    },

    /// The backing arena could not be reserved.
    #[error("out of memory: failed to reserve {bytes} bytes for the arena")]
    OutOfMemory {
        /// Size of the failed reservation.
        bytes: usize,
    },

    /// Requested size is not a whole number of blocks.
    #[error("size {requested} is not a multiple of block size {block_size}")]
    SizeNotBlockAligned {
        /// Requested size in bytes.
        requested: usize,
        /// The pool's block size.
        block_size: usize,
    },

    /// No run of the requested length is available.
    #[error("insufficient contiguous memory: need {requested_blocks} blocks, {free_blocks} free")]
    InsufficientContiguousMemory {
        /// Blocks the request needed.
        requested_blocks: usize,
        /// Blocks free at the time of the request.
        free_blocks: usize,
    },

    /// A zero-byte request.
    #[error("requested size must cover at least one block")]
    EmptyRequest,

    /// Address lies outside the arena or off a block boundary.
    #[error("address {offset:#x} does not name a block of this pool")]
    ForeignAddress {
        /// Offset of the rejected address.
        offset: usize,
    },

    /// Block is already on the free list.
    #[error("block at {offset:#x} released twice")]
    DoubleRelease {
        /// Offset of the block.
        offset: usize,
    },

    /// Block access attempted on a free slot.
    #[error("block at {offset:#x} is not currently acquired")]
    BlockNotAcquired {
        /// Offset of the block.
        offset: usize,
    },

    /// Configuration source could not be read or parsed.
    #[error("invalid configuration file: {0}")]
    InvalidConfig(String),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// A broken free-list invariant found by
/// [`BlockPool::check_invariants`](crate::BlockPool::check_invariants).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Two consecutive nodes are not in strictly increasing address order.
    #[error("free list out of order: {prev:#x} followed by {next:#x}")]
    OutOfOrder {
        /// Offset of the earlier node.
        prev: usize,
        /// Offset of the node that follows it.
        next: usize,
    },

    /// A node lies outside the arena or off a block boundary.
    #[error("free list node at {offset:#x} is not a block slot")]
    MisplacedNode {
        /// Offset of the node.
        offset: usize,
    },

    /// A node header carries a size other than the block size.
    #[error("free list node at {offset:#x} has size {size}, expected {expected}")]
    BadNodeSize {
        /// Offset of the node.
        offset: usize,
        /// Size stored in the header.
        size: u64,
        /// The pool's block size.
        expected: usize,
    },

    /// A listed node is tagged as acquired.
    #[error("free list node at {offset:#x} is tagged as acquired")]
    AcquiredNodeListed {
        /// Offset of the node.
        offset: usize,
    },

    /// The walked node count disagrees with the bookkeeping.
    #[error("free list holds {walked} nodes but {tagged} slots are tagged free (recorded length {recorded})")]
    LengthMismatch {
        /// Nodes reached by walking from the head.
        walked: usize,
        /// Slots tagged free.
        tagged: usize,
        /// Length recorded by the list.
        recorded: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PoolError::SizeNotBlockAligned {
            requested: 100,
            block_size: 128,
        };
        assert_eq!(err.to_string(), "size 100 is not a multiple of block size 128");

        let err = PoolError::DoubleRelease { offset: 256 };
        assert_eq!(err.to_string(), "block at 0x100 released twice");
    }
}
