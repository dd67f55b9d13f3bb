//! # Arena
//!
//! The single contiguous buffer a pool carves into equal-size blocks.

use bytemuck::Pod;

use super::free_list::NODE_SIZE;
use crate::error::{PoolError, PoolResult};

/// Address of a block inside an arena.
///
/// Stored as a byte offset from the arena base, so the arena base itself is
/// [`BlockAddr::BASE`] and slot `k` lives at `k * block_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockAddr(usize);

impl BlockAddr {
    /// The arena base.
    pub const BASE: Self = Self(0);

    /// Creates an address from a byte offset.
    #[inline]
    #[must_use]
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    /// Byte offset from the arena base.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }

    /// Slot index for the given block size.
    #[inline]
    #[must_use]
    pub const fn slot_index(self, block_size: usize) -> usize {
        self.0 / block_size
    }

    /// The address `blocks` blocks further into the arena.
    #[inline]
    #[must_use]
    pub const fn add_blocks(self, blocks: usize, block_size: usize) -> Self {
        Self(self.0 + blocks * block_size)
    }
}

/// Fixed-size backing storage divided into `block_count` blocks.
///
/// The buffer is reserved once in [`Arena::new`] and never resized. It is
/// released exactly once, when the arena is dropped.
///
/// # Example
///
/// ```rust,ignore
/// let arena = Arena::new(1024, 128)?;
/// assert_eq!(arena.block_count(), 8);
/// assert_eq!(arena.slot_addr(1).offset(), 128);
/// ```
pub struct Arena {
    /// The backing storage.
    storage: Box<[u8]>,
    /// Size of one block in bytes.
    block_size: usize,
    /// Number of blocks.
    block_count: usize,
}

impl Arena {
    /// Reserves an arena of `total_size` bytes split into `block_size` blocks.
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidConfiguration`] if the geometry is rejected by
    ///   [`Arena::check_geometry`]
    /// * [`PoolError::OutOfMemory`] if the buffer cannot be reserved
    pub fn new(total_size: usize, block_size: usize) -> PoolResult<Self> {
        Self::check_geometry(total_size, block_size)?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(total_size)
            .map_err(|_| PoolError::OutOfMemory { bytes: total_size })?;
        storage.resize(total_size, 0u8);

        Ok(Self {
            storage: storage.into_boxed_slice(),
            block_size,
            block_count: total_size / block_size,
        })
    }

    /// Validates an arena geometry without reserving anything.
    ///
    /// Both sizes must be positive, `total_size` must be a whole number of
    /// blocks, and a block must be large enough to hold a free-list node.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfiguration`] naming the broken rule.
    pub fn check_geometry(total_size: usize, block_size: usize) -> PoolResult<()> {
        let reason = if block_size == 0 {
            Some("block size must be positive")
        } else if total_size == 0 {
            Some("total size must be positive")
        } else if total_size % block_size != 0 {
            Some("total size is not divisible by block size")
        } else if block_size < NODE_SIZE {
            Some("block size is smaller than a free list node")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(PoolError::InvalidConfiguration {
                total_size,
                block_size,
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.storage.len()
    }

    /// Size of one block in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    /// Address of slot `index`.
    #[inline]
    #[must_use]
    pub const fn slot_addr(&self, index: usize) -> BlockAddr {
        BlockAddr::BASE.add_blocks(index, self.block_size)
    }

    /// Returns true if `addr` is the start of one of this arena's blocks.
    #[inline]
    #[must_use]
    pub fn is_slot(&self, addr: BlockAddr) -> bool {
        addr.offset() < self.storage.len() && addr.offset() % self.block_size == 0
    }

    /// Bytes of the block at `addr`. The caller has checked [`Arena::is_slot`].
    #[inline]
    pub(crate) fn block(&self, addr: BlockAddr) -> &[u8] {
        let start = addr.offset();
        &self.storage[start..start + self.block_size]
    }

    /// Mutable bytes of the block at `addr`.
    #[inline]
    pub(crate) fn block_mut(&mut self, addr: BlockAddr) -> &mut [u8] {
        let start = addr.offset();
        &mut self.storage[start..start + self.block_size]
    }

    /// Reads a Pod value from the head of the block at `addr`.
    ///
    /// The arena is a byte buffer, so the read is unaligned.
    #[inline]
    pub(crate) fn read_pod<T: Pod>(&self, addr: BlockAddr) -> T {
        let size = std::mem::size_of::<T>();
        bytemuck::pod_read_unaligned(&self.block(addr)[..size])
    }

    /// Writes a Pod value over the head of the block at `addr`.
    #[inline]
    pub(crate) fn write_pod<T: Pod>(&mut self, addr: BlockAddr, value: &T) {
        let bytes = bytemuck::bytes_of(value);
        self.block_mut(addr)[..bytes.len()].copy_from_slice(bytes);
    }
}
