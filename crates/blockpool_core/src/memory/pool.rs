//! # Block Pool
//!
//! Fixed-size block allocator over a single pre-reserved arena.

use tracing::{debug, trace, warn};

use super::arena::{Arena, BlockAddr};
use super::free_list::{FreeAddresses, FreeList};
use crate::config::{PoolConfig, RunPolicy};
use crate::error::{InvariantViolation, PoolError, PoolResult};

/// Ownership of one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// On the free list; the pool owns the bytes.
    Free,
    /// Handed out; the caller owns the bytes.
    Acquired,
}

/// Running counters for a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Calls to [`BlockPool::acquire`].
    pub acquire_calls: u64,
    /// Acquire calls that returned an error.
    pub failed_acquires: u64,
    /// Calls to [`BlockPool::release`].
    pub release_calls: u64,
    /// Release calls that were rejected.
    pub rejected_releases: u64,
    /// Highest number of blocks acquired at once.
    pub peak_acquired_blocks: usize,
}

/// What was left when a pool was destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestroySummary {
    /// Blocks in the arena.
    pub block_count: usize,
    /// Blocks still acquired at destruction. Their addresses are now dangling.
    pub outstanding_blocks: usize,
    /// Final counters.
    pub stats: PoolStats,
}

/// A fixed-block-size memory pool.
///
/// One arena is reserved at creation and carved into `block_count` blocks.
/// Free blocks are threaded onto an address-ordered free list stored inside
/// the blocks themselves, so bookkeeping costs no extra memory beyond one
/// ownership tag per slot. Nothing is allocated after [`BlockPool::create`].
///
/// # Ownership
///
/// Every slot is either [`SlotState::Free`] (its first bytes are list
/// metadata) or [`SlotState::Acquired`] (its bytes belong to the caller).
/// Byte access through [`BlockPool::block_mut`] is only granted for acquired
/// slots, and [`BlockPool::release`] rejects slots that are already free, so
/// caller writes can never reach the list headers.
///
/// # Multi-block runs
///
/// `acquire` returns only the first address of a run. The pool keeps no
/// record of run lengths: each block of a run must be released on its own.
/// See [`RunPolicy`] for how runs are chosen.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Wrap the whole pool in a mutex if several
/// threads need it.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = BlockPool::create(1024, 128)?;
///
/// let a = pool.acquire(128)?;
/// pool.block_mut(a)?.fill(0xAB);
/// pool.release(a)?;
///
/// // Address-sorted reinsertion hands the same block back
/// assert_eq!(pool.acquire(128)?, a);
/// ```
pub struct BlockPool {
    /// Backing storage.
    arena: Arena,
    /// Free blocks, ascending by address.
    free_list: FreeList,
    /// Ownership tag per slot.
    slots: Box<[SlotState]>,
    /// Run search policy.
    run_policy: RunPolicy,
    /// Counters.
    stats: PoolStats,
}

impl BlockPool {
    /// Creates a pool of `total_size` bytes in blocks of `block_size` bytes,
    /// using [`RunPolicy::ListOrder`].
    ///
    /// # Errors
    ///
    /// * [`PoolError::InvalidConfiguration`] if the sizes are unusable
    /// * [`PoolError::OutOfMemory`] if the arena cannot be reserved
    pub fn create(total_size: usize, block_size: usize) -> PoolResult<Self> {
        Self::with_config(&PoolConfig::new(total_size, block_size))
    }

    /// Creates a pool from a configuration.
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::create`].
    pub fn with_config(config: &PoolConfig) -> PoolResult<Self> {
        let mut arena = Arena::new(config.total_size, config.block_size)?;
        let block_count = arena.block_count();

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(block_count)
            .map_err(|_| PoolError::OutOfMemory {
                bytes: block_count * std::mem::size_of::<SlotState>(),
            })?;
        slots.resize(block_count, SlotState::Free);

        let free_list = FreeList::thread(&mut arena);

        debug!(
            total_size = config.total_size,
            block_size = config.block_size,
            block_count,
            run_policy = ?config.run_policy,
            "block pool created"
        );

        Ok(Self {
            arena,
            free_list,
            slots: slots.into_boxed_slice(),
            run_policy: config.run_policy,
            stats: PoolStats::default(),
        })
    }

    /// Total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.arena.total_size()
    }

    /// Size of one block in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.arena.block_size()
    }

    /// Number of blocks in the arena.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.arena.block_count()
    }

    /// Number of blocks on the free list.
    #[inline]
    #[must_use]
    pub const fn free_blocks(&self) -> usize {
        self.free_list.len()
    }

    /// Number of blocks currently handed out.
    #[inline]
    #[must_use]
    pub const fn acquired_blocks(&self) -> usize {
        self.block_count() - self.free_blocks()
    }

    /// The run search policy.
    #[inline]
    #[must_use]
    pub const fn run_policy(&self) -> RunPolicy {
        self.run_policy
    }

    /// Counters accumulated since creation.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Ownership of the slot at `addr`, or `None` if `addr` is not a slot.
    #[must_use]
    pub fn slot_state(&self, addr: BlockAddr) -> Option<SlotState> {
        if !self.arena.is_slot(addr) {
            return None;
        }
        Some(self.slots[addr.slot_index(self.block_size())])
    }

    /// Acquires `requested_size / block_size` blocks and returns the address
    /// of the first.
    ///
    /// Runs are searched from the head of the free list as described by the
    /// pool's [`RunPolicy`]. Traversal is linear in the number of free blocks.
    ///
    /// # Errors
    ///
    /// * [`PoolError::SizeNotBlockAligned`] if `requested_size` is not a
    ///   multiple of the block size
    /// * [`PoolError::EmptyRequest`] if `requested_size` is zero
    /// * [`PoolError::InsufficientContiguousMemory`] if no run is found; the
    ///   free list is left untouched
    pub fn acquire(&mut self, requested_size: usize) -> PoolResult<BlockAddr> {
        self.stats.acquire_calls += 1;

        let result = self.acquire_run(requested_size);
        match &result {
            Ok(addr) => trace!(offset = addr.offset(), requested_size, "acquired"),
            Err(err) => {
                self.stats.failed_acquires += 1;
                trace!(requested_size, %err, "acquire failed");
            }
        }
        result
    }

    fn acquire_run(&mut self, requested_size: usize) -> PoolResult<BlockAddr> {
        let block_size = self.block_size();
        if requested_size % block_size != 0 {
            return Err(PoolError::SizeNotBlockAligned {
                requested: requested_size,
                block_size,
            });
        }

        let blocks = requested_size / block_size;
        if blocks == 0 {
            return Err(PoolError::EmptyRequest);
        }

        let run = self
            .free_list
            .find_run(&self.arena, blocks, self.run_policy)
            .ok_or(PoolError::InsufficientContiguousMemory {
                requested_blocks: blocks,
                free_blocks: self.free_list.len(),
            })?;

        let slots = &mut self.slots;
        self.free_list.unlink_run(&mut self.arena, &run, |addr| {
            slots[addr.slot_index(block_size)] = SlotState::Acquired;
        });

        self.stats.peak_acquired_blocks = self.stats.peak_acquired_blocks.max(self.acquired_blocks());
        Ok(run.start())
    }

    /// Returns the single block at `addr` to the free list.
    ///
    /// The block is reinserted at its address-sorted position. No coalescing
    /// is done. Blocks of a multi-block run are released one call each.
    ///
    /// # Errors
    ///
    /// * [`PoolError::ForeignAddress`] if `addr` is not a block of this pool
    /// * [`PoolError::DoubleRelease`] if the block is already free
    ///
    /// A rejected release leaves the pool unchanged.
    pub fn release(&mut self, addr: BlockAddr) -> PoolResult<()> {
        self.stats.release_calls += 1;

        let slot = match self.acquired_slot(addr) {
            Ok(slot) => slot,
            Err(err) => {
                let err = match err {
                    PoolError::BlockNotAcquired { offset } => PoolError::DoubleRelease { offset },
                    other => other,
                };
                self.stats.rejected_releases += 1;
                warn!(offset = addr.offset(), %err, "release rejected");
                return Err(err);
            }
        };

        self.free_list.insert(&mut self.arena, addr);
        self.slots[slot] = SlotState::Free;
        trace!(offset = addr.offset(), "released");
        Ok(())
    }

    /// Releases the arena. Addresses still acquired become dangling.
    pub fn destroy(self) -> DestroySummary {
        let summary = DestroySummary {
            block_count: self.block_count(),
            outstanding_blocks: self.acquired_blocks(),
            stats: self.stats,
        };

        if summary.outstanding_blocks > 0 {
            warn!(
                outstanding = summary.outstanding_blocks,
                "block pool destroyed with blocks still acquired"
            );
        }
        debug!(block_count = summary.block_count, "block pool destroyed");

        summary
    }

    /// Bytes of the acquired block at `addr`.
    ///
    /// # Errors
    ///
    /// * [`PoolError::ForeignAddress`] if `addr` is not a block of this pool
    /// * [`PoolError::BlockNotAcquired`] if the block is free
    pub fn block(&self, addr: BlockAddr) -> PoolResult<&[u8]> {
        self.acquired_slot(addr)?;
        Ok(self.arena.block(addr))
    }

    /// Mutable bytes of the acquired block at `addr`.
    ///
    /// # Errors
    ///
    /// Same as [`BlockPool::block`].
    pub fn block_mut(&mut self, addr: BlockAddr) -> PoolResult<&mut [u8]> {
        self.acquired_slot(addr)?;
        Ok(self.arena.block_mut(addr))
    }

    fn acquired_slot(&self, addr: BlockAddr) -> PoolResult<usize> {
        match self.slot_state(addr) {
            None => Err(PoolError::ForeignAddress {
                offset: addr.offset(),
            }),
            Some(SlotState::Free) => Err(PoolError::BlockNotAcquired {
                offset: addr.offset(),
            }),
            Some(SlotState::Acquired) => Ok(addr.slot_index(self.block_size())),
        }
    }

    /// Free block addresses, walking the list from the head.
    pub fn free_addresses(&self) -> FreeAddresses<'_> {
        self.free_list.iter(&self.arena)
    }

    /// Length in blocks of the longest run of address-adjacent free blocks.
    ///
    /// Under [`RunPolicy::AddressOrder`] this is the largest request, in
    /// blocks, that can currently succeed.
    #[must_use]
    pub fn largest_free_run(&self) -> usize {
        let block_size = self.block_size();
        let mut longest = 0;
        let mut current = 0;
        let mut prev: Option<BlockAddr> = None;

        for addr in self.free_addresses() {
            current = match prev {
                Some(p) if p.add_blocks(1, block_size) == addr => current + 1,
                _ => 1,
            };
            longest = longest.max(current);
            prev = Some(addr);
        }
        longest
    }

    /// Walks the free list and checks it against the slot tags.
    ///
    /// Checked: strictly ascending addresses, every node on a block boundary
    /// inside the arena, every header carrying the block size, no listed node
    /// tagged as acquired, and the walked length matching both the recorded
    /// length and the number of free tags.
    ///
    /// # Errors
    ///
    /// The first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let block_size = self.block_size();
        let mut prev: Option<BlockAddr> = None;
        let mut walked = 0;

        for addr in self.free_addresses() {
            if !self.arena.is_slot(addr) {
                return Err(InvariantViolation::MisplacedNode {
                    offset: addr.offset(),
                });
            }
            if let Some(p) = prev {
                if p >= addr {
                    return Err(InvariantViolation::OutOfOrder {
                        prev: p.offset(),
                        next: addr.offset(),
                    });
                }
            }

            let size = FreeList::node(&self.arena, addr).size();
            if size != block_size as u64 {
                return Err(InvariantViolation::BadNodeSize {
                    offset: addr.offset(),
                    size,
                    expected: block_size,
                });
            }
            if self.slots[addr.slot_index(block_size)] == SlotState::Acquired {
                return Err(InvariantViolation::AcquiredNodeListed {
                    offset: addr.offset(),
                });
            }

            walked += 1;
            prev = Some(addr);
        }

        let tagged = self.slots.iter().filter(|s| **s == SlotState::Free).count();
        let recorded = self.free_list.len();
        if walked != tagged || walked != recorded {
            return Err(InvariantViolation::LengthMismatch {
                walked,
                tagged,
                recorded,
            });
        }
        Ok(())
    }
}
