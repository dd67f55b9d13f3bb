//! # Intrusive Free List
//!
//! Address-ordered singly linked list whose nodes live inside the free blocks
//! of an [`Arena`]. A block is either on this list, in which case its first
//! [`NODE_SIZE`] bytes are a [`FreeNode`] header, or handed out to a caller,
//! in which case the list never reads or writes it.
//!
//! ```text
//!  head
//!   │
//!   ▼
//! ┌──────────┬──────────┬──────────┬──────────┐
//! │ free  ───┼─► used   │ free  ───┼─► free ─►∅
//! └──────────┴──────────┴──────────┴──────────┘
//!  block 0    block 1    block 2    block 3
//! ```
//!
//! Links are byte offsets into the arena; [`NIL`] terminates the list.

use bytemuck::{Pod, Zeroable};

use super::arena::{Arena, BlockAddr};
use crate::config::RunPolicy;

/// Bytes a free block gives up to its list header.
pub const NODE_SIZE: usize = std::mem::size_of::<FreeNode>();

/// Link value meaning "no next node".
const NIL: u64 = u64::MAX;

/// Header written at the start of every free block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub(crate) struct FreeNode {
    /// Bytes covered by this node. Always the block size.
    size: u64,
    /// Offset of the next free node, or [`NIL`].
    next: u64,
}

impl FreeNode {
    /// Bytes covered by this node.
    #[inline]
    pub(crate) const fn size(self) -> u64 {
        self.size
    }

    /// The next node, if any.
    #[inline]
    pub(crate) fn next(self) -> Option<BlockAddr> {
        decode(self.next)
    }
}

#[inline]
fn encode(link: Option<BlockAddr>) -> u64 {
    link.map_or(NIL, |addr| addr.offset() as u64)
}

#[inline]
fn decode(raw: u64) -> Option<BlockAddr> {
    if raw == NIL {
        return None;
    }
    usize::try_from(raw).ok().map(BlockAddr::from_offset)
}

/// A run of list-adjacent nodes chosen to satisfy one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Run {
    /// Node linked to `start`, or `None` if `start` is the head.
    prev: Option<BlockAddr>,
    /// First node of the run; the address handed to the caller.
    start: BlockAddr,
    /// Last node of the run.
    end: BlockAddr,
    /// Number of nodes in the run.
    blocks: usize,
}

impl Run {
    /// First node of the run.
    #[inline]
    pub(crate) const fn start(&self) -> BlockAddr {
        self.start
    }
}

/// Head and length of the free list. The links themselves live in the arena.
#[derive(Debug)]
pub(crate) struct FreeList {
    head: Option<BlockAddr>,
    len: usize,
}

impl FreeList {
    /// Threads every block of `arena` onto a new list in address order.
    pub(crate) fn thread(arena: &mut Arena) -> Self {
        let count = arena.block_count();
        let size = arena.block_size() as u64;

        for index in 0..count {
            let addr = arena.slot_addr(index);
            let next = (index + 1 < count).then(|| arena.slot_addr(index + 1));
            arena.write_pod(addr, &FreeNode { size, next: encode(next) });
        }

        Self {
            head: (count > 0).then_some(BlockAddr::BASE),
            len: count,
        }
    }

    /// Number of nodes on the list.
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Reads the header of the node at `addr`.
    #[inline]
    pub(crate) fn node(arena: &Arena, addr: BlockAddr) -> FreeNode {
        arena.read_pod(addr)
    }

    fn set_next(arena: &mut Arena, addr: BlockAddr, next: Option<BlockAddr>) {
        let mut node = Self::node(arena, addr);
        node.next = encode(next);
        arena.write_pod(addr, &node);
    }

    /// Walks the list from the head.
    pub(crate) fn iter<'a>(&self, arena: &'a Arena) -> FreeAddresses<'a> {
        FreeAddresses {
            arena,
            current: self.head,
            remaining: arena.block_count(),
        }
    }

    /// Looks for `blocks` consecutive list nodes.
    ///
    /// Under [`RunPolicy::ListOrder`] the count never resets, so the run is
    /// simply the first `blocks` nodes of the list whether or not they touch
    /// in memory. Under [`RunPolicy::AddressOrder`] the run restarts whenever
    /// the next node is not exactly one block past the previous one.
    pub(crate) fn find_run(&self, arena: &Arena, blocks: usize, policy: RunPolicy) -> Option<Run> {
        if blocks == 0 || blocks > self.len {
            return None;
        }

        let block_size = arena.block_size();
        let mut prev: Option<BlockAddr> = None;
        let mut before_start: Option<BlockAddr> = None;
        let mut start = self.head?;
        let mut count = 0;
        let mut current = self.head;

        while let Some(addr) = current {
            let broken = policy == RunPolicy::AddressOrder
                && prev.is_some_and(|p| p.add_blocks(1, block_size) != addr);
            if broken {
                count = 0;
            }
            if count == 0 {
                start = addr;
                before_start = prev;
            }
            count += 1;

            if count == blocks {
                return Some(Run {
                    prev: before_start,
                    start,
                    end: addr,
                    blocks,
                });
            }

            prev = Some(addr);
            current = Self::node(arena, addr).next();
        }

        None
    }

    /// Unlinks `run`, handing each removed node to `on_unlink` in list order.
    ///
    /// Nodes are read before they are reported, so `on_unlink` may treat the
    /// block as caller-owned immediately.
    pub(crate) fn unlink_run(
        &mut self,
        arena: &mut Arena,
        run: &Run,
        mut on_unlink: impl FnMut(BlockAddr),
    ) {
        let after = Self::node(arena, run.end).next();

        let mut cursor = Some(run.start);
        for _ in 0..run.blocks {
            let Some(addr) = cursor else { break };
            cursor = Self::node(arena, addr).next();
            on_unlink(addr);
        }

        match run.prev {
            None => self.head = after,
            Some(prev) => Self::set_next(arena, prev, after),
        }
        self.len -= run.blocks;
    }

    /// Inserts a single-block node at `addr`, keeping the list address-sorted.
    ///
    /// The block at `addr` must not already be on the list.
    pub(crate) fn insert(&mut self, arena: &mut Arena, addr: BlockAddr) {
        let mut prev: Option<BlockAddr> = None;
        let mut current = self.head;

        while let Some(node) = current {
            if node >= addr {
                break;
            }
            prev = Some(node);
            current = Self::node(arena, node).next();
        }

        let size = arena.block_size() as u64;
        arena.write_pod(
            addr,
            &FreeNode {
                size,
                next: encode(current),
            },
        );

        match prev {
            None => self.head = Some(addr),
            Some(prev) => Self::set_next(arena, prev, Some(addr)),
        }
        self.len += 1;
    }
}

/// Iterator over free block addresses, head first.
///
/// Stops after visiting as many nodes as the arena has slots, so a damaged
/// list can never loop forever.
pub struct FreeAddresses<'a> {
    arena: &'a Arena,
    current: Option<BlockAddr>,
    remaining: usize,
}

impl Iterator for FreeAddresses<'_> {
    type Item = BlockAddr;

    fn next(&mut self) -> Option<Self::Item> {
        let addr = self.current?;
        if self.remaining == 0 {
            self.current = None;
            return None;
        }
        self.remaining -= 1;

        self.current = if self.arena.is_slot(addr) {
            FreeList::node(self.arena, addr).next()
        } else {
            None
        };
        Some(addr)
    }
}
