//! # Block Pool Property Tests
//!
//! Behavioural checks of the pool through its public API:
//!
//! 1. **Geometry**: construction succeeds only for usable sizes
//! 2. **Capacity**: exactly `block_count` single-block acquisitions fit
//! 3. **Ordering**: the free list stays sorted and on block boundaries
//! 4. **Fragmentation**: no coalescing, and the list-order run gap
//!
//! Run with: cargo test --package blockpool_core --test pool_properties

use blockpool_core::{BlockAddr, BlockPool, PoolConfig, PoolError, RunPolicy, SlotState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn assert_sorted_and_aligned(pool: &BlockPool) {
    let addrs: Vec<BlockAddr> = pool.free_addresses().collect();
    for pair in addrs.windows(2) {
        assert!(pair[0] < pair[1], "free list out of order: {addrs:?}");
    }
    for addr in &addrs {
        assert_eq!(addr.offset() % pool.block_size(), 0);
        assert!(addr.offset() < pool.total_size());
    }
    pool.check_invariants().unwrap();
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[test]
fn create_requires_divisible_positive_sizes() {
    let cases = [
        (1024, 128, true),
        (1024, 1024, true),
        (4096, 16, true),
        (1000, 128, false),
        (1024, 0, false),
        (0, 128, false),
        (129, 128, false),
    ];

    for (total, block, ok) in cases {
        let result = BlockPool::create(total, block);
        assert_eq!(result.is_ok(), ok, "create({total}, {block})");
        if !ok {
            assert!(matches!(result, Err(PoolError::InvalidConfiguration { .. })));
        }
    }
}

#[test]
fn create_rejects_blocks_smaller_than_a_node() {
    assert!(matches!(
        BlockPool::create(80, 8),
        Err(PoolError::InvalidConfiguration { .. })
    ));
}

#[test]
fn create_reports_out_of_memory() {
    let total = usize::MAX - (usize::MAX % 4096);
    assert_eq!(
        BlockPool::create(total, 4096).err(),
        Some(PoolError::OutOfMemory { bytes: total })
    );
}

// ============================================================================
// CAPACITY, DISTINCTNESS, REUSE
// ============================================================================

#[test]
fn initial_capacity_is_block_count() {
    for (total, block) in [(1024, 128), (4096, 64), (256, 256)] {
        let mut pool = BlockPool::create(total, block).unwrap();
        let count = total / block;

        for _ in 0..count {
            pool.acquire(block).unwrap();
        }
        assert!(matches!(
            pool.acquire(block),
            Err(PoolError::InsufficientContiguousMemory { .. })
        ));
    }
}

#[test]
fn successive_acquires_are_distinct() {
    let mut pool = BlockPool::create(1024, 128).unwrap();
    let a = pool.acquire(128).unwrap();
    let b = pool.acquire(128).unwrap();
    assert_ne!(a, b);
}

#[test]
fn released_block_is_reused_first() {
    let mut pool = BlockPool::create(2048, 128).unwrap();
    let addrs: Vec<_> = (0..10).map(|_| pool.acquire(128).unwrap()).collect();

    pool.release(addrs[6]).unwrap();
    assert_eq!(pool.acquire(128).unwrap(), addrs[6]);
}

#[test]
fn unaligned_sizes_are_rejected() {
    let mut pool = BlockPool::create(1024, 128).unwrap();

    for size in (1..=1024).filter(|s| s % 128 != 0) {
        assert_eq!(
            pool.acquire(size),
            Err(PoolError::SizeNotBlockAligned {
                requested: size,
                block_size: 128,
            })
        );
    }
    assert_eq!(pool.free_blocks(), 8);
}

#[test]
fn reference_walkthrough() {
    let mut pool = BlockPool::create(1024, 128).unwrap();
    assert_eq!(pool.block_count(), 8);

    let a0 = pool.acquire(128).unwrap();
    assert_eq!(a0, BlockAddr::BASE);
    let a1 = pool.acquire(128).unwrap();
    assert_eq!(a1.offset(), a0.offset() + 128);

    for _ in 0..6 {
        pool.acquire(128).unwrap();
    }
    assert_eq!(
        pool.acquire(128),
        Err(PoolError::InsufficientContiguousMemory {
            requested_blocks: 1,
            free_blocks: 0,
        })
    );

    pool.release(a0).unwrap();
    assert_eq!(pool.acquire(128).unwrap(), a0);
}

// ============================================================================
// ORDERING
// ============================================================================

#[test]
fn out_of_order_releases_keep_list_sorted() {
    let mut pool = BlockPool::create(1024, 128).unwrap();
    let addrs: Vec<_> = (0..8).map(|_| pool.acquire(128).unwrap()).collect();

    for index in [5, 1, 7, 0, 3] {
        pool.release(addrs[index]).unwrap();
        assert_sorted_and_aligned(&pool);
    }

    let offsets: Vec<_> = pool.free_addresses().map(BlockAddr::offset).collect();
    assert_eq!(offsets, vec![0, 128, 384, 640, 896]);
}

#[test]
fn random_sequences_preserve_invariants() {
    for policy in [RunPolicy::ListOrder, RunPolicy::AddressOrder] {
        let config = PoolConfig::new(64 * 32, 32).with_run_policy(policy);
        let mut pool = BlockPool::with_config(&config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0x0B10_C5EE);
        let mut held: Vec<BlockAddr> = Vec::new();

        for _ in 0..5_000 {
            if held.is_empty() || rng.gen_bool(0.55) {
                let blocks = rng.gen_range(1..=4);
                let before = pool.free_blocks();
                if pool.acquire(blocks * 32).is_ok() {
                    assert_eq!(pool.free_blocks(), before - blocks);
                }
            } else {
                let index = rng.gen_range(0..held.len());
                let addr = held.swap_remove(index);
                pool.release(addr).unwrap();
            }

            // Track individual acquired blocks so every one can be released
            held = (0..pool.block_count())
                .map(|k| BlockAddr::BASE.add_blocks(k, 32))
                .filter(|&addr| pool.slot_state(addr) == Some(SlotState::Acquired))
                .collect();

            assert_sorted_and_aligned(&pool);
            assert_eq!(pool.free_blocks() + held.len(), pool.block_count());
        }
    }
}

// ============================================================================
// FRAGMENTATION
// ============================================================================

/// Acquires every block, then frees the even-numbered ones.
fn checkerboard(policy: RunPolicy) -> (BlockPool, Vec<BlockAddr>) {
    let config = PoolConfig::new(1024, 128).with_run_policy(policy);
    let mut pool = BlockPool::with_config(&config).unwrap();
    let addrs: Vec<_> = (0..8).map(|_| pool.acquire(128).unwrap()).collect();

    for addr in addrs.iter().step_by(2) {
        pool.release(*addr).unwrap();
    }
    (pool, addrs)
}

#[test]
fn fragmentation_blocks_contiguous_requests() {
    let (mut pool, _) = checkerboard(RunPolicy::AddressOrder);

    assert_eq!(pool.free_blocks(), 4);
    assert_eq!(pool.largest_free_run(), 1);
    assert_eq!(
        pool.acquire(256),
        Err(PoolError::InsufficientContiguousMemory {
            requested_blocks: 2,
            free_blocks: 4,
        })
    );
    assert_eq!(pool.free_blocks(), 4);

    // Single blocks still succeed: capacity is exact, only contiguity is gone
    for _ in 0..4 {
        pool.acquire(128).unwrap();
    }
}

#[test]
fn adjacent_releases_are_not_coalesced_but_still_form_runs() {
    let (mut pool, addrs) = checkerboard(RunPolicy::AddressOrder);

    pool.release(addrs[3]).unwrap();
    assert_eq!(pool.free_blocks(), 5);
    assert_eq!(pool.largest_free_run(), 3);

    let run = pool.acquire(384).unwrap();
    assert_eq!(run, addrs[2]);
    assert_eq!(pool.free_addresses().collect::<Vec<_>>(), vec![addrs[0], addrs[6]]);
}

#[test]
fn list_order_run_spans_non_adjacent_blocks() {
    let (mut pool, addrs) = checkerboard(RunPolicy::ListOrder);

    // Two free nodes at offsets 0 and 256 satisfy a two-block request
    let start = pool.acquire(256).unwrap();
    assert_eq!(start, addrs[0]);

    // The block right after `start` was never part of this run
    let trailing = start.add_blocks(1, 128);
    assert_eq!(trailing, addrs[1]);
    assert_eq!(pool.slot_state(addrs[2]), Some(SlotState::Acquired));

    // The run is returned through the blocks that were actually unlinked
    pool.release(start).unwrap();
    pool.release(addrs[2]).unwrap();
    pool.check_invariants().unwrap();
}
