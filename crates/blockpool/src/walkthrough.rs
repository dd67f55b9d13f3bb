//! # Pool Walkthrough
//!
//! Drives a fresh pool through its basic life cycle:
//!
//! 1. Acquire every block one at a time
//! 2. Confirm the next single-block request fails
//! 3. Release the first block and acquire again
//! 4. Destroy the pool
//!
//! For a 1024-byte pool of 128-byte blocks this is the reference scenario:
//! eight acquisitions from the arena base upward, a ninth that fails, and the
//! first block handed back out after it is released.

use blockpool_core::{BlockAddr, BlockPool, PoolConfig, PoolError, PoolResult};

/// What a walkthrough observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkthroughReport {
    /// Blocks in the pool.
    pub block_count: usize,
    /// Block size in bytes.
    pub block_size: usize,
    /// Addresses returned while filling the pool, in order.
    pub acquired: Vec<BlockAddr>,
    /// Error returned by the request made once the pool was full.
    pub overflow: Option<PoolError>,
    /// Address released after filling.
    pub released: BlockAddr,
    /// Address returned by the request after the release.
    pub reacquired: BlockAddr,
    /// Blocks still acquired when the pool was destroyed.
    pub outstanding_at_destroy: usize,
}

impl WalkthroughReport {
    /// Returns true if the released block was handed straight back.
    #[must_use]
    pub fn reused_released_block(&self) -> bool {
        self.released == self.reacquired
    }
}

/// Runs the walkthrough on a pool built from `config`.
///
/// # Errors
///
/// Any pool error other than the expected overflow, starting with
/// construction errors from an invalid `config`.
pub fn run_walkthrough(config: &PoolConfig) -> PoolResult<WalkthroughReport> {
    let mut pool = BlockPool::with_config(config)?;
    let block_size = pool.block_size();
    let block_count = pool.block_count();

    let mut acquired = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        acquired.push(pool.acquire(block_size)?);
    }
    tracing::info!(blocks = acquired.len(), "pool filled");

    let overflow = match pool.acquire(block_size) {
        Ok(addr) => {
            // Cannot happen on a full pool; give the block back and report it
            pool.release(addr)?;
            None
        }
        Err(err) => Some(err),
    };

    let released = acquired[0];
    pool.release(released)?;
    let reacquired = pool.acquire(block_size)?;
    tracing::info!(
        released = released.offset(),
        reacquired = reacquired.offset(),
        "released and reacquired"
    );

    let summary = pool.destroy();

    Ok(WalkthroughReport {
        block_count,
        block_size,
        acquired,
        overflow,
        released,
        reacquired,
        outstanding_at_destroy: summary.outstanding_blocks,
    })
}
