//! # Blockpool Core
//!
//! Fixed-block-size memory pool designed for:
//! - One arena reserved at startup, never grown
//! - Zero allocations on acquire and release
//! - Zero metadata memory beyond one tag per block
//!
//! ## Architecture Rules
//!
//! 1. **Intrusive free list** - Free blocks store the list links themselves
//! 2. **Address order** - The free list is always sorted by block address
//! 3. **Explicit ownership** - Every block is either free or acquired, never both
//!
//! ## Example
//!
//! ```rust,ignore
//! use blockpool_core::BlockPool;
//!
//! let mut pool = BlockPool::create(1024, 128)?;
//! let a = pool.acquire(128)?;
//! pool.release(a)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;

pub use config::{PoolConfig, RunPolicy};
pub use error::{InvariantViolation, PoolError, PoolResult};
pub use memory::{
    Arena, BlockAddr, BlockPool, DestroySummary, FreeAddresses, PoolStats, SlotState, NODE_SIZE,
};
