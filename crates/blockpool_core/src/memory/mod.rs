//! # Memory Management
//!
//! One arena reserved up front, carved into equal-size blocks.
//!
//! ## Design Philosophy
//!
//! All memory is reserved once at creation. After that:
//! - No heap allocations
//! - No growth
//! - Free-list bookkeeping lives inside the free blocks

mod arena;
mod free_list;
mod pool;

pub use arena::{Arena, BlockAddr};
pub use free_list::{FreeAddresses, NODE_SIZE};
pub use pool::{BlockPool, DestroySummary, PoolStats, SlotState};
