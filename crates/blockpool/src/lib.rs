//! # Blockpool
//!
//! Facade over [`blockpool_core`] plus a scripted walkthrough of the pool's
//! observable behaviour.
//!
//! ## Modules
//!
//! - `walkthrough`: Fill, exhaust, release and reuse a pool, recording what happened

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod walkthrough;

pub use blockpool_core as core;

pub use blockpool_core::{BlockAddr, BlockPool, PoolConfig, PoolError, PoolResult, RunPolicy};
pub use walkthrough::{run_walkthrough, WalkthroughReport};
