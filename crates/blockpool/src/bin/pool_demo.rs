//! # Pool Demo
//!
//! Builds a block pool and walks it through fill, exhaustion, release and
//! reuse.
//!
//! ```bash
//! # Default geometry: 1024 bytes in 128-byte blocks
//! ./pool_demo
//!
//! # Geometry from a TOML file
//! ./pool_demo pool.toml
//! ```

use blockpool::{run_walkthrough, PoolConfig};

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         BLOCKPOOL DEMO                                           ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().collect();

    let config = match args.get(1) {
        Some(path) => {
            println!("Loading config: {path}");
            match PoolConfig::from_toml_file(path) {
                Ok(config) => config,
                Err(e) => {
                    println!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => PoolConfig::default(),
    };

    let report = match run_walkthrough(&config) {
        Ok(report) => report,
        Err(e) => {
            println!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!(
        "Memory pool created with {} blocks of size {}",
        report.block_count, report.block_size
    );
    println!("Run policy:         {:?}", config.run_policy);
    println!();

    println!("┌─ FILL ─────────────────────────────────────────────────────────┐");
    for (i, addr) in report.acquired.iter().enumerate() {
        println!("│ acquire #{:<4} -> offset {:#08x}", i + 1, addr.offset());
    }
    match &report.overflow {
        Some(err) => println!("│ acquire #{:<4} -> {err}", report.acquired.len() + 1),
        None => println!("│ acquire #{:<4} -> unexpectedly succeeded", report.acquired.len() + 1),
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ REUSE ────────────────────────────────────────────────────────┐");
    println!("│ released   offset {:#08x}", report.released.offset());
    println!("│ reacquired offset {:#08x}", report.reacquired.offset());
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    if report.reused_released_block() {
        println!("✓ Released block handed back out");
    } else {
        println!("⚠ Reacquire returned a different block");
    }
    println!(
        "Pool destroyed with {} blocks still acquired",
        report.outstanding_at_destroy
    );
}
