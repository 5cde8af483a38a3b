use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Base seed for the current simulation iteration, set by main before each scenario run
pub static RAND_SEED: AtomicU64 = AtomicU64::new(0);

/// Counts SimulationRun instances created since the last reset
pub static TOTAL_SIMULATION_RUNS: AtomicU64 = AtomicU64::new(0);

/// When set, every auction round is logged as a CSV line under LogEvent::Auction
pub static VERBOSE_AUCTION: AtomicBool = AtomicBool::new(false);

/// Derive the seed for one random stream from the iteration seed
/// Each stream (user generation, auction, ...) passes its own offset so the streams stay independent
/// while the whole run remains reproducible for a given RAND_SEED
pub fn get_seed(offset: u64) -> u64 {
    RAND_SEED
        .load(Ordering::Relaxed)
        .wrapping_mul(1_000_003)
        .wrapping_add(offset)
}

/// Round a monetary amount to 3 decimal places
/// Rounds the exact stored value, so 1.0005 (stored as 1.000499...) gives 1.0
pub fn round_to_millis(amount: f64) -> f64 {
    if !amount.is_finite() {
        return amount;
    }
    format!("{:.3}", amount).parse().unwrap_or(amount)
}
