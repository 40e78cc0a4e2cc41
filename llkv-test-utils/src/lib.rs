//! Test helpers shared by the LLKV crates.
//!
//! - [`init_tracing_for_tests`] installs a `tracing` subscriber once per test
//!   binary. The filter comes from `RUST_LOG` and falls back to `warn`.
//! - [`seeded_rng`] returns a deterministic RNG. Set `LLKV_TEST_SEED` to replay
//!   a failing randomized test with a specific seed.

use std::sync::Once;

use rand::SeedableRng;
use rand::rngs::StdRng;

static INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "warn";

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        // Another harness may have installed a global subscriber already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

/// Deterministic RNG for randomized tests.
///
/// `LLKV_TEST_SEED`, when set to an integer, overrides `default_seed`.
pub fn seeded_rng(default_seed: u64) -> StdRng {
    let seed = std::env::var("LLKV_TEST_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default_seed);
    StdRng::seed_from_u64(seed)
}

#[cfg(feature = "auto-init")]
mod auto {
    // Runs at binary init time so individual tests need not call init.
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}
