//! Log output setup.
//!
//! Arbor logs through `tracing`. Reconciliation and disposal log at `debug`,
//! event dispatch and batch rendering at `trace`. Nothing is printed unless a
//! subscriber is installed; `init` installs one filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "arbor=info";

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `DEFAULT_FILTER`. Returns false if a global subscriber was already set.
pub fn init() -> bool {
    init_with(default_filter())
}

/// Install a formatting subscriber with an explicit filter directive.
pub fn init_with(filter: EnvFilter) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness, so output is
/// captured per test. Safe to call from every test.
pub fn init_test() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_test_writer()
        .try_init()
        .is_ok()
}

/// The `RUST_LOG` filter, or `DEFAULT_FILTER`.
fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        init_test();
        assert!(!init_test());
        assert!(!init());
    }
}
