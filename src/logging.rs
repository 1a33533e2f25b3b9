/// Console logging
///
/// `RUST_LOG` picks the verbosity; without it only this crate's info
/// messages and everyone's warnings are shown.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,product_editor=info";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
