use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,swash=warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default filter.
///
/// # Panics
///
/// Panics if a global subscriber is already set; use [`try_init`] in tests.
pub fn init() {
    tracing_subscriber::fmt().with_env_filter(filter()).init();
}

/// Like [`init`], but ignores an already installed subscriber.
pub fn try_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init();
}
