use tracing_subscriber::{fmt, EnvFilter};

/// install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_level`; returns false when a subscriber was already installed
pub fn init_tracing(default_level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// subscriber for unit tests, output captured by the test harness
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = fmt()
        .with_env_filter("warn,installment_ledger_rs=debug")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_test_tracing();
        assert!(!init_tracing("info"));
    }
}
