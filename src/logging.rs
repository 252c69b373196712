//! Ready-made `tracing` setup for binaries and demos.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a global formatter honouring `RUST_LOG`.
///
/// Without `RUST_LOG`, engine rounds are logged at `debug` and everything
/// else at `info`. Fails if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kasane=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_only_once() {
        // Whatever the first call does, a subscriber is installed afterwards.
        let _ = init();
        assert!(init().is_err());
    }
}
