use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "ngomatch=info";

/// `RUST_LOG` directives when set and non-empty, `ngomatch=info` otherwise.
pub fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}

/// Installs the stderr subscriber.
pub fn init() -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn rust_log_can_raise_crate_level_to_debug() {
        let subscriber = tracing_subscriber::registry().with(env_filter(Some("ngomatch=debug")));
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "ngomatch::reports", Level::DEBUG));
        });
    }

    #[test]
    fn defaults_to_info_without_rust_log() {
        for rust_log in [None, Some(""), Some("   ")] {
            let subscriber = tracing_subscriber::registry().with(env_filter(rust_log));
            tracing::subscriber::with_default(subscriber, || {
                assert!(tracing::enabled!(target: "ngomatch::ngo_source", Level::INFO));
                assert!(!tracing::enabled!(target: "ngomatch::ngo_source", Level::DEBUG));
            });
        }
    }

    #[test]
    fn rust_log_can_quiet_the_crate() {
        let subscriber = tracing_subscriber::registry().with(env_filter(Some("ngomatch=warn")));
        tracing::subscriber::with_default(subscriber, || {
            assert!(!tracing::enabled!(target: "ngomatch::matcher", Level::INFO));
            assert!(tracing::enabled!(target: "ngomatch::matcher", Level::WARN));
        });
    }
}
