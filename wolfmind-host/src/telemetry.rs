//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use wolfmind_core::config::GeneralConfig;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` from `[general]` is used.
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(config: &GeneralConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_refused() {
        let config = GeneralConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
