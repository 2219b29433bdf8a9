//! Logging setup
//!
//! Diagnostics go through the `log` facade and are printed to stderr by
//! `env_logger`. `RUST_LOG` always wins over the level passed in.

use crate::app::AppInfo;
use log::{debug, info};

/// Installs the global logger with `level` as the default filter.
///
/// A second call is a no-op, which keeps tests that build several apps happy.
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}

/// Build metadata injected by `build.rs`
pub fn build_info() -> String {
    let mut info = format!(
        "{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("TARGET_TRIPLE"),
        env!("BUILD_DATE")
    );
    if let Some(commit) = option_env!("GIT_COMMIT") {
        info.push_str(&format!(", commit {commit}"));
    }
    info
}

pub fn log_startup(app: &AppInfo) {
    info!("🚀 Starting {} ({})", app.name, app.id);
    info!("📄 Version: {}", build_info());
    debug!("requested window size {}x{}", app.width, app.height);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_contains_version() {
        let info = build_info();
        assert!(info.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(info.contains(env!("TARGET_TRIPLE")));
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("info");
    }
}
