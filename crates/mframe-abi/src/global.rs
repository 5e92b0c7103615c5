//! Process-wide configuration: log routing and the global option store.
//!
//! The configuration object is created lazily on first use and never torn
//! down. Handler installation is last-write-wins; with no handler installed,
//! [`log`] forwards to `tracing` so messages are never silently lost in a
//! host that only configured a subscriber.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Verbosity threshold for [`log`]. Ordered: `Off` suppresses everything,
/// `All` lets everything through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Off,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
    All,
}

/// Installed log sink. Called on whichever thread logs.
pub type LogHandler = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

#[derive(Default)]
struct GlobalConfig {
    level: RwLock<LogLevel>,
    handler: RwLock<Option<LogHandler>>,
    options: RwLock<HashMap<String, String>>,
}

fn config() -> &'static GlobalConfig {
    static CONFIG: OnceLock<GlobalConfig> = OnceLock::new();
    CONFIG.get_or_init(GlobalConfig::default)
}

/// Set the process-wide verbosity threshold.
pub fn set_log_level(level: LogLevel) {
    *config().level.write() = level;
}

/// The current verbosity threshold.
pub fn log_level() -> LogLevel {
    *config().level.read()
}

/// Install (or with `None`, uninstall) the process-wide log handler.
///
/// Last write wins. The handler runs under a read lock, so it must not call
/// `set_log_handler` itself.
pub fn set_log_handler(handler: Option<LogHandler>) {
    *config().handler.write() = handler;
}

/// Set a global string option, e.g. a backend tuning knob.
pub fn set_option(key: impl Into<String>, value: impl Into<String>) {
    config().options.write().insert(key.into(), value.into());
}

/// Read back a global string option.
pub fn option(key: &str) -> Option<String> {
    config().options.read().get(key).cloned()
}

/// Route a message through the installed handler, or `tracing` without one.
/// Messages at `Off`, or above the current threshold, are dropped.
pub fn log(level: LogLevel, message: &str) {
    if level == LogLevel::Off || level > log_level() {
        return;
    }
    if let Some(handler) = config().handler.read().as_ref() {
        handler(level, message);
        return;
    }
    match level {
        LogLevel::Off => {}
        LogLevel::Error => tracing::error!(target: "mframe", "{message}"),
        LogLevel::Warning => tracing::warn!(target: "mframe", "{message}"),
        LogLevel::Info => tracing::info!(target: "mframe", "{message}"),
        LogLevel::Debug => tracing::debug!(target: "mframe", "{message}"),
        LogLevel::All => tracing::trace!(target: "mframe", "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Global state: one test exercises the whole surface to avoid
    // cross-test interference on the shared handler and level.
    #[test]
    fn handler_level_and_options_round_trip() {
        assert!(LogLevel::Error < LogLevel::Debug);

        let seen = Arc::new(AtomicUsize::new(0));
        let sink = seen.clone();
        set_log_handler(Some(Box::new(move |_, _| {
            sink.fetch_add(1, Ordering::SeqCst);
        })));

        set_log_level(LogLevel::Warning);
        assert_eq!(log_level(), LogLevel::Warning);
        log(LogLevel::Error, "kept");
        log(LogLevel::Warning, "kept");
        log(LogLevel::Debug, "dropped: above threshold");
        log(LogLevel::Off, "dropped: never emitted");
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        // Last write wins: replacing the handler stops the first one.
        set_log_handler(Some(Box::new(|_, _| {})));
        log(LogLevel::Error, "goes to the replacement");
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        // Uninstalling falls back to tracing; must not panic without a
        // subscriber installed.
        set_log_handler(None);
        log(LogLevel::Error, "to tracing");

        set_option("videoout.clear_on_stop", "0");
        assert_eq!(option("videoout.clear_on_stop").as_deref(), Some("0"));
        assert_eq!(option("unset-key"), None);

        set_log_level(LogLevel::default());
    }
}
