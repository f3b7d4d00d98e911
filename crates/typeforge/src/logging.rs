//! Logging setup and the text sink used by `log()`/`log_references()`

use parking_lot::Mutex;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a configured filter is set
pub const DEFAULT_FILTER: &str = "info,typeforge=debug";

/// Install a stderr `fmt` subscriber. `RUST_LOG` overrides `filter`.
///
/// Only the first call has any effect. Returns false when another global
/// subscriber was already installed.
pub fn init_logging(filter: Option<&str>) -> bool {
    static INSTALLED: OnceLock<bool> = OnceLock::new();

    *INSTALLED.get_or_init(|| {
        let directive = filter.unwrap_or(DEFAULT_FILTER).to_string();
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();

        fmt()
            .with_env_filter(env_filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .is_ok()
    })
}

/// Destination for rendered source and reference listings.
pub trait LogSink: Send + Sync {
    fn write(&self, text: &str);
}

/// Writes through `tracing::info!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, text: &str) {
        info!(target: "typeforge::output", "{}", text);
    }
}

/// Collects everything written, for inspection.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contents(&self) -> String {
        self.lines.lock().join("\n")
    }
}

impl LogSink for BufferSink {
    fn write(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink_keeps_order() {
        let sink = BufferSink::new();
        sink.write("one");
        sink.write("two");
        assert_eq!(sink.entries(), vec!["one".to_string(), "two".to_string()]);
        assert_eq!(sink.contents(), "one\ntwo");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let first = init_logging(Some("warn"));
        assert_eq!(init_logging(None), first);
    }
}
