//! `log` backend writing to the browser devtools console.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        match record.level() {
            Level::Error => gloo_console::error!(line),
            Level::Warn => gloo_console::warn!(line),
            Level::Info => gloo_console::info!(line),
            Level::Debug | Level::Trace => gloo_console::debug!(line),
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger. Later calls only adjust the level.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("console logger already installed");
    }
    log::set_max_level(level);
}

fn format_record(record: &Record) -> String {
    let target = record.target();
    let target = target.strip_prefix("jobs_console::").unwrap_or(target);
    format!("[{}] {}: {}", record.level(), target, record.args())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_prefixed_with_level_and_short_target() {
        let line = format_record(
            &Record::builder()
                .level(Level::Warn)
                .target("jobs_console::job_controller::poller")
                .args(format_args!("job {} fetch failed", "ab12"))
                .build(),
        );
        assert_eq!(line, "[WARN] job_controller::poller: job ab12 fetch failed");
    }
}
