use std::fmt;

/// Severity of a runtime log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// Logs a formatted message attributed to a source location.
///
/// Generated command code carries its own file/line; the message is emitted
/// as `[file:line] message` at the matching `tracing` level. `Fatal`
/// severity aborts after logging.
pub fn logf(severity: Severity, file: &str, line: u32, args: fmt::Arguments<'_>) {
    match severity {
        Severity::Debug => tracing::debug!("[{file}:{line}] {args}"),
        Severity::Info => tracing::info!("[{file}:{line}] {args}"),
        Severity::Warning => tracing::warn!("[{file}:{line}] {args}"),
        Severity::Error => tracing::error!("[{file}:{line}] {args}"),
        Severity::Fatal => {
            tracing::error!("[{file}:{line}] {args}");
            panic!("[{file}:{line}] {args}");
        }
    }
}
