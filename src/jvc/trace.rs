//! Optional observer for raw byte exchanges.

/// Receives one human-readable line per byte exchange.
///
/// Purely observational; implementations must not block for long.
pub trait TraceSink: Send + Sync {
    fn trace(&self, line: &str);
}

/// Discards everything. Used when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn trace(&self, _line: &str) {}
}

/// Forwards lines to `tracing` at TRACE level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn trace(&self, line: &str) {
        tracing::trace!(target: "dila_remote::wire", "{line}");
    }
}

/// Adapts a closure into a sink.
pub struct FnTrace<F>(pub F);

impl<F> TraceSink for FnTrace<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn trace(&self, line: &str) {
        (self.0)(line)
    }
}
