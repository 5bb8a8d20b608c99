//! Statement monitoring.
//!
//! Every statement the [`DataStore`](crate::DataStore) runs is reported to a
//! [`StoreMonitor`] once it finishes. Monitor methods return nothing, so a
//! monitor has no way to fail the statement it observes.

use std::fmt;
use std::time::Duration;
use tracing::Level;

use crate::statement::Op;

/// Maximum length for error messages carried in [`StatementOutcome::Error`].
const MAX_ERROR_LEN: usize = 512;

/// Truncate `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// What was executed.
#[derive(Debug, Clone)]
pub struct StatementContext {
    pub op: Op,
    pub table: String,
    /// Statement text with named placeholders.
    pub sql: String,
    pub param_count: usize,
}

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    /// Rows returned by a select.
    Rows(usize),
    /// Rows affected by a mutation.
    Affected(u64),
    /// Value of a `COUNT(*)` projection.
    Count(i64),
    /// Failure, message truncated to 512 bytes.
    Error(String),
}

impl StatementOutcome {
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for StatementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows(n) => write!(f, "{n} rows"),
            Self::Affected(n) => write!(f, "{n} affected"),
            Self::Count(n) => write!(f, "count {n}"),
            Self::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Observer for executed statements.
pub trait StoreMonitor: Send + Sync {
    /// Called after a statement completes, successfully or not.
    fn on_statement_complete(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    );
}

/// A monitor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl StoreMonitor for NoopMonitor {
    fn on_statement_complete(&self, _: &StatementContext, _: Duration, _: &StatementOutcome) {}
}

/// Emits one `tracing` event per statement under the `petshop.sql` target.
///
/// Failures are logged at `WARN`, statements slower than `slow_threshold` at
/// `INFO`, everything else at `level`.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    pub slow_threshold: Option<Duration>,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            slow_threshold: Some(Duration::from_millis(500)),
        }
    }
}

impl TracingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    fn event_level(&self, duration: Duration, outcome: &StatementOutcome) -> Level {
        if outcome.is_error() {
            Level::WARN
        } else if self.slow_threshold.is_some_and(|t| duration >= t) && self.level > Level::INFO {
            Level::INFO
        } else {
            self.level
        }
    }
}

impl StoreMonitor for TracingMonitor {
    fn on_statement_complete(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    ) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(&ctx.sql);
        emit_at_level!(
            self.event_level(duration, outcome),
            target: "petshop.sql",
            op = %ctx.op,
            table = %ctx.table,
            param_count = ctx.param_count,
            duration_ms = duration.as_secs_f64() * 1000.0,
            outcome = %outcome,
            sql = %sql,
        );
    }
}
