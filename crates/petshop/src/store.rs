//! The data store: assembled statements executed against a [`GenericClient`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::client::GenericClient;
use crate::error::{StoreError, StoreResult};
use crate::monitor::{StatementContext, StatementOutcome, StoreMonitor, TracingMonitor};
use crate::statement::{self, Statement};
use crate::value::{Record, ValueMap, record_from_row};

/// Monitor and deadline shared by every store a service opens.
#[derive(Clone)]
pub struct StoreOptions {
    pub monitor: Arc<dyn StoreMonitor>,
    /// Per-statement deadline. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            monitor: Arc::new(TracingMonitor::default()),
            timeout: None,
        }
    }
}

/// Map-driven access to any table, over one client or transaction.
///
/// Every operation validates identifiers, binds named parameters, honours the
/// optional statement timeout and reports to the monitor.
pub struct DataStore<C> {
    client: C,
    options: StoreOptions,
}

impl<C: GenericClient> DataStore<C> {
    pub fn new(client: C) -> Self {
        Self::with_options(client, StoreOptions::default())
    }

    pub fn with_options(client: C, options: StoreOptions) -> Self {
        Self { client, options }
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn StoreMonitor>) -> Self {
        self.options.monitor = monitor;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Every row of `table`, ordered by `order` (`col [ASC|DESC], ...`).
    pub async fn select_all(&self, table: &str, order: &str) -> StoreResult<Vec<Record>> {
        let stmt = statement::select_all(table, order)?;
        let rows = self.query(&stmt).await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Rows of `table` matching `predicate`; an empty predicate matches all.
    pub async fn select_where(
        &self,
        table: &str,
        predicate: &str,
        bound: &ValueMap,
    ) -> StoreResult<Vec<Record>> {
        let stmt = statement::select_where(table, predicate, bound)?;
        let rows = self.query(&stmt).await?;
        rows.iter().map(record_from_row).collect()
    }

    pub async fn count(&self, table: &str, predicate: &str, bound: &ValueMap) -> StoreResult<i64> {
        let stmt = statement::count(table, predicate, bound)?;
        let rows = self.query(&stmt).await?;
        let row = rows
            .first()
            .ok_or_else(|| StoreError::not_found("COUNT returned no row"))?;
        row.try_get::<_, i64>(0)
            .map_err(|e| StoreError::decode("count", e.to_string()))
    }

    /// Insert the non-null entries of `values`, except `id`.
    pub async fn insert(&self, table: &str, values: &ValueMap) -> StoreResult<()> {
        let stmt = statement::insert(table, values)?;
        self.execute(&stmt).await?;
        Ok(())
    }

    /// Update rows matching `predicate`; returns the affected row count.
    ///
    /// WHERE-side names that collide with SET names are renamed before binding.
    pub async fn update(
        &self,
        table: &str,
        set_values: &ValueMap,
        predicate: &str,
        where_bound: &ValueMap,
    ) -> StoreResult<u64> {
        let stmt = statement::update(table, set_values, predicate, where_bound)?;
        self.execute(&stmt).await
    }

    /// Delete rows equal to every non-null entry of `match_values`.
    pub async fn delete(&self, table: &str, match_values: &ValueMap) -> StoreResult<u64> {
        let stmt = statement::delete(table, match_values)?;
        self.execute(&stmt).await
    }

    async fn query(&self, stmt: &Statement) -> StoreResult<Vec<Row>> {
        let (sql, params) = stmt.bind()?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

        let start = Instant::now();
        let result = self
            .execute_with_timeout(self.client.query(&sql, &refs))
            .await;
        let outcome = match &result {
            Ok(rows) if stmt.op == statement::Op::Count => rows
                .first()
                .and_then(|r| r.try_get::<_, i64>(0).ok())
                .map_or(StatementOutcome::Rows(rows.len()), StatementOutcome::Count),
            Ok(rows) => StatementOutcome::Rows(rows.len()),
            Err(e) => StatementOutcome::error(e.to_string()),
        };
        self.report(stmt, params.len(), start.elapsed(), &outcome);
        result
    }

    async fn execute(&self, stmt: &Statement) -> StoreResult<u64> {
        let (sql, params) = stmt.bind()?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

        let start = Instant::now();
        let result = self
            .execute_with_timeout(self.client.execute(&sql, &refs))
            .await;
        let outcome = match &result {
            Ok(n) => StatementOutcome::Affected(*n),
            Err(e) => StatementOutcome::error(e.to_string()),
        };
        self.report(stmt, params.len(), start.elapsed(), &outcome);
        result
    }

    fn report(&self, stmt: &Statement, param_count: usize, elapsed: Duration, outcome: &StatementOutcome) {
        let ctx = StatementContext {
            op: stmt.op,
            table: stmt.table.clone(),
            sql: stmt.sql.clone(),
            param_count,
        };
        self.options.monitor.on_statement_complete(&ctx, elapsed, outcome);
    }

    async fn execute_with_timeout<T, F>(&self, future: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>> + Send,
    {
        match self.options.timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(cancel_token) = self.client.cancel_token() {
                            tokio::spawn(async move {
                                let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                            });
                        }
                        Err(StoreError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        }
    }
}
