//! Embedded engine sessions (SQLite), file-backed or in-memory.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, params_from_iter};

use super::{BackendKind, Session, TxnState};
use crate::error::{DriverError, DriverResult};
use crate::handler::{Row, RowHandler};
use crate::statement::StatementId;

/// Session on the embedded engine.
///
/// Prepared statements live in the connection's statement cache; a
/// [`StatementId`] maps to the cached SQL text, so each statement is compiled
/// once and reused on every execution.
pub struct EmbeddedSession {
    conn: Connection,
    kind: BackendKind,
    identity: String,
    statements: Vec<Option<String>>,
    txn: TxnState,
}

impl EmbeddedSession {
    /// Open (creating if needed) the database file at `path`.
    pub fn open_file(path: &Path) -> DriverResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::with_connection(
            conn,
            BackendKind::EmbeddedFile,
            format!("{} {}", BackendKind::EmbeddedFile, path.display()),
        ))
    }

    /// Open a non-persistent database called `name`.
    ///
    /// The database lives as long as at least one connection to it is open.
    pub fn open_memory(name: &str) -> DriverResult<Self> {
        let uri = format!("file:{}?mode=memory&cache=shared", name);
        let conn = Connection::open(uri)?;
        Ok(Self::with_connection(
            conn,
            BackendKind::EmbeddedMemory,
            format!("{} {}", BackendKind::EmbeddedMemory, name),
        ))
    }

    fn with_connection(conn: Connection, kind: BackendKind, identity: String) -> Self {
        Self {
            conn,
            kind,
            identity,
            statements: Vec::new(),
            txn: TxnState::new(),
        }
    }

    fn begin_if_needed(&mut self) -> DriverResult<()> {
        if self.txn.needs_begin() {
            self.conn.execute_batch("BEGIN")?;
            self.txn.open = true;
        }
        Ok(())
    }

}

fn statement_sql(statements: &[Option<String>], stmt: StatementId) -> DriverResult<&str> {
    statements
        .get(stmt.0)
        .and_then(|s| s.as_deref())
        .ok_or(DriverError::UnknownStatement(stmt.0))
}

fn run_batch(conn: &Connection, sql: &str, batch: &[Vec<i32>]) -> DriverResult<u64> {
    let mut cached = conn.prepare_cached(sql)?;
    let mut total = 0u64;
    for params in batch {
        total += cached.execute(params_from_iter(params.iter()))? as u64;
    }
    Ok(total)
}

impl Session for EmbeddedSession {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn describe(&self) -> &str {
        &self.identity
    }

    fn auto_commit(&self) -> bool {
        self.txn.auto_commit
    }

    fn set_auto_commit(&mut self, enabled: bool) -> DriverResult<()> {
        if enabled && !self.txn.auto_commit {
            self.commit()?;
        }
        self.txn.auto_commit = enabled;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.txn.open
    }

    fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        self.begin_if_needed()?;
        let affected = self.conn.execute(sql, [])?;
        Ok(affected as u64)
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<StatementId> {
        // Compile now so syntax errors surface at prepare time
        self.conn.prepare_cached(sql)?;
        self.statements.push(Some(sql.to_owned()));
        Ok(StatementId(self.statements.len() - 1))
    }

    fn execute_prepared(&mut self, stmt: StatementId, params: &[i32]) -> DriverResult<u64> {
        self.begin_if_needed()?;
        let sql = statement_sql(&self.statements, stmt)?;
        let mut cached = self.conn.prepare_cached(sql)?;
        let affected = cached.execute(params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    fn execute_batch(&mut self, stmt: StatementId, batch: &[Vec<i32>]) -> DriverResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let sql = statement_sql(&self.statements, stmt)?;

        if self.txn.auto_commit {
            // Rolled back on drop if any row fails
            let tx = self.conn.transaction()?;
            let total = run_batch(&tx, sql, batch)?;
            tx.commit()?;
            return Ok(total);
        }

        if self.txn.needs_begin() {
            self.conn.execute_batch("BEGIN")?;
            self.txn.open = true;
        }
        run_batch(&self.conn, sql, batch)
    }

    fn close_statement(&mut self, stmt: StatementId) -> DriverResult<()> {
        let slot = self
            .statements
            .get_mut(stmt.0)
            .ok_or(DriverError::UnknownStatement(stmt.0))?;
        if slot.take().is_none() {
            return Err(DriverError::UnknownStatement(stmt.0));
        }
        if self.statements.iter().all(Option::is_none) {
            self.statements.clear();
            self.conn.flush_prepared_statement_cache();
        }
        Ok(())
    }

    fn query(&mut self, sql: &str, handler: &mut dyn RowHandler) -> DriverResult<()> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            handler.row(row)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        if self.txn.open {
            self.conn.execute_batch("COMMIT")?;
            self.txn.open = false;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> DriverResult<()> {
        let EmbeddedSession { conn, .. } = *self;
        conn.close().map_err(|(_, e)| DriverError::from(e))
    }
}

impl Row for rusqlite::Row<'_> {
    fn get_i32(&self, index: usize) -> DriverResult<Option<i32>> {
        Ok(self.get(index)?)
    }

    fn get_i64(&self, index: usize) -> DriverResult<Option<i64>> {
        Ok(self.get(index)?)
    }

    fn get_string(&self, index: usize) -> DriverResult<Option<String>> {
        Ok(self.get(index)?)
    }

    fn get_date(&self, index: usize) -> DriverResult<Option<NaiveDate>> {
        Ok(self.get(index)?)
    }
}
