//! Server engine sessions (PostgreSQL over TCP).

use chrono::NaiveDate;
use postgres::fallible_iterator::FallibleIterator;
use postgres::types::ToSql;
use postgres::{Client, Config, NoTls, Statement};

use super::{BackendKind, Session, TxnState};
use crate::error::{DriverError, DriverResult};
use crate::handler::{Row, RowHandler};
use crate::opts::ServerOpts;
use crate::statement::StatementId;

/// Session on the server engine.
pub struct ServerSession {
    client: Client,
    identity: String,
    statements: Vec<Option<Statement>>,
    txn: TxnState,
}

impl ServerSession {
    /// Connect to the server described by `opts`.
    pub fn open(opts: &ServerOpts) -> DriverResult<Self> {
        let mut config = Config::new();
        config
            .host(&opts.host)
            .port(opts.port)
            .user(&opts.user)
            .dbname(&opts.database)
            .application_name("employee-bench");
        if let Some(password) = &opts.password {
            config.password(password);
        }
        let client = config.connect(NoTls)?;

        Ok(Self {
            client,
            identity: opts.describe(),
            statements: Vec::new(),
            txn: TxnState::new(),
        })
    }

    fn begin_if_needed(&mut self) -> DriverResult<()> {
        if self.txn.needs_begin() {
            self.client.batch_execute("BEGIN")?;
            self.txn.open = true;
        }
        Ok(())
    }
}

fn statement(statements: &[Option<Statement>], stmt: StatementId) -> DriverResult<&Statement> {
    statements
        .get(stmt.0)
        .and_then(Option::as_ref)
        .ok_or(DriverError::UnknownStatement(stmt.0))
}

fn bind(params: &[i32]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Session for ServerSession {
    fn kind(&self) -> BackendKind {
        BackendKind::Server
    }

    fn describe(&self) -> &str {
        &self.identity
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
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
        Ok(self.client.execute(sql, &[])?)
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<StatementId> {
        let stmt = self.client.prepare(sql)?;
        self.statements.push(Some(stmt));
        Ok(StatementId(self.statements.len() - 1))
    }

    fn execute_prepared(&mut self, stmt: StatementId, params: &[i32]) -> DriverResult<u64> {
        self.begin_if_needed()?;
        let stmt = statement(&self.statements, stmt)?;
        Ok(self.client.execute(stmt, &bind(params))?)
    }

    fn execute_batch(&mut self, stmt: StatementId, batch: &[Vec<i32>]) -> DriverResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let stmt = statement(&self.statements, stmt)?;
        let mut total = 0u64;

        if self.txn.auto_commit {
            // One transaction per flush; rolled back on drop if a row fails
            let mut tx = self.client.transaction()?;
            for params in batch {
                total += tx.execute(stmt, &bind(params))?;
            }
            tx.commit()?;
        } else {
            if !self.txn.open {
                self.client.batch_execute("BEGIN")?;
                self.txn.open = true;
            }
            for params in batch {
                total += self.client.execute(stmt, &bind(params))?;
            }
        }
        Ok(total)
    }

    fn close_statement(&mut self, stmt: StatementId) -> DriverResult<()> {
        let slot = self
            .statements
            .get_mut(stmt.0)
            .ok_or(DriverError::UnknownStatement(stmt.0))?;
        // Dropping the statement deallocates it on the server
        if slot.take().is_none() {
            return Err(DriverError::UnknownStatement(stmt.0));
        }
        if self.statements.iter().all(Option::is_none) {
            self.statements.clear();
        }
        Ok(())
    }

    fn query(&mut self, sql: &str, handler: &mut dyn RowHandler) -> DriverResult<()> {
        let mut rows = self
            .client
            .query_raw(sql, std::iter::empty::<&dyn ToSql>())?;
        while let Some(row) = rows.next()? {
            handler.row(&row)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        if self.txn.open {
            self.client.batch_execute("COMMIT")?;
            self.txn.open = false;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> DriverResult<()> {
        let ServerSession {
            client, statements, ..
        } = *self;
        drop(statements);
        Ok(client.close()?)
    }
}

impl Row for postgres::Row {
    fn get_i32(&self, index: usize) -> DriverResult<Option<i32>> {
        Ok(self.try_get(index)?)
    }

    fn get_i64(&self, index: usize) -> DriverResult<Option<i64>> {
        Ok(self.try_get(index)?)
    }

    fn get_string(&self, index: usize) -> DriverResult<Option<String>> {
        Ok(self.try_get(index)?)
    }

    fn get_date(&self, index: usize) -> DriverResult<Option<NaiveDate>> {
        Ok(self.try_get(index)?)
    }
}
