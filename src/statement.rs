//! Prepared statement handles.

use crate::backend::Session;
use crate::error::DriverResult;

/// Opaque handle to a statement prepared on a [`Session`].
///
/// Only meaningful on the session that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(pub(crate) usize);

/// A prepared statement bound to the session that prepared it.
///
/// Holds the session mutably for its whole lifetime and closes the statement
/// on drop. Rows queued with [`add_batch`](Self::add_batch) and never sent
/// with [`execute_batch`](Self::execute_batch) are discarded on drop.
pub struct Prepared<'s, S: Session + ?Sized> {
    session: &'s mut S,
    id: StatementId,
    batch: Vec<Vec<i32>>,
}

impl<'s, S: Session + ?Sized> Prepared<'s, S> {
    /// Prepare `sql` on `session`.
    pub fn new(session: &'s mut S, sql: &str) -> DriverResult<Self> {
        let id = session.prepare(sql)?;
        Ok(Self {
            session,
            id,
            batch: Vec::new(),
        })
    }

    /// Bind `params` positionally and execute immediately.
    pub fn execute(&mut self, params: &[i32]) -> DriverResult<u64> {
        self.session.execute_prepared(self.id, params)
    }

    /// Queue one parameter set for the next [`execute_batch`](Self::execute_batch).
    pub fn add_batch(&mut self, params: &[i32]) {
        self.batch.push(params.to_vec());
    }

    /// Number of parameter sets waiting to be flushed.
    pub fn queued(&self) -> usize {
        self.batch.len()
    }

    /// Send every queued parameter set to the engine as one batch.
    ///
    /// Returns the number of rows flushed. The queue is empty afterwards,
    /// even if the flush failed.
    pub fn execute_batch(&mut self) -> DriverResult<u64> {
        let batch = std::mem::take(&mut self.batch);
        if batch.is_empty() {
            return Ok(0);
        }
        self.session.execute_batch(self.id, &batch)
    }

    /// Access the owning session, e.g. to commit between executions.
    pub fn session(&mut self) -> &mut S {
        &mut *self.session
    }
}

impl<S: Session + ?Sized> Drop for Prepared<'_, S> {
    fn drop(&mut self) {
        if !self.batch.is_empty() {
            tracing::debug!(discarded = self.batch.len(), "dropping unflushed batch");
        }
        if let Err(e) = self.session.close_statement(self.id) {
            tracing::debug!(error = %e, "failed to close prepared statement");
        }
    }
}
