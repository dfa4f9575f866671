//! Join driver: every employee paired with the rows that report to them.

use std::hint::black_box;
use std::time::{Duration, Instant};

use crate::backend::Session;
use crate::error::{DriverResult, Error, Result};
use crate::handler::{Row, RowHandler};
use crate::millis;

/// Left self-join. The left side dictates cardinality: one row per employee
/// when REPORT_TO values are unique.
pub const JOIN_SQL: &str = "SELECT * FROM EMPLOYEE e LEFT JOIN EMPLOYEE e2 ON e.SID = e2.REPORT_TO";

const SID_COLUMN: usize = 0;
const NAME_FIRST_COLUMN: usize = 2;
/// `e2.SID`, NULL when nobody reports to the left-side employee.
const RIGHT_SID_COLUMN: usize = 7;

/// Result of one join run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Rows observed on the cursor.
    pub rows: u64,
    /// Rows whose right side was NULL.
    pub unmatched: u64,
    /// Time from submitting the query to exhausting the cursor.
    pub elapsed: Duration,
}

#[derive(Default)]
struct JoinHandler {
    rows: u64,
    unmatched: u64,
}

impl RowHandler for JoinHandler {
    fn row(&mut self, row: &dyn Row) -> DriverResult<()> {
        // Decode the fields so every joined row is materialized
        black_box(row.get_i32(SID_COLUMN)?);
        black_box(row.get_string(NAME_FIRST_COLUMN)?);
        if row.get_i32(RIGHT_SID_COLUMN)?.is_none() {
            self.unmatched += 1;
        }
        self.rows += 1;
        Ok(())
    }
}

/// Run the self-join on `session` and count the result rows.
pub fn count<S: Session + ?Sized>(session: &mut S) -> Result<JoinOutcome> {
    let mut handler = JoinHandler::default();

    let start = Instant::now();
    session
        .query(JOIN_SQL, &mut handler)
        .map_err(|source| Error::Query {
            sql: JOIN_SQL,
            source,
        })?;
    let elapsed = start.elapsed();

    tracing::info!(
        phase = "join",
        backend = %session.kind(),
        records = handler.rows,
        elapsed_ms = millis(elapsed),
        "join duration: [{}] ms for {} records",
        millis(elapsed),
        handler.rows
    );

    Ok(JoinOutcome {
        rows: handler.rows,
        unmatched: handler.unmatched,
        elapsed,
    })
}
