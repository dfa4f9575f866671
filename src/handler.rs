//! Row access and result handlers.

use chrono::NaiveDate;

use crate::error::DriverResult;

/// Column access on a single result row, independent of the engine.
///
/// Indexes are zero-based. SQL NULL decodes to `None`.
pub trait Row {
    fn get_i32(&self, index: usize) -> DriverResult<Option<i32>>;

    fn get_i64(&self, index: usize) -> DriverResult<Option<i64>>;

    fn get_string(&self, index: usize) -> DriverResult<Option<String>>;

    fn get_date(&self, index: usize) -> DriverResult<Option<NaiveDate>>;
}

/// Handler for query results.
///
/// `row` is called once per fetched row, in cursor order. The row is only
/// valid for the duration of the call.
pub trait RowHandler {
    fn row(&mut self, row: &dyn Row) -> DriverResult<()>;
}

/// Handler that captures the first column of the first row as an integer.
#[derive(Debug, Default)]
pub struct ScalarHandler {
    value: Option<i64>,
}

impl ScalarHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured value, `None` if no row was returned or the value was NULL.
    pub fn value(&self) -> Option<i64> {
        self.value
    }
}

impl RowHandler for ScalarHandler {
    fn row(&mut self, row: &dyn Row) -> DriverResult<()> {
        if self.value.is_none() {
            self.value = row.get_i64(0)?;
        }
        Ok(())
    }
}

/// Handler that maps every row through a closure and collects the results.
pub struct CollectHandler<T, F> {
    rows: Vec<T>,
    map: F,
}

impl<T, F> CollectHandler<T, F>
where
    F: FnMut(&dyn Row) -> DriverResult<T>,
{
    pub fn new(map: F) -> Self {
        Self {
            rows: Vec::new(),
            map,
        }
    }

    /// Take collected rows.
    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

impl<T, F> RowHandler for CollectHandler<T, F>
where
    F: FnMut(&dyn Row) -> DriverResult<T>,
{
    fn row(&mut self, row: &dyn Row) -> DriverResult<()> {
        let mapped = (self.map)(row)?;
        self.rows.push(mapped);
        Ok(())
    }
}
