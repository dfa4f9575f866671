//! The EMPLOYEE table: DDL, row generator SQL, count and snapshot.

use chrono::NaiveDate;

use crate::backend::Session;
use crate::error::{DriverError, DriverResult, Error, Result};
use crate::handler::{CollectHandler, Row, ScalarHandler};

pub const DROP_TABLE: &str = "DROP TABLE IF EXISTS EMPLOYEE";

pub const CREATE_TABLE: &str = "CREATE TABLE EMPLOYEE (
    SID           INTEGER,
    REPORT_TO     INTEGER,
    NAME_FIRST    VARCHAR(32),
    NAME_LAST     VARCHAR(32),
    EMAIL         VARCHAR(128),
    ADDRESS       VARCHAR(256),
    DATE_OF_BIRTH DATE
)";

pub const CREATE_INDEX_SID: &str = "CREATE INDEX IDX_SID ON EMPLOYEE(SID)";

pub const CREATE_INDEX_REPORT_TO: &str = "CREATE INDEX IDX_REPORT_TO_SID ON EMPLOYEE(REPORT_TO)";

/// Fixture statements in execution order.
pub const FIXTURE: [&str; 4] = [
    DROP_TABLE,
    CREATE_TABLE,
    CREATE_INDEX_SID,
    CREATE_INDEX_REPORT_TO,
];

pub const SELECT_COUNT: &str = "SELECT COUNT(1) FROM EMPLOYEE";

pub const SELECT_ALL: &str = "SELECT SID, REPORT_TO, NAME_FIRST, NAME_LAST, EMAIL, ADDRESS, DATE_OF_BIRTH FROM EMPLOYEE ORDER BY SID";

const INSERT_COLUMNS: &str = "SID, REPORT_TO, NAME_FIRST, NAME_LAST, EMAIL, ADDRESS, DATE_OF_BIRTH";

const CONSTANT_VALUES: &str =
    "'EMP-FIRST-NAME', 'EMP-LAST-NAME', 'email@company.com', '#1 Hacker Road', '1980-11-25'";

pub const NAME_FIRST: &str = "EMP-FIRST-NAME";
pub const NAME_LAST: &str = "EMP-LAST-NAME";
pub const EMAIL: &str = "email@company.com";
pub const ADDRESS: &str = "#1 Hacker Road";

/// One EMPLOYEE row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub sid: i32,
    pub report_to: i32,
    pub name_first: String,
    pub name_last: String,
    pub email: String,
    pub address: String,
    pub date_of_birth: NaiveDate,
}

impl Employee {
    /// The row the generator writes for `sid`.
    pub fn generated(sid: i32) -> Self {
        Self {
            sid,
            report_to: sid - 1,
            name_first: NAME_FIRST.to_string(),
            name_last: NAME_LAST.to_string(),
            email: EMAIL.to_string(),
            address: ADDRESS.to_string(),
            date_of_birth: date_of_birth(),
        }
    }

    fn from_row(row: &dyn Row) -> DriverResult<Self> {
        Ok(Self {
            sid: required(0, row.get_i32(0)?)?,
            report_to: required(1, row.get_i32(1)?)?,
            name_first: required(2, row.get_string(2)?)?,
            name_last: required(3, row.get_string(3)?)?,
            email: required(4, row.get_string(4)?)?,
            address: required(5, row.get_string(5)?)?,
            date_of_birth: required(6, row.get_date(6)?)?,
        })
    }
}

/// DATE_OF_BIRTH shared by every generated row.
pub fn date_of_birth() -> NaiveDate {
    NaiveDate::from_ymd_opt(1980, 11, 25).unwrap_or_default()
}

fn required<T>(index: usize, value: Option<T>) -> DriverResult<T> {
    value.ok_or_else(|| DriverError::Decode {
        index,
        message: "unexpected NULL".into(),
    })
}

/// INSERT for `sid` with both keys written literally into the statement text.
pub fn literal_insert(sid: i32) -> String {
    format!(
        "INSERT INTO EMPLOYEE ({}) VALUES ({}, {}, {})",
        INSERT_COLUMNS,
        sid,
        sid - 1,
        CONSTANT_VALUES
    )
}

/// INSERT with SID and REPORT_TO as positional parameters in the session's dialect.
pub fn parameterized_insert<S: Session + ?Sized>(session: &S) -> String {
    format!(
        "INSERT INTO EMPLOYEE ({}) VALUES ({}, {}, {})",
        INSERT_COLUMNS,
        session.placeholder(1),
        session.placeholder(2),
        CONSTANT_VALUES
    )
}

/// Drop and recreate EMPLOYEE with both secondary indexes.
///
/// Leaves an empty, indexed table. The first failing statement aborts the
/// fixture; nothing already executed is undone.
pub fn prepare<S: Session + ?Sized>(session: &mut S) -> Result<()> {
    for statement in FIXTURE {
        session
            .execute(statement)
            .map_err(|source| Error::Schema { statement, source })?;
    }
    tracing::debug!(backend = %session.describe(), "EMPLOYEE table recreated");
    Ok(())
}

/// `SELECT COUNT(1) FROM EMPLOYEE` on `session`.
pub fn count<S: Session + ?Sized>(session: &mut S) -> Result<u64> {
    let query_err = |source: DriverError| Error::Query {
        sql: SELECT_COUNT,
        source,
    };
    let mut handler = ScalarHandler::new();
    session.query(SELECT_COUNT, &mut handler).map_err(query_err)?;
    let value = required(0, handler.value()).map_err(query_err)?;
    u64::try_from(value).map_err(|_| {
        query_err(DriverError::Decode {
            index: 0,
            message: format!("negative count {}", value),
        })
    })
}

/// Every row of EMPLOYEE ordered by SID.
pub fn snapshot<S: Session + ?Sized>(session: &mut S) -> Result<Vec<Employee>> {
    let mut handler = CollectHandler::new(Employee::from_row);
    session
        .query(SELECT_ALL, &mut handler)
        .map_err(|source| Error::Query {
            sql: SELECT_ALL,
            source,
        })?;
    Ok(handler.into_rows())
}
