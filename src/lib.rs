//! Insert and self-join throughput benchmark for SQL engines.
//!
//! # Features
//!
//! - **Three backends**: embedded file, embedded in-memory, and a TCP server
//! - **Three submission strategies**: literal SQL, prepared reuse, batched prepared
//! - **Two commit regimes**: auto-commit, or explicit commits at fixed boundaries
//! - **Verified runs**: every scenario checks row count and join cardinality
//!
//! # Example
//!
//! ```no_run
//! use employee_bench::{BackendSpec, CommitRegime, Opts, Scenario, ScenarioRunner, Strategy};
//!
//! fn main() -> employee_bench::Result<()> {
//!     let runner = ScenarioRunner::new(Opts::from_env()?)?;
//!     runner.prepare_suite()?;
//!
//!     let scenario = Scenario::new(
//!         BackendSpec::fresh_file(),
//!         Strategy::Prepared,
//!         CommitRegime::Auto,
//!         1_000,
//!     )
//!     .with_join();
//!     let report = runner.run(&scenario)?;
//!     println!("inserted {} rows in {:?}", report.insert.rows, report.insert.elapsed);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod handler;
pub mod insert;
pub mod join;
pub mod opts;
pub mod scenario;
pub mod schema;
pub mod statement;

pub use backend::{BackendFactory, BackendKind, BackendSpec, Session};
pub use error::{DriverError, Error, Result};
pub use handler::{Row, RowHandler};
pub use insert::{CommitRegime, InsertOpts, InsertOutcome, Strategy};
pub use join::JoinOutcome;
pub use opts::{Opts, ServerOpts, TailPolicy};
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner};
pub use schema::Employee;
pub use statement::{Prepared, StatementId};

/// Whole milliseconds of `elapsed`, saturating.
pub(crate) fn millis(elapsed: std::time::Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
