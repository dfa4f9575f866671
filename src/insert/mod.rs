//! Insert driver: populates EMPLOYEE with rows 1..=N.
//!
//! Three submission strategies are measured:
//!
//! - [`Strategy::Literal`]: one INSERT per row with the keys written into the SQL text
//! - [`Strategy::Prepared`]: one prepared INSERT, bound and executed per row
//! - [`Strategy::Batched`]: the prepared INSERT, queued and flushed every `batch_size` rows
//!
//! Row `i` always gets `SID = i`, `REPORT_TO = i - 1` and the constant tuple
//! for the remaining columns.

mod policy;

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

pub use policy::{CommitAction, CommitPolicy};

use crate::backend::Session;
use crate::error::{DriverError, Error, Result};
use crate::millis;
use crate::opts::{Opts, TailPolicy};
use crate::schema;
use crate::statement::Prepared;

/// Submission strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Literal,
    Prepared,
    Batched,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Literal, Strategy::Prepared, Strategy::Batched];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Literal => "literal",
            Strategy::Prepared => "prepared",
            Strategy::Batched => "batched",
        })
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "literal" | "sql" => Ok(Strategy::Literal),
            "prepared" | "ps" => Ok(Strategy::Prepared),
            "batched" | "batch" => Ok(Strategy::Batched),
            _ => Err(Error::InvalidUsage(format!(
                "Invalid strategy: expected one of ['literal', 'prepared', 'batched'], got {}",
                s
            ))),
        }
    }
}

/// When inserted rows become durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitRegime {
    /// The engine commits after every statement or batch flush.
    Auto,
    /// The driver commits explicitly every `commit_interval` rows (or every flush).
    Manual,
}

impl CommitRegime {
    pub const ALL: [CommitRegime; 2] = [CommitRegime::Auto, CommitRegime::Manual];

    pub fn is_auto(self) -> bool {
        self == CommitRegime::Auto
    }
}

impl fmt::Display for CommitRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommitRegime::Auto => "auto",
            CommitRegime::Manual => "manual",
        })
    }
}

impl FromStr for CommitRegime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(CommitRegime::Auto),
            "manual" => Ok(CommitRegime::Manual),
            _ => Err(Error::InvalidUsage(format!(
                "Invalid commit regime: expected 'auto' or 'manual', got {}",
                s
            ))),
        }
    }
}

/// Knobs of the insert driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOpts {
    pub batch_size: u32,
    pub commit_interval: u32,
    pub tail: TailPolicy,
}

impl Default for InsertOpts {
    fn default() -> Self {
        Self {
            batch_size: 50,
            commit_interval: 50,
            tail: TailPolicy::Flush,
        }
    }
}

impl From<&Opts> for InsertOpts {
    fn from(opts: &Opts) -> Self {
        Self {
            batch_size: opts.batch_size,
            commit_interval: opts.commit_interval,
            tail: opts.tail,
        }
    }
}

/// Result of one insertion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// `COUNT(1)` read on the inserting session after the last row.
    pub rows: u64,
    /// Time from just before the first insert to just after the last.
    pub elapsed: Duration,
    /// Rows executed but left uncommitted (manual commit with [`TailPolicy::Leave`]).
    pub uncommitted: u64,
    /// Rows queued but never flushed (batched with [`TailPolicy::Leave`]).
    pub unflushed: u64,
}

fn insert_err(sid: i32) -> impl FnOnce(DriverError) -> Error {
    move |source| Error::Insert { sid, source }
}

/// Populate the (already prepared) EMPLOYEE table with `target` rows.
///
/// Sets the session's auto-commit according to `regime`, runs `strategy`,
/// then reads `COUNT(1)` on the same session so rows still pending in an
/// open transaction are included.
pub fn insert<S: Session + ?Sized>(
    session: &mut S,
    strategy: Strategy,
    target: u32,
    regime: CommitRegime,
    opts: &InsertOpts,
) -> Result<InsertOutcome> {
    let last_sid = i32::try_from(target)
        .map_err(|_| Error::InvalidUsage(format!("target {} exceeds SID range", target)))?;
    if opts.batch_size == 0 || opts.commit_interval == 0 {
        return Err(Error::InvalidUsage(
            "batch_size and commit_interval must be at least 1".into(),
        ));
    }

    session
        .set_auto_commit(regime.is_auto())
        .map_err(insert_err(0))?;

    let mut outcome = match strategy {
        Strategy::Literal => insert_literal(session, last_sid, regime, opts)?,
        Strategy::Prepared => insert_prepared(session, last_sid, regime, opts)?,
        Strategy::Batched => insert_batched(session, last_sid, regime, opts)?,
    };

    tracing::info!(
        phase = "insertion",
        backend = %session.kind(),
        %strategy,
        %regime,
        records = target,
        elapsed_ms = millis(outcome.elapsed),
        "insertion duration: [{}] ms for {} records",
        millis(outcome.elapsed),
        target
    );

    outcome.rows = schema::count(session)?;
    Ok(outcome)
}

fn insert_literal<S: Session + ?Sized>(
    session: &mut S,
    last_sid: i32,
    regime: CommitRegime,
    opts: &InsertOpts,
) -> Result<InsertOutcome> {
    let mut policy = CommitPolicy::new(regime, opts.commit_interval);

    let start = Instant::now();
    for sid in 1..=last_sid {
        session
            .execute(&schema::literal_insert(sid))
            .map_err(insert_err(sid))?;
        if policy.record(1) == CommitAction::Commit {
            session.commit().map_err(insert_err(sid))?;
        }
    }
    if policy.finish(opts.tail) == CommitAction::Commit {
        session.commit().map_err(insert_err(last_sid))?;
    }
    let elapsed = start.elapsed();

    Ok(InsertOutcome {
        rows: 0,
        elapsed,
        uncommitted: u64::from(policy.pending()),
        unflushed: 0,
    })
}

fn insert_prepared<S: Session + ?Sized>(
    session: &mut S,
    last_sid: i32,
    regime: CommitRegime,
    opts: &InsertOpts,
) -> Result<InsertOutcome> {
    let sql = schema::parameterized_insert(&*session);
    let mut stmt = Prepared::new(session, &sql).map_err(|source| Error::Prepare {
        sql: sql.clone(),
        source,
    })?;
    let mut policy = CommitPolicy::new(regime, opts.commit_interval);

    let start = Instant::now();
    for sid in 1..=last_sid {
        stmt.execute(&[sid, sid - 1]).map_err(insert_err(sid))?;
        if policy.record(1) == CommitAction::Commit {
            stmt.session().commit().map_err(insert_err(sid))?;
        }
    }
    if policy.finish(opts.tail) == CommitAction::Commit {
        stmt.session().commit().map_err(insert_err(last_sid))?;
    }
    let elapsed = start.elapsed();

    Ok(InsertOutcome {
        rows: 0,
        elapsed,
        uncommitted: u64::from(policy.pending()),
        unflushed: 0,
    })
}

fn insert_batched<S: Session + ?Sized>(
    session: &mut S,
    last_sid: i32,
    regime: CommitRegime,
    opts: &InsertOpts,
) -> Result<InsertOutcome> {
    let sql = schema::parameterized_insert(&*session);
    let mut stmt = Prepared::new(session, &sql).map_err(|source| Error::Prepare {
        sql: sql.clone(),
        source,
    })?;
    // Counts flushes: every flush is followed by a commit under manual commit
    let mut policy = CommitPolicy::new(regime, 1);
    let batch_size = opts.batch_size as usize;
    let mut uncommitted = 0u64;

    let start = Instant::now();
    for sid in 1..=last_sid {
        stmt.add_batch(&[sid, sid - 1]);
        if stmt.queued() >= batch_size {
            let flushed = stmt.execute_batch().map_err(insert_err(sid))?;
            uncommitted += flushed;
            if policy.record(1) == CommitAction::Commit {
                stmt.session().commit().map_err(insert_err(sid))?;
                uncommitted = 0;
            }
        }
    }

    let unflushed = match opts.tail {
        TailPolicy::Flush => {
            if stmt.queued() > 0 {
                let flushed = stmt.execute_batch().map_err(insert_err(last_sid))?;
                uncommitted += flushed;
                if policy.record(1) == CommitAction::Commit {
                    stmt.session().commit().map_err(insert_err(last_sid))?;
                    uncommitted = 0;
                }
            }
            0
        }
        TailPolicy::Leave => stmt.queued() as u64,
    };
    let elapsed = start.elapsed();

    if unflushed > 0 {
        tracing::warn!(
            unflushed,
            batch_size,
            "final partial batch left unflushed; row count will fall short of target"
        );
    }
    if regime.is_auto() {
        uncommitted = 0;
    }

    Ok(InsertOutcome {
        rows: 0,
        elapsed,
        uncommitted,
        unflushed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("ps".parse::<Strategy>().unwrap(), Strategy::Prepared);
        assert!("bulk".parse::<Strategy>().is_err());
    }

    #[test]
    fn commit_regime_names() {
        assert_eq!("auto".parse::<CommitRegime>().unwrap(), CommitRegime::Auto);
        assert_eq!(
            "manual".parse::<CommitRegime>().unwrap(),
            CommitRegime::Manual
        );
        assert!("sometimes".parse::<CommitRegime>().is_err());
    }

    #[test]
    fn insert_opts_follow_suite_opts() {
        let opts = Opts {
            batch_size: 25,
            tail: TailPolicy::Leave,
            ..Opts::default()
        };
        let insert_opts = InsertOpts::from(&opts);
        assert_eq!(insert_opts.batch_size, 25);
        assert_eq!(insert_opts.commit_interval, 50);
        assert_eq!(insert_opts.tail, TailPolicy::Leave);
    }
}
