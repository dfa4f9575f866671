//! Scenario runner: backend × strategy × commit regime × row count.

use std::fmt;

use crate::backend::{BackendFactory, BackendSpec};
use crate::error::{DriverError, Error, Result};
use crate::insert::{self, CommitRegime, InsertOpts, InsertOutcome, Strategy};
use crate::join::{self, JoinOutcome};
use crate::opts::Opts;
use crate::schema;

/// One fully specified benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub backend: BackendSpec,
    pub strategy: Strategy,
    pub regime: CommitRegime,
    pub target: u32,
    /// Also run the self-join after insertion.
    pub join: bool,
}

impl Scenario {
    pub fn new(backend: BackendSpec, strategy: Strategy, regime: CommitRegime, target: u32) -> Self {
        Self {
            backend,
            strategy,
            regime,
            target,
            join: false,
        }
    }

    pub fn with_join(mut self) -> Self {
        self.join = true;
        self
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.backend, self.strategy, self.regime, self.target
        )?;
        if self.join {
            f.write_str("+join")?;
        }
        Ok(())
    }
}

/// Measurements of a passed scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    /// Identity of the session the scenario ran on.
    pub backend: String,
    pub insert: InsertOutcome,
    pub join: Option<JoinOutcome>,
}

/// Runs scenarios one after another, each on its own session.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    factory: BackendFactory,
    insert_opts: InsertOpts,
}

impl ScenarioRunner {
    pub fn new(opts: Opts) -> Result<Self> {
        opts.validate()?;
        let insert_opts = InsertOpts::from(&opts);
        Ok(Self {
            factory: BackendFactory::new(opts),
            insert_opts,
        })
    }

    pub fn factory(&self) -> &BackendFactory {
        &self.factory
    }

    /// One-time setup before any scenario: wipe the embedded scratch directory.
    pub fn prepare_suite(&self) -> Result<()> {
        self.factory.clear_scratch_dir()
    }

    /// Run `scenario` to completion or to its first error.
    ///
    /// Fails with [`Error::CountMismatch`] when the post-insertion count or the
    /// join cardinality differs from the target.
    pub fn run(&self, scenario: &Scenario) -> Result<ScenarioReport> {
        let mut session = self.factory.open(&scenario.backend)?;
        let backend = session.describe().to_string();

        schema::prepare(&mut *session)?;
        let insert = insert::insert(
            &mut *session,
            scenario.strategy,
            scenario.target,
            scenario.regime,
            &self.insert_opts,
        )?;
        check("insertion", scenario.target, insert.rows)?;

        let join = if scenario.join {
            let outcome = join::count(&mut *session)?;
            check("join", scenario.target, outcome.rows)?;
            Some(outcome)
        } else {
            None
        };

        session.close().map_err(|source| Error::Connection {
            backend: backend.clone(),
            source,
        })?;

        Ok(ScenarioReport {
            scenario: scenario.clone(),
            backend,
            insert,
            join,
        })
    }

    /// Run every scenario in order. A failing scenario does not stop the rest.
    pub fn run_all(&self, scenarios: &[Scenario]) -> Vec<Result<ScenarioReport>> {
        scenarios
            .iter()
            .map(|scenario| {
                let result = self.run(scenario);
                match &result {
                    Ok(_) => tracing::info!(%scenario, "scenario passed"),
                    Err(e) if e.is_count_mismatch() => {
                        tracing::warn!(%scenario, error = %e, "scenario completed with wrong cardinality")
                    }
                    Err(e) => tracing::error!(
                        %scenario,
                        error = %e,
                        sqlstate = e.driver_error().and_then(DriverError::sqlstate),
                        "scenario failed"
                    ),
                }
                result
            })
            .collect()
    }
}

fn check(phase: &'static str, target: u32, actual: u64) -> Result<()> {
    let expected = u64::from(target);
    if actual != expected {
        return Err(Error::CountMismatch {
            phase,
            expected,
            actual,
        });
    }
    Ok(())
}
