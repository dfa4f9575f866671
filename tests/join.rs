//! Self-join scenarios on the embedded engine

use std::env;
use std::sync::OnceLock;

use employee_bench::{
    BackendSpec, CommitRegime, Opts, Scenario, ScenarioRunner, Session, Strategy, join, schema,
};

fn runner() -> &'static ScenarioRunner {
    static RUNNER: OnceLock<ScenarioRunner> = OnceLock::new();
    RUNNER.get_or_init(|| {
        let runner = ScenarioRunner::new(Opts {
            scratch_dir: env::temp_dir().join("employee-bench-tests-join"),
            ..Opts::default()
        })
        .expect("valid options");
        runner.prepare_suite().expect("Failed to clear scratch dir");
        runner
    })
}

fn open_memory() -> Box<dyn Session> {
    runner()
        .factory()
        .open(&BackendSpec::EmbeddedMemory)
        .expect("Failed to open session")
}

#[test]
fn file_prepared_auto_commit_with_join() {
    let scenario = Scenario::new(
        BackendSpec::fresh_file(),
        Strategy::Prepared,
        CommitRegime::Auto,
        1000,
    )
    .with_join();
    let report = runner().run(&scenario).unwrap();
    assert_eq!(report.insert.rows, 1000);

    let join = report.join.expect("join outcome");
    assert_eq!(join.rows, 1000);
    // Only the last employee has nobody reporting to them
    assert_eq!(join.unmatched, 1);
}

#[test]
fn join_cardinality_follows_every_strategy() {
    for strategy in Strategy::ALL {
        let scenario = Scenario::new(
            BackendSpec::EmbeddedMemory,
            strategy,
            CommitRegime::Manual,
            200,
        )
        .with_join();
        let report = runner().run(&scenario).unwrap();
        assert_eq!(report.join.map(|j| j.rows), Some(200), "{}", scenario);
    }
}

#[test]
fn join_on_empty_table_returns_nothing() {
    let mut session = open_memory();
    schema::prepare(&mut *session).unwrap();

    let outcome = join::count(&mut *session).unwrap();
    assert_eq!(outcome.rows, 0);
    assert_eq!(outcome.unmatched, 0);
}

#[test]
fn left_side_dictates_cardinality() {
    let mut session = open_memory();
    schema::prepare(&mut *session).unwrap();

    // Nobody reports to any of these
    for sid in [10, 20, 30] {
        session
            .execute(&format!(
                "INSERT INTO EMPLOYEE (SID, REPORT_TO, NAME_FIRST) VALUES ({}, 0, 'X')",
                sid
            ))
            .unwrap();
    }

    let outcome = join::count(&mut *session).unwrap();
    assert_eq!(outcome.rows, 3);
    assert_eq!(outcome.unmatched, 3);
}
