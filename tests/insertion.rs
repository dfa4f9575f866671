//! Insertion scenarios on the embedded engine

use std::env;
use std::sync::OnceLock;

use employee_bench::handler::ScalarHandler;
use employee_bench::insert::{self, InsertOpts};
use employee_bench::{
    BackendSpec, CommitRegime, Employee, Error, Opts, Scenario, ScenarioRunner, Session,
    Strategy, TailPolicy, schema,
};

fn opts(tail: TailPolicy) -> Opts {
    Opts {
        scratch_dir: env::temp_dir().join("employee-bench-tests-insertion"),
        tail,
        ..Opts::default()
    }
}

fn runner() -> &'static ScenarioRunner {
    static RUNNER: OnceLock<ScenarioRunner> = OnceLock::new();
    RUNNER.get_or_init(|| {
        let runner = ScenarioRunner::new(opts(TailPolicy::Flush)).expect("valid options");
        runner.prepare_suite().expect("Failed to clear scratch dir");
        runner
    })
}

/// Runner that leaves partial batches and pending commits alone.
fn leave_runner() -> &'static ScenarioRunner {
    static RUNNER: OnceLock<ScenarioRunner> = OnceLock::new();
    RUNNER.get_or_init(|| {
        // Scratch dir must be wiped before anything is created in it
        let _ = runner();
        ScenarioRunner::new(opts(TailPolicy::Leave)).expect("valid options")
    })
}

fn open(spec: &BackendSpec) -> Box<dyn Session> {
    runner().factory().open(spec).expect("Failed to open session")
}

fn leave_opts() -> InsertOpts {
    InsertOpts {
        tail: TailPolicy::Leave,
        ..InsertOpts::default()
    }
}

#[test]
fn memory_literal_auto_commit() {
    let scenario = Scenario::new(
        BackendSpec::EmbeddedMemory,
        Strategy::Literal,
        CommitRegime::Auto,
        100,
    );
    let report = runner().run(&scenario).unwrap();
    assert_eq!(report.insert.rows, 100);
    assert_eq!(report.insert.uncommitted, 0);
    assert!(report.join.is_none());
}

#[test]
fn memory_batched_auto_commit() {
    let scenario = Scenario::new(
        BackendSpec::EmbeddedMemory,
        Strategy::Batched,
        CommitRegime::Auto,
        500,
    );
    let report = runner().run(&scenario).unwrap();
    assert_eq!(report.insert.rows, 500);
    assert_eq!(report.insert.unflushed, 0);
}

#[test]
fn memory_batched_partial_batch_is_flushed() {
    let scenario = Scenario::new(
        BackendSpec::EmbeddedMemory,
        Strategy::Batched,
        CommitRegime::Auto,
        510,
    );
    let report = runner().run(&scenario).unwrap();
    assert_eq!(report.insert.rows, 510);
    assert_eq!(report.insert.unflushed, 0);
}

#[test]
fn memory_batched_partial_batch_left_undercounts() {
    let scenario = Scenario::new(
        BackendSpec::EmbeddedMemory,
        Strategy::Batched,
        CommitRegime::Auto,
        510,
    );
    match leave_runner().run(&scenario) {
        Err(Error::CountMismatch {
            phase,
            expected,
            actual,
        }) => {
            assert_eq!(phase, "insertion");
            assert_eq!(expected, 510);
            assert_eq!(actual, 500);
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(report) => panic!("expected an undercount, got {} rows", report.insert.rows),
    }
}

#[test]
fn file_prepared_manual_commit() {
    let scenario = Scenario::new(
        BackendSpec::fresh_file(),
        Strategy::Prepared,
        CommitRegime::Manual,
        1000,
    );
    let report = runner().run(&scenario).unwrap();
    assert_eq!(report.insert.rows, 1000);
    assert_eq!(report.insert.uncommitted, 0);
    assert!(report.backend.contains("db-"));
}

#[test]
fn every_strategy_and_regime_reaches_target() {
    for strategy in Strategy::ALL {
        for regime in CommitRegime::ALL {
            let scenario = Scenario::new(BackendSpec::EmbeddedMemory, strategy, regime, 150);
            let report = runner()
                .run(&scenario)
                .unwrap_or_else(|e| panic!("{} failed: {}", scenario, e));
            assert_eq!(report.insert.rows, 150, "{}", scenario);
        }
    }
}

#[test]
fn strategies_write_identical_rows() {
    let expected: Vec<Employee> = (1..=120).map(Employee::generated).collect();

    for regime in CommitRegime::ALL {
        for strategy in Strategy::ALL {
            let mut session = open(&BackendSpec::EmbeddedMemory);
            schema::prepare(&mut *session).unwrap();
            insert::insert(&mut *session, strategy, 120, regime, &InsertOpts::default())
                .unwrap();

            let rows = schema::snapshot(&mut *session).unwrap();
            assert_eq!(rows, expected, "{}/{}", strategy, regime);
        }
    }
}

#[test]
fn schema_fixture_is_idempotent() {
    let mut session = open(&BackendSpec::EmbeddedMemory);
    schema::prepare(&mut *session).unwrap();
    let outcome = insert::insert(
        &mut *session,
        Strategy::Prepared,
        100,
        CommitRegime::Auto,
        &InsertOpts::default(),
    )
    .unwrap();
    assert_eq!(outcome.rows, 100);

    schema::prepare(&mut *session).unwrap();
    assert_eq!(schema::count(&mut *session).unwrap(), 0);

    let mut indexes = ScalarHandler::new();
    session
        .query(
            "SELECT COUNT(1) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'EMPLOYEE'",
            &mut indexes,
        )
        .unwrap();
    assert_eq!(indexes.value(), Some(2));
}

#[test]
fn fixed_name_file_database_is_reset_between_runs() {
    let scenario = Scenario::new(
        BackendSpec::file("fixed-path-db"),
        Strategy::Prepared,
        CommitRegime::Auto,
        100,
    );
    for _ in 0..2 {
        let report = runner().run(&scenario).unwrap();
        assert_eq!(report.insert.rows, 100);
    }
}

#[test]
fn literal_manual_commit_flushes_tail() {
    let mut session = open(&BackendSpec::EmbeddedMemory);
    schema::prepare(&mut *session).unwrap();
    let outcome = insert::insert(
        &mut *session,
        Strategy::Literal,
        75,
        CommitRegime::Manual,
        &InsertOpts::default(),
    )
    .unwrap();
    assert_eq!(outcome.rows, 75);
    assert_eq!(outcome.uncommitted, 0);
    assert!(!session.in_transaction());
}

#[test]
fn batched_manual_commit_leaves_partial_batch() {
    let mut session = open(&BackendSpec::EmbeddedMemory);
    schema::prepare(&mut *session).unwrap();
    let outcome = insert::insert(
        &mut *session,
        Strategy::Batched,
        120,
        CommitRegime::Manual,
        &leave_opts(),
    )
    .unwrap();
    assert_eq!(outcome.rows, 100);
    assert_eq!(outcome.unflushed, 20);
    assert_eq!(outcome.uncommitted, 0);
}

#[test]
fn pending_rows_are_invisible_to_an_independent_session() {
    let spec = BackendSpec::file("verifier-leave");
    let factory = leave_runner().factory();

    let mut writer = factory.open(&spec).unwrap();
    schema::prepare(&mut *writer).unwrap();
    let outcome = insert::insert(
        &mut *writer,
        Strategy::Prepared,
        110,
        CommitRegime::Manual,
        &leave_opts(),
    )
    .unwrap();
    // Same session sees its own uncommitted rows
    assert_eq!(outcome.rows, 110);
    assert_eq!(outcome.uncommitted, 10);
    assert!(writer.in_transaction());

    let mut verifier = factory.open(&spec).unwrap();
    assert_eq!(schema::count(&mut *verifier).unwrap(), 100);
}

#[test]
fn flushed_tail_is_visible_to_an_independent_session() {
    let spec = BackendSpec::file("verifier-flush");
    let factory = runner().factory();

    let mut writer = factory.open(&spec).unwrap();
    schema::prepare(&mut *writer).unwrap();
    let outcome = insert::insert(
        &mut *writer,
        Strategy::Prepared,
        110,
        CommitRegime::Manual,
        &InsertOpts::default(),
    )
    .unwrap();
    assert_eq!(outcome.rows, 110);
    assert!(!writer.in_transaction());
    writer.close().unwrap();

    let mut verifier = factory.open(&spec).unwrap();
    assert_eq!(schema::count(&mut *verifier).unwrap(), 110);
}

/// Rows an independent session sees after a manual-commit run that leaves its tail alone.
fn committed_rows_seen_by_verifier(name: &str, strategy: Strategy, target: u32) -> u64 {
    let spec = BackendSpec::file(name);
    let factory = leave_runner().factory();

    let mut writer = factory.open(&spec).unwrap();
    schema::prepare(&mut *writer).unwrap();
    insert::insert(
        &mut *writer,
        strategy,
        target,
        CommitRegime::Manual,
        &leave_opts(),
    )
    .unwrap();

    let mut verifier = factory.open(&spec).unwrap();
    schema::count(&mut *verifier).unwrap()
}

#[test]
fn literal_manual_commits_reach_the_engine_at_interval_boundaries() {
    assert_eq!(
        committed_rows_seen_by_verifier("verifier-literal-110", Strategy::Literal, 110),
        100
    );
}

#[test]
fn batched_manual_commits_reach_the_engine_at_batch_boundaries() {
    assert_eq!(
        committed_rows_seen_by_verifier("verifier-batched-110", Strategy::Batched, 110),
        100
    );
    assert_eq!(
        committed_rows_seen_by_verifier("verifier-batched-120", Strategy::Batched, 120),
        100
    );
}

#[test]
fn failed_auto_commit_batch_does_not_capture_later_writes() {
    let spec = BackendSpec::file("failed-batch");
    let factory = runner().factory();

    let mut session = factory.open(&spec).unwrap();
    schema::prepare(&mut *session).unwrap();
    let sql = schema::parameterized_insert(&*session);
    let stmt = session.prepare(&sql).unwrap();

    // Second parameter set is one value short
    assert!(session.execute_batch(stmt, &[vec![1, 0], vec![2]]).is_err());
    assert!(session.auto_commit());
    assert!(!session.in_transaction());

    session.execute(&schema::literal_insert(42)).unwrap();
    session.close_statement(stmt).unwrap();
    drop(session);

    let mut reopened = factory.open(&spec).unwrap();
    // The failed batch rolled back as a unit; the later write was committed
    assert_eq!(schema::count(&mut *reopened).unwrap(), 1);
}

#[test]
fn target_beyond_sid_range_is_rejected() {
    let mut session = open(&BackendSpec::EmbeddedMemory);
    schema::prepare(&mut *session).unwrap();
    let err = insert::insert(
        &mut *session,
        Strategy::Prepared,
        u32::MAX,
        CommitRegime::Auto,
        &InsertOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidUsage(_)));
}
