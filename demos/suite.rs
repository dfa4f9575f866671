//! Run the full scenario matrix and log timings.
//!
//! Usage:
//!   cargo run --release --example suite
//!   BENCH_ROWS=100000 DATABASE_URL=postgres://postgres@localhost/postgres cargo run --release --example suite
//!
//! Optional filters: `BENCH_BACKENDS=file,memory,server`, `BENCH_STRATEGIES=literal,prepared,batched`,
//! `BENCH_REGIMES=auto,manual`, `BENCH_TAIL=flush|leave`.

use std::env;
use std::str::FromStr;

use employee_bench::{BackendSpec, CommitRegime, Opts, Scenario, ScenarioRunner, Strategy};
use tracing_subscriber::EnvFilter;

fn list<T: FromStr<Err = employee_bench::Error>>(
    key: &str,
    default: Vec<T>,
) -> employee_bench::Result<Vec<T>> {
    match env::var(key) {
        Ok(value) => value.split(',').map(|s| s.trim().parse()).collect(),
        Err(_) => Ok(default),
    }
}

fn main() -> employee_bench::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let rows: u32 = match env::var("BENCH_ROWS") {
        Ok(value) => value
            .parse()
            .map_err(|e| employee_bench::Error::InvalidUsage(format!("BENCH_ROWS: {}", e)))?,
        Err(_) => 10_000,
    };

    let mut opts = Opts::from_env()?;
    if let Ok(tail) = env::var("BENCH_TAIL") {
        opts.tail = tail.parse()?;
    }

    let mut default_backends = vec![BackendSpec::fresh_file(), BackendSpec::EmbeddedMemory];
    if opts.server.is_some() {
        default_backends.push(BackendSpec::Server);
    }
    let backends = list("BENCH_BACKENDS", default_backends)?;
    let strategies = list("BENCH_STRATEGIES", Strategy::ALL.to_vec())?;
    let regimes = list("BENCH_REGIMES", CommitRegime::ALL.to_vec())?;

    let runner = ScenarioRunner::new(opts)?;
    runner.prepare_suite()?;

    let mut scenarios = Vec::new();
    for backend in &backends {
        for &strategy in &strategies {
            for &regime in &regimes {
                let mut scenario = Scenario::new(backend.clone(), strategy, regime, rows);
                if strategy == Strategy::Prepared && regime == CommitRegime::Auto {
                    scenario = scenario.with_join();
                }
                scenarios.push(scenario);
            }
        }
    }

    let results = runner.run_all(&scenarios);
    let undercounts = results
        .iter()
        .filter(|r| r.as_ref().is_err_and(|e| e.is_count_mismatch()))
        .count();
    let failed = results.iter().filter(|r| r.is_err()).count() - undercounts;
    println!(
        "{} scenarios, {} passed, {} wrong row count, {} failed",
        results.len(),
        results.len() - failed - undercounts,
        undercounts,
        failed
    );

    for report in results.iter().flatten() {
        match &report.join {
            Some(join) => println!(
                "{:<40} insert {:>8} ms   join {:>8} ms",
                report.scenario.to_string(),
                report.insert.elapsed.as_millis(),
                join.elapsed.as_millis()
            ),
            None => println!(
                "{:<40} insert {:>8} ms",
                report.scenario.to_string(),
                report.insert.elapsed.as_millis()
            ),
        }
    }

    Ok(())
}
