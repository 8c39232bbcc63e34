//! Fixtures shared by the unit tests.

use crate::table::{Table, Value};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,covid_etl=debug")),
        )
        .with_test_writer()
        .finish();
    // already set by an earlier test
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// `rows` days of the raw COVID schema with strictly increasing counts, so
/// no two rows are equal.
pub fn covid_table(rows: usize) -> Table {
    let names = [
        "hash",
        "date",
        "positive",
        "death",
        "hospitalizedCurrently",
        "totalTestResults",
        "positiveIncrease",
        "deathIncrease",
        "lastModified",
    ];
    let data = (0..rows as i64)
        .map(|i| {
            vec![
                Value::Str(format!("h{:04}", i)),
                Value::Int(20200301 + i),
                Value::Int(1_000 + 10 * i),
                Value::Int(10 + i),
                Value::Int(100 + i),
                Value::Int(5_000 + 50 * i),
                Value::Int(10),
                Value::Int(1),
                Value::Str("2021-03-07T24:00:00Z".into()),
            ]
        })
        .collect();
    Table::from_rows(&names, data).expect("fixture schema is valid")
}
