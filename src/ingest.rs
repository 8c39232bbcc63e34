// src/ingest.rs

use crate::error::PipelineError;
use crate::sources::json_to_value;
use crate::table::{Column, Table, Value};
use chrono::NaiveDateTime;
use serde_json::{Map, Value as Json};
use std::cmp::Ordering;

/// Raw COVID daily schema, in column order.
pub const INPUT_COLUMNS: [&str; 9] = [
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

/// Columns kept in the ingestion sample export.
pub const SAMPLE_COLUMNS: [&str; 7] = [
    "date",
    "positive",
    "death",
    "hospitalizedCurrently",
    "totalTestResults",
    "positiveIncrease",
    "deathIncrease",
];

pub const SAMPLE_ROWS: usize = 50;

/// Project API records onto [`INPUT_COLUMNS`]. Absent and null fields are
/// missing; other fields are ignored.
pub fn records_to_table(records: &[Map<String, Json>]) -> Result<Table, PipelineError> {
    let columns = INPUT_COLUMNS
        .iter()
        .map(|name| {
            let values = records
                .iter()
                .map(|r| r.get(*name).map(json_to_value).unwrap_or(Value::Missing))
                .collect();
            Column::new(*name, values)
        })
        .collect();
    Table::new(columns)
}

/// Most recent `limit` rows by `date` (newest first, undated rows last),
/// restricted to [`SAMPLE_COLUMNS`], with a `timestamp` column set to `now`.
pub fn sample_recent(table: &Table, limit: usize, now: NaiveDateTime) -> Result<Table, PipelineError> {
    let dates = &table.column("date")?.values;
    let mut order: Vec<usize> = (0..table.num_rows()).collect();
    order.sort_by(|&a, &b| match (dates[a].as_f64(), dates[b].as_f64()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    order.truncate(limit);

    let picked = table.take(&order);
    let columns = SAMPLE_COLUMNS
        .iter()
        .map(|name| picked.column(name).cloned())
        .collect::<Result<Vec<_>, _>>()?;
    let stamp = Value::Str(now.format("%Y-%m-%d %H:%M:%S").to_string());
    Table::new(columns)?.with_column(Column::filled("timestamp", stamp, order.len()))
}

/// Audit lines comparing what the API returned with what was stored.
/// "Latest" figures come from the first record, which the API orders newest
/// first.
pub fn ingestion_audit(
    records: &[Map<String, Json>],
    stored_rows: usize,
    now: NaiveDateTime,
) -> Vec<String> {
    let first = |field: &str| {
        records
            .first()
            .and_then(|r| r.get(field))
            .map(|v| json_to_value(v).to_string())
            .unwrap_or_else(|| "N/A".to_string())
    };
    vec![
        format!("Registros COVID extraídos: {}", records.len()),
        format!("Registros almacenados: {}", stored_rows),
        format!(
            "Consistencia: {}",
            if records.len() == stored_rows { "OK" } else { "ERROR" }
        ),
        format!("Última fecha registrada: {}", first("date")),
        format!("Total casos positivos: {}", first("positive")),
        format!("Total fallecidos: {}", first("death")),
        format!("Fecha/Hora auditoría: {}", now.format("%Y-%m-%d %H:%M:%S")),
    ]
}
