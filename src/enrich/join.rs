use crate::error::PipelineError;
use crate::table::{utils::clean_str, Column, Table, Value};
use std::collections::HashMap;

/// Rewrite `key` as trimmed strings so that `" 5001"`, `"5001"` and `5001`
/// all compare equal. Missing keys stay missing.
pub fn normalize_key(table: Table, key: &str, side: &str) -> Result<Table, PipelineError> {
    let col = table.column(key).map_err(|_| PipelineError::JoinKeyMissing {
        side: side.to_string(),
        column: key.to_string(),
    })?;
    let values = col
        .values
        .iter()
        .map(|v| match v.coerce_string() {
            Value::Str(s) => Value::Str(clean_str(&s)),
            other => other,
        })
        .collect();
    table.replace_column(Column::new(key, values))
}

/// Inner equi-join on `key`.
///
/// Rows come out in `left` order, and within one key in `right` order, so
/// duplicate keys on both sides produce their full cross product. Output
/// columns are the key, then the other left columns, then the other right
/// columns. A non-key name present on both sides gets `_x` (left) and `_y`
/// (right) appended. Missing keys never match.
pub fn inner_join(left: &Table, right: &Table, key: &str) -> Result<Table, PipelineError> {
    let missing = |side: &str| PipelineError::JoinKeyMissing {
        side: side.to_string(),
        column: key.to_string(),
    };
    let left_key = left.column(key).map_err(|_| missing("external_a"))?;
    let right_key = right.column(key).map_err(|_| missing("external_b"))?;

    // 1) index the right side
    let mut index: HashMap<&Value, Vec<usize>> = HashMap::new();
    for (j, v) in right_key.values.iter().enumerate() {
        if !v.is_missing() {
            index.entry(v).or_default().push(j);
        }
    }

    // 2) probe with the left side
    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for (i, v) in left_key.values.iter().enumerate() {
        if let Some(matches) = index.get(v) {
            for &j in matches {
                left_rows.push(i);
                right_rows.push(j);
            }
        }
    }

    // 3) assemble
    let left_names = left.column_names();
    let right_names = right.column_names();
    let clash = |name: &str, other: &[String]| name != key && other.iter().any(|o| o == name);

    let mut columns = vec![Column::new(
        key,
        left_rows.iter().map(|&i| left_key.values[i].clone()).collect(),
    )];
    for col in left.columns().iter().filter(|c| c.name != key) {
        let name = if clash(&col.name, &right_names) {
            format!("{}_x", col.name)
        } else {
            col.name.clone()
        };
        columns.push(Column::new(
            name,
            left_rows.iter().map(|&i| col.values[i].clone()).collect(),
        ));
    }
    for col in right.columns().iter().filter(|c| c.name != key) {
        let name = if clash(&col.name, &left_names) {
            format!("{}_y", col.name)
        } else {
            col.name.clone()
        };
        columns.push(Column::new(
            name,
            right_rows.iter().map(|&j| col.values[j].clone()).collect(),
        ));
    }
    Table::new(columns)
}
