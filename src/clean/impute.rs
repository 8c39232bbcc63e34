use crate::error::PipelineError;
use crate::table::{utils::median, Column, Table, Value};

/// Fill used when a column has no parsable value at all.
pub const ALL_MISSING_FALLBACK: f64 = 0.0;

/// What [`coerce_and_impute`] did to one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    pub column: String,
    /// Cells that were missing, or failed to parse, and got the fill value.
    pub imputed: usize,
    pub median: f64,
    /// `true` when the column was all missing and [`ALL_MISSING_FALLBACK`] was used.
    pub fallback: bool,
}

/// Coerce every cell of `column` to a float (parse failures become missing),
/// then fill each missing cell with the median of the values that remain.
pub fn coerce_and_impute(table: Table, column: &str) -> Result<(Table, Imputation), PipelineError> {
    let coerced: Vec<Value> = table
        .column(column)?
        .values
        .iter()
        .map(Value::coerce_numeric)
        .collect();

    let present: Vec<f64> = coerced.iter().filter_map(Value::as_f64).collect();
    let (fill, fallback) = match median(&present) {
        Some(m) => (m, false),
        None => (ALL_MISSING_FALLBACK, true),
    };

    let imputed = coerced.len() - present.len();
    let values = coerced
        .into_iter()
        .map(|v| if v.is_missing() { Value::Float(fill) } else { v })
        .collect();

    let table = table.replace_column(Column::new(column, values))?;
    Ok((
        table,
        Imputation {
            column: column.to_string(),
            imputed,
            median: fill,
            fallback,
        },
    ))
}
