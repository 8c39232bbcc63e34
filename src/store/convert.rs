// src/store/convert.rs

use crate::table::{Column, Table, Value};
use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::sync::Arc;

/// Pick the Arrow type for a column from the cells it actually holds.
///
/// - every present cell `Int`            → Int64
/// - every present cell `Int` or `Float` → Float64
/// - anything else                       → Utf8 (each cell rendered)
///
/// Missing cells never influence the choice and always become nulls.
pub fn arrow_type(col: &Column) -> DataType {
    let present = || col.values.iter().filter(|v| !v.is_missing());
    if present().all(|v| matches!(v, Value::Int(_))) {
        DataType::Int64
    } else if present().all(|v| matches!(v, Value::Int(_) | Value::Float(_))) {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

/// Build an ArrowSchema (inside an Arc) for a table.
pub fn build_arrow_schema(table: &Table) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = table
        .columns()
        .iter()
        .map(|c| ArrowField::new(&c.name, arrow_type(c), /* nullable = */ true))
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

fn to_array(col: &Column, dt: &DataType) -> ArrayRef {
    match dt {
        DataType::Int64 => Arc::new(
            col.values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect::<Int64Array>(),
        ),
        DataType::Float64 => Arc::new(col.values.iter().map(Value::as_f64).collect::<Float64Array>()),
        _ => Arc::new(
            col.values
                .iter()
                .map(|v| (!v.is_missing()).then(|| v.to_string()))
                .collect::<StringArray>(),
        ),
    }
}

/// Convert a table into a single RecordBatch.
pub fn table_to_batch(table: &Table) -> Result<RecordBatch> {
    let schema = build_arrow_schema(table);
    let arrays: Vec<ArrayRef> = table
        .columns()
        .iter()
        .zip(schema.fields())
        .map(|(c, f)| to_array(c, f.data_type()))
        .collect();
    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    RecordBatch::try_new_with_options(schema, arrays, &options)
        .context("building RecordBatch from table")
}

fn from_array(array: &ArrayRef) -> Result<Vec<Value>> {
    let len = array.len();
    let values = match array.data_type() {
        DataType::Int64 => {
            let a = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("Int64 column is not an Int64Array")?;
            (0..len)
                .map(|i| if a.is_null(i) { Value::Missing } else { Value::Int(a.value(i)) })
                .collect()
        }
        DataType::Float64 => {
            let a = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("Float64 column is not a Float64Array")?;
            (0..len)
                .map(|i| if a.is_null(i) { Value::Missing } else { Value::Float(a.value(i)) })
                .collect()
        }
        DataType::Utf8 => {
            let a = array
                .as_any()
                .downcast_ref::<StringArray>()
                .context("Utf8 column is not a StringArray")?;
            (0..len)
                .map(|i| {
                    if a.is_null(i) {
                        Value::Missing
                    } else {
                        Value::Str(a.value(i).to_string())
                    }
                })
                .collect()
        }
        // files written elsewhere: read any other type as text
        other => {
            let as_text = cast(array, &DataType::Utf8)
                .with_context(|| format!("casting {:?} column to Utf8", other))?;
            return from_array(&as_text);
        }
    };
    Ok(values)
}

/// Append the rows of each batch, in order, to one table.
pub fn batches_to_table(schema: &ArrowSchema, batches: &[RecordBatch]) -> Result<Table> {
    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|f| Column::new(f.name(), Vec::new()))
        .collect();
    for batch in batches {
        for (col, array) in columns.iter_mut().zip(batch.columns()) {
            col.values.extend(from_array(array)?);
        }
    }
    Ok(Table::new(columns)?)
}
