// src/inject/mod.rs

pub mod sampler;

pub use sampler::Sampler;

use crate::config::InjectConfig;
use crate::error::PipelineError;
use crate::table::{Column, Table, Value};
use tracing::{debug, info, instrument};

/// Produces a synthetically corrupted copy of a clean table.
///
/// Output is a pure function of the input table, the config and the seed.
pub struct DefectInjector {
    config: InjectConfig,
}

impl DefectInjector {
    pub fn new(config: InjectConfig) -> Self {
        Self { config }
    }

    /// Apply, in order: row duplication, null injection, the sentinel column,
    /// type corruption, then redundant columns.
    #[instrument(level = "info", skip_all, fields(rows = table.num_rows(), seed = seed))]
    pub fn inject(&self, table: &Table, seed: u64) -> Result<Table, PipelineError> {
        let cfg = &self.config;
        let sampler = Sampler::new(seed);

        // 1) duplicate rows: originals first, then the sampled rows in sampled order
        let dup_rows = sampler.sample(table.num_rows(), cfg.duplicate_fraction);
        let mut dirty = table.clone().concat_rows(&table.take(&dup_rows))?;
        let n = dirty.num_rows();
        debug!(duplicated = dup_rows.len(), rows = n, "duplicated rows");

        // 2) null cells in numeric columns
        for name in &cfg.null_columns {
            let rows = sampler.sample(n, cfg.null_fraction);
            dirty = map_cells(dirty, name, &rows, |_| Value::Missing)?;
            debug!(column = %name, nulled = rows.len(), "injected nulls");
        }

        // 3) mostly-absent sentinel column
        let mut sentinel = vec![Value::Missing; n];
        for i in sampler.sample(n, cfg.sentinel_fraction) {
            sentinel[i] = Value::Str(cfg.sentinel_marker.clone());
        }
        dirty = dirty.with_column(Column::new(&cfg.sentinel_column, sentinel))?;

        // 4) numbers replaced by their string form
        for name in &cfg.type_columns {
            let rows = sampler.sample(n, cfg.type_fraction);
            dirty = map_cells(dirty, name, &rows, |v| match v {
                Value::Int(_) | Value::Float(_) => v.coerce_string(),
                other => other.clone(),
            })?;
            debug!(column = %name, corrupted = rows.len(), "corrupted types");
        }

        // 5) redundant copies and constant filler
        for copy in &cfg.copied_columns {
            let values = dirty.column(&copy.source)?.values.clone();
            dirty = dirty.with_column(Column::new(&copy.target, values))?;
        }
        for filler in &cfg.filler_columns {
            dirty = dirty.with_column(Column::filled(
                &filler.name,
                Value::Str(filler.value.clone()),
                n,
            ))?;
        }

        info!(
            rows_in = table.num_rows(),
            rows_out = dirty.num_rows(),
            columns_out = dirty.num_columns(),
            "injected defects"
        );
        Ok(dirty)
    }
}

/// Rewrite the cells of `column` at `rows` through `f`.
fn map_cells(
    table: Table,
    column: &str,
    rows: &[usize],
    f: impl Fn(&Value) -> Value,
) -> Result<Table, PipelineError> {
    let mut col = table.column(column)?.clone();
    for &i in rows {
        col.values[i] = f(&col.values[i]);
    }
    table.replace_column(col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectConfig;
    use crate::testutil::{covid_table, init_test_logging};

    #[test]
    fn test_inject_is_deterministic() -> Result<(), PipelineError> {
        init_test_logging();
        let table = covid_table(120);
        let injector = DefectInjector::new(InjectConfig::default());
        let a = injector.inject(&table, 42)?;
        let b = injector.inject(&table, 42)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_row_count_adds_floor_of_duplicate_fraction() -> Result<(), PipelineError> {
        let injector = DefectInjector::new(InjectConfig::default());
        for rows in [0, 1, 7, 50, 133] {
            let dirty = injector.inject(&covid_table(rows), 9)?;
            assert_eq!(dirty.num_rows(), rows + (rows as f64 * 0.2).floor() as usize);
        }
        Ok(())
    }

    #[test]
    fn test_originals_come_first() -> Result<(), PipelineError> {
        let table = covid_table(40);
        let dirty = DefectInjector::new(InjectConfig::default()).inject(&table, 1)?;
        let hashes = &dirty.column("hash")?.values;
        assert_eq!(&hashes[..40], &table.column("hash")?.values[..]);
        // appended rows are copies of originals
        for h in &hashes[40..] {
            assert!(table.column("hash")?.values.contains(h));
        }
        Ok(())
    }

    #[test]
    fn test_defect_shapes() -> Result<(), PipelineError> {
        let table = covid_table(100);
        let cfg = InjectConfig::default();
        let dirty = DefectInjector::new(cfg).inject(&table, 42)?;
        let n = dirty.num_rows();
        assert_eq!(n, 120);

        let sentinel = dirty.column("registro_nulo")?;
        let tagged = sentinel
            .values
            .iter()
            .filter(|v| v.as_str() == Some("Dato Faltante"))
            .count();
        assert_eq!(tagged, 24);
        assert_eq!(sentinel.null_count(), n - 24);

        // nulls land on the same sampled rows in every numeric column
        assert_eq!(dirty.column("death")?.null_count(), 6);
        assert_eq!(dirty.column("hospitalizedCurrently")?.null_count(), 6);

        let strings = dirty
            .column("positive")?
            .values
            .iter()
            .filter(|v| matches!(v, Value::Str(_)))
            .count();
        assert!(strings <= 8);

        assert_eq!(dirty.column("fecha_duplicada")?.values, dirty.column("date")?.values);
        assert_eq!(
            dirty.column("positive_duplicada")?.values,
            dirty.column("positive")?.values
        );
        assert!(dirty
            .column("columna_inutil")?
            .values
            .iter()
            .all(|v| v.as_str() == Some("valor_repetido_en_todos")));
        Ok(())
    }

    #[test]
    fn test_type_corruption_keeps_the_number() -> Result<(), PipelineError> {
        let table = covid_table(100);
        let cfg = InjectConfig {
            null_columns: vec![],
            ..InjectConfig::default()
        };
        let dirty = DefectInjector::new(cfg).inject(&table, 3)?;
        let corrupted: Vec<&Value> = dirty
            .column("positive")?
            .values
            .iter()
            .filter(|v| matches!(v, Value::Str(_)))
            .collect();
        assert_eq!(corrupted.len(), 8);
        for v in corrupted {
            assert!(v.coerce_numeric().as_f64().is_some());
        }
        Ok(())
    }

    #[test]
    fn test_missing_source_column_is_named() {
        let table = covid_table(10).drop_columns(&["death"]).0;
        let err = DefectInjector::new(InjectConfig::default())
            .inject(&table, 42)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column } if column == "death"));
    }
}
