// src/clean/mod.rs

pub mod derive;
pub mod impute;

pub use impute::{coerce_and_impute, Imputation, ALL_MISSING_FALLBACK};

use crate::audit::AuditLog;
use crate::config::CleanConfig;
use crate::error::PipelineError;
use crate::table::{Column, Table, Value};
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

/// Output of [`Cleaner::clean`].
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: Table,
    pub audit: AuditLog,
}

/// Deterministic cleaning stage. Apart from the audit timestamp columns the
/// output depends only on the input table and the config.
pub struct Cleaner {
    config: CleanConfig,
}

impl Cleaner {
    pub fn new(config: CleanConfig) -> Self {
        Self { config }
    }

    /// Clean `dirty`, stamping the audit columns with the local wall clock.
    pub fn clean(&self, dirty: &Table) -> Result<Cleaned, PipelineError> {
        self.clean_at(dirty, Local::now().naive_local())
    }

    /// Clean `dirty`, stamping the audit columns with `now`.
    #[instrument(level = "info", skip_all, fields(rows = dirty.num_rows(), columns = dirty.num_columns()))]
    pub fn clean_at(&self, dirty: &Table, now: NaiveDateTime) -> Result<Cleaned, PipelineError> {
        let cfg = &self.config;
        let mut audit = AuditLog::new();

        audit.snapshot("Instantánea inicial", dirty);
        audit.push(format!("Registros iniciales: {}", dirty.num_rows()));

        // 1) exact duplicates
        let mut table = dirty.dedup();
        let removed = dirty.num_rows() - table.num_rows();
        audit.push(format!("Duplicados eliminados: {}", removed));
        debug!(removed, "first dedup pass");

        // 2) numeric coercion + median imputation
        for name in &cfg.numeric_columns {
            let (next, imp) = coerce_and_impute(table, name)?;
            table = next;
            if imp.fallback {
                warn!(column = %name, "no parsable values, imputing fallback");
                audit.push(format!(
                    "Columna '{}' sin valores numéricos; {} celdas rellenadas con {}",
                    name, imp.imputed, imp.median
                ));
            } else {
                audit.push(format!(
                    "Valores nulos en '{}' imputados con la mediana: {} ({} celdas)",
                    name, imp.median, imp.imputed
                ));
            }
        }

        // 3) sentinel fill, before the column is dropped below
        table = self.fill_sentinel(table, &mut audit)?;

        // 4) redundant and junk columns
        let (next, dropped) = table.drop_columns(&cfg.drop_columns);
        table = next;
        let absent: Vec<&str> = cfg
            .drop_columns
            .iter()
            .map(String::as_str)
            .filter(|c| !dropped.iter().any(|d| d == c))
            .collect();
        if dropped.is_empty() {
            audit.push("No se encontraron columnas duplicadas o innecesarias para eliminar.");
        } else {
            audit.push(format!(
                "Columnas eliminadas por ser duplicadas/innecesarias: {}",
                dropped.join(", ")
            ));
        }
        if !absent.is_empty() {
            audit.push(format!("Columnas no presentes, nada que eliminar: {}", absent.join(", ")));
        }

        // 5) processing-time audit columns
        table = stamp_audit_columns(table, now, &mut audit)?;

        // 6) canonical names
        let renamed: Vec<String> = cfg
            .rename
            .iter()
            .filter(|(from, _)| table.has_column(from))
            .map(|(from, to)| format!("{}→{}", from, to))
            .collect();
        table = table.rename(&cfg.rename)?;
        audit.push(format!("Columnas renombradas a nombres en español: {}", renamed.join(", ")));

        // 7) derived ratios
        for ratio in &cfg.ratios {
            let (col, zeroed) = derive::ratio_column(&table, ratio)?;
            table = table.with_column(col)?;
            audit.push(format!(
                "Columna '{}' calculada como ({}/{})*100; {} registros sin denominador positivo quedan en 0",
                ratio.output, ratio.numerator, ratio.denominator, zeroed
            ));
        }

        // 8) coercion and pruning can make distinct rows equal
        let before = table.num_rows();
        table = table.dedup();
        audit.push(format!(
            "Duplicados eliminados tras la transformación: {}",
            before - table.num_rows()
        ));

        // 9) final counts
        audit.push(format!("Registros finales: {}", table.num_rows()));
        audit.snapshot("Instantánea final", &table);

        info!(
            rows_in = dirty.num_rows(),
            rows_out = table.num_rows(),
            columns_out = table.num_columns(),
            "cleaned"
        );
        Ok(Cleaned { table, audit })
    }

    fn fill_sentinel(&self, table: Table, audit: &mut AuditLog) -> Result<Table, PipelineError> {
        let cfg = &self.config;
        let Ok(col) = table.column(&cfg.sentinel_column) else {
            audit.push(format!(
                "Columna '{}' no presente; nada que rellenar",
                cfg.sentinel_column
            ));
            return Ok(table);
        };
        let filled = col.null_count();
        let values = col
            .values
            .iter()
            .map(|v| match v {
                Value::Missing => Value::Str(cfg.sentinel_fill.clone()),
                other => other.clone(),
            })
            .collect();
        audit.push(format!(
            "Valores nulos en '{}' rellenados con '{}' ({} celdas)",
            cfg.sentinel_column, cfg.sentinel_fill, filled
        ));
        table.replace_column(Column::new(&cfg.sentinel_column, values))
    }
}

/// Names of the processing-time columns appended by the cleaner.
pub const AUDIT_COLUMNS: [&str; 4] = ["anio", "mes", "dia", "fecha_completa"];

fn stamp_audit_columns(
    table: Table,
    now: NaiveDateTime,
    audit: &mut AuditLog,
) -> Result<Table, PipelineError> {
    let n = table.num_rows();
    let year = now.format("%Y").to_string();
    let month = now.format("%m").to_string();
    let day = now.format("%d").to_string();
    let full = now.format("%Y-%m-%d %H:%M:%S").to_string();

    let stamps = [&year, &month, &day, &full];
    let mut table = table;
    for (name, value) in AUDIT_COLUMNS.iter().zip(stamps) {
        table = table.with_column(Column::filled(*name, Value::Str(value.clone()), n))?;
    }
    audit.push(format!(
        "Columnas 'anio', 'mes' y 'dia' establecidas a la fecha actual: {}-{}-{}",
        year, month, day
    ));
    audit.push(format!(
        "Columna 'fecha_completa' establecida a la fecha y hora actual: {}",
        full
    ));
    Ok(table)
}
