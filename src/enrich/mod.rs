// src/enrich/mod.rs

pub mod join;

pub use join::{inner_join, normalize_key};

use crate::clean::impute::coerce_and_impute;
use crate::config::EnrichConfig;
use crate::error::PipelineError;
use crate::table::Table;
use chrono::{Local, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Output of [`Enricher::enrich`]: the final table and the report lines.
#[derive(Debug, Clone)]
pub struct Enriched {
    pub table: Table,
    pub report: Vec<String>,
}

pub struct Enricher {
    config: EnrichConfig,
}

impl Enricher {
    pub fn new(config: EnrichConfig) -> Self {
        Self { config }
    }

    pub fn enrich(
        &self,
        base: &Table,
        external_a: Table,
        external_b: Table,
        join_key: &str,
    ) -> Result<Enriched, PipelineError> {
        self.enrich_at(base, external_a, external_b, join_key, Local::now().naive_local())
    }

    /// Join the two externals on `join_key`, then glue a head sample of the
    /// join to a head sample of `base` side by side.
    ///
    /// The base table has no geographic key, so rows are paired by position
    /// only. The report says so.
    #[instrument(level = "info", skip_all, fields(base_rows = base.num_rows(), join_key = %join_key))]
    pub fn enrich_at(
        &self,
        base: &Table,
        external_a: Table,
        external_b: Table,
        join_key: &str,
        now: NaiveDateTime,
    ) -> Result<Enriched, PipelineError> {
        let cfg = &self.config;
        let mut notes = Vec::new();

        // 1) comparable keys on both sides
        let a = normalize_key(external_a, join_key, "external_a")?;
        let mut b = normalize_key(external_b, join_key, "external_b")?;

        // 2) numeric pasture columns of B
        let mut imputed = Vec::new();
        for name in &cfg.numeric_columns {
            if !b.has_column(name) {
                warn!(column = %name, "numeric column absent from external_b, skipping");
                notes.push(format!(
                    "Columna '{}' no presente en external_b; no se imputó.",
                    name
                ));
                continue;
            }
            let (next, imp) = coerce_and_impute(b, name)?;
            b = next;
            debug!(column = %name, median = imp.median, imputed = imp.imputed, "imputed");
            imputed.push(format!("'{}'", name));
        }
        if !imputed.is_empty() {
            notes.push(format!(
                "Las columnas {} fueron convertidas a numérico y sus valores nulos imputados con la mediana.",
                imputed.join(", ")
            ));
        }

        // 3) A ⋈ B
        let joined = inner_join(&a, &b, join_key)?;
        info!(a = a.num_rows(), b = b.num_rows(), joined = joined.num_rows(), "joined externals");

        // 4) independent head samples
        let base_sample = base.head(cfg.sample_size);
        let ext_sample = joined.head(cfg.sample_size);

        // 5) positional concatenation
        if base_sample.num_rows() != ext_sample.num_rows() {
            return Err(PipelineError::SampleSizeMismatch {
                base: base_sample.num_rows(),
                external: ext_sample.num_rows(),
            });
        }
        let (ext_sample, renamed) = suffix_clashes(&base_sample, ext_sample)?;
        if !renamed.is_empty() {
            let pairs: Vec<String> = renamed.iter().map(|(from, to)| format!("{}→{}", from, to)).collect();
            warn!(renamed = %pairs.join(", "), "external columns clash with base columns");
            notes.push(format!(
                "Columnas externas renombradas por coincidir con el dataset base: {}",
                pairs.join(", ")
            ));
        }
        let table = base_sample.concat_columns(ext_sample)?;

        let joined_title = format!("Fuentes Externas Integradas (Merge por '{}')", join_key);
        let report = report_lines(
            now,
            &[
                ("Dataset Base (COVID limpio)", base),
                ("Delitos Informáticos (CSV)", &a),
                ("Inventario Anual de Bovinos (API)", &b),
                (joined_title.as_str(), &joined),
                ("Dataset Final Enriquecido", &table),
            ],
            join_key,
            cfg.sample_size,
            notes,
        );

        info!(rows = table.num_rows(), columns = table.num_columns(), "enriched");
        Ok(Enriched { table, report })
    }
}

/// Give every column of `ext` whose name `base` already uses an `_ext`
/// suffix, repeated until the name is free. Returns the renamed table and the
/// `(old, new)` pairs in column order.
fn suffix_clashes(base: &Table, ext: Table) -> Result<(Table, Vec<(String, String)>), PipelineError> {
    let mut taken: HashSet<String> = base.column_names().into_iter().collect();
    taken.extend(ext.column_names());

    let mut mapping = BTreeMap::new();
    let mut renamed = Vec::new();
    for name in ext.column_names() {
        if !base.has_column(&name) {
            continue;
        }
        let mut candidate = format!("{}_ext", name);
        while taken.contains(&candidate) {
            candidate.push_str("_ext");
        }
        taken.insert(candidate.clone());
        mapping.insert(name.clone(), candidate.clone());
        renamed.push((name, candidate));
    }
    Ok((ext.rename(&mapping)?, renamed))
}

fn report_lines(
    now: NaiveDateTime,
    sections: &[(&str, &Table)],
    join_key: &str,
    sample_size: usize,
    notes: Vec<String>,
) -> Vec<String> {
    let mut out = vec![
        "===== INFORME DE ENRIQUECIMIENTO DE DATOS =====".to_string(),
        format!("Fecha/Hora de Enriquecimiento: {}", now.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
    ];
    for (title, table) in sections {
        out.push(format!("=== {} ===", title));
        out.push(format!("  - Registros: {}", table.num_rows()));
        out.push(format!("  - Columnas: [{}]", table.column_names().join(", ")));
        out.push(String::new());
    }
    out.push("Observaciones:".to_string());
    out.push(format!(
        "  - Las fuentes externas se integraron con un inner join sobre '{}'; las claves repetidas en ambos lados producen todas las combinaciones.",
        join_key
    ));
    out.push(format!(
        "  - El dataset base no posee clave geográfica. Las primeras {} filas del dataset base y de las fuentes integradas se concatenaron horizontalmente por posición de fila; las filas emparejadas no son registros relacionados.",
        sample_size
    ));
    out.extend(notes.into_iter().map(|n| format!("  - {}", n)));
    out
}
