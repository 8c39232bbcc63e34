// src/pipeline.rs

use crate::clean::Cleaner;
use crate::config::PipelineConfig;
use crate::enrich::Enricher;
use crate::export::{write_csv, write_report};
use crate::fetch::Retry;
use crate::ingest::{ingestion_audit, records_to_table, sample_recent, SAMPLE_ROWS};
use crate::inject::DefectInjector;
use crate::sources::{load_external, load_json_records, ExternalSource};
use crate::store::{ParquetStore, TableStore};
use crate::table::Table;
use anyhow::{Context, Result};
use chrono::Local;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Store table names.
pub mod tables {
    pub const RAW: &str = "covid_data";
    pub const DIRTY: &str = "covid_data_dirty";
    pub const CLEANED: &str = "covid_data_cleaned";
    pub const ENRICHED: &str = "covid_data_enriched";
}

/// Artifact file names under `csv/` and `audit/`.
pub mod artifacts {
    pub const INGESTION_SAMPLE: &str = "ingestion_sample.csv";
    pub const DIRTY_CSV: &str = "datos_sucios.csv";
    pub const CLEANED_CSV: &str = "datos_limpios.csv";
    pub const ENRICHED_CSV: &str = "datos_enriquecidos.csv";
    pub const INGESTION_AUDIT: &str = "ingestion.txt";
    pub const CLEANING_AUDIT: &str = "informe_limpieza.txt";
    pub const ENRICHMENT_REPORT: &str = "reporte_enriquecimiento.txt";
}

/// Runs the stages in order against one store and one output directory.
///
/// Every stage overwrites its outputs, so re-running a stage is safe.
pub struct Pipeline {
    config: PipelineConfig,
    client: Client,
    store: ParquetStore,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let store = ParquetStore::new(config.paths.store_dir())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            config,
            client,
            store,
        })
    }

    pub fn store(&self) -> &ParquetStore {
        &self.store
    }

    fn retry(&self) -> Retry {
        Retry {
            max_retries: self.config.sources.max_retries,
            delay: Duration::from_millis(self.config.sources.retry_delay_ms),
        }
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.config.paths.csv_dir().join(name)
    }

    fn audit_path(&self, name: &str) -> PathBuf {
        self.config.paths.audit_dir().join(name)
    }

    /// Fetch the COVID daily series, store it as `covid_data`, and export a
    /// recent-rows sample plus the ingestion audit.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn ingest(&self) -> Result<Table> {
        let source = ExternalSource::json_location(&self.config.sources.covid_url);
        let records = load_json_records(&self.client, &source, self.retry())
            .await
            .with_context(|| format!("fetching COVID data from `{}`", source.describe()))?;

        let table = records_to_table(&records)?;
        self.store.save_table(tables::RAW, &table)?;

        let now = Local::now().naive_local();
        let stored = self.store.load_table(tables::RAW)?.num_rows();
        write_csv(
            &self.csv_path(artifacts::INGESTION_SAMPLE),
            &sample_recent(&table, SAMPLE_ROWS, now)?,
        )?;
        write_report(
            &self.audit_path(artifacts::INGESTION_AUDIT),
            &ingestion_audit(&records, stored, now),
        )?;

        info!(records = records.len(), stored, "ingest complete");
        Ok(table)
    }

    /// Inject defects into `covid_data`, persist the dirty copy, clean it and
    /// persist the result with its audit.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn clean(&self) -> Result<Table> {
        let raw = self
            .store
            .load_table(tables::RAW)
            .context("loading raw table; run `ingest` first")?;

        // 1) inject
        let injector = DefectInjector::new(self.config.inject.clone());
        let seed = self.config.seed;
        let dirty = tokio::task::spawn_blocking(move || injector.inject(&raw, seed))
            .await
            .context("injection task panicked")??;
        write_csv(&self.csv_path(artifacts::DIRTY_CSV), &dirty)?;
        self.store.save_table(tables::DIRTY, &dirty)?;

        // 2) clean
        let cleaner = Cleaner::new(self.config.clean.clone());
        let cleaned = tokio::task::spawn_blocking(move || cleaner.clean(&dirty))
            .await
            .context("cleaning task panicked")??;
        self.store.save_table(tables::CLEANED, &cleaned.table)?;
        write_csv(&self.csv_path(artifacts::CLEANED_CSV), &cleaned.table)?;
        write_report(
            &self.audit_path(artifacts::CLEANING_AUDIT),
            cleaned.audit.lines(),
        )?;

        info!(rows = cleaned.table.num_rows(), "clean complete");
        Ok(cleaned.table)
    }

    /// Load the cleaned table and both external sources, enrich, and persist
    /// the result with its report.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn enrich(&self) -> Result<Table> {
        let base = self
            .store
            .load_table(tables::CLEANED)
            .context("loading cleaned table; run `clean` first")?;

        let sources = &self.config.sources;
        let crimes = ExternalSource::CsvFile(sources.crimes_csv.clone());
        let cattle = ExternalSource::json_location(&sources.bovinos_url);
        let a = load_external(&self.client, "external_a", &crimes, &sources.crimes_rename, self.retry()).await?;
        let b = load_external(&self.client, "external_b", &cattle, &sources.bovinos_rename, self.retry()).await?;

        let enricher = Enricher::new(self.config.enrich.clone());
        let join_key = self.config.enrich.join_key.clone();
        let enriched = tokio::task::spawn_blocking(move || enricher.enrich(&base, a, b, &join_key))
            .await
            .context("enrichment task panicked")??;

        self.store.save_table(tables::ENRICHED, &enriched.table)?;
        write_csv(&self.csv_path(artifacts::ENRICHED_CSV), &enriched.table)?;
        write_report(
            &self.audit_path(artifacts::ENRICHMENT_REPORT),
            &enriched.report,
        )?;

        info!(
            rows = enriched.table.num_rows(),
            columns = enriched.table.num_columns(),
            "enrich complete"
        );
        Ok(enriched.table)
    }

    /// All three stages, strictly in order.
    pub async fn run(&self) -> Result<Table> {
        self.ingest().await?;
        self.clean().await?;
        self.enrich().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnrichConfig, PathsConfig};
    use crate::error::PipelineError;
    use crate::testutil::init_test_logging;
    use serde_json::{json, Value as Json};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn covid_json(days: i64) -> Json {
        let rows: Vec<Json> = (0..days)
            .map(|i| {
                json!({
                    "date": 20210307 - i,
                    "hash": format!("h{}", i),
                    "positive": 28_000_000 - 1_000 * i,
                    "death": 500_000 - 10 * i,
                    "hospitalizedCurrently": 40_000 + i,
                    "totalTestResults": 360_000_000 - 10_000 * i,
                    "positiveIncrease": 40_000,
                    "deathIncrease": 800,
                    "lastModified": "2021-03-07T24:00:00Z",
                })
            })
            .collect();
        Json::Array(rows)
    }

    fn fixture(dir: &Path, days: i64, sample_size: usize) -> Result<PipelineConfig> {
        let covid = dir.join("daily.json");
        fs::write(&covid, covid_json(days).to_string())?;

        let crimes = dir.join("delitos.csv");
        let mut csv = String::from("MUNICIPIO_HECHO,DELITO,TOTAL_PROCESOS\n");
        for i in 0..sample_size {
            csv.push_str(&format!("M{},ARTÍCULO 269A,{}\n", i, i + 1));
        }
        fs::write(&crimes, csv)?;

        let cattle = dir.join("bovinos.json");
        let rows: Vec<Json> = (0..sample_size)
            .map(|i| json!({"MUNICIPIO": format!(" M{} ", i), "Total Pastos (ha)": format!("{}", i * 10)}))
            .collect();
        fs::write(&cattle, Json::Array(rows).to_string())?;

        let mut config = PipelineConfig {
            paths: PathsConfig {
                output_dir: dir.join("out"),
            },
            enrich: EnrichConfig {
                sample_size,
                ..EnrichConfig::default()
            },
            ..PipelineConfig::default()
        };
        config.sources.covid_url = covid.display().to_string();
        config.sources.crimes_csv = crimes;
        config.sources.bovinos_url = cattle.display().to_string();
        Ok(config)
    }

    #[tokio::test]
    async fn test_full_run_writes_every_artifact() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let config = fixture(dir.path(), 60, 20)?;
        let out = config.paths.output_dir.clone();
        let pipeline = Pipeline::new(config)?;

        let enriched = pipeline.run().await?;
        assert_eq!(enriched.num_rows(), 20);
        assert!(enriched.has_column("tasa_positividad"));
        assert!(enriched.has_column("municipio"));
        assert!(enriched.has_column("total_pastos"));

        for f in [
            "csv/ingestion_sample.csv",
            "csv/datos_sucios.csv",
            "csv/datos_limpios.csv",
            "csv/datos_enriquecidos.csv",
            "audit/ingestion.txt",
            "audit/informe_limpieza.txt",
            "audit/reporte_enriquecimiento.txt",
        ] {
            assert!(out.join(f).exists(), "missing {}", f);
        }
        assert_eq!(
            pipeline.store().list_tables()?,
            // sorted by name
            vec![
                tables::RAW,
                tables::CLEANED,
                tables::DIRTY,
                tables::ENRICHED
            ]
        );

        let audit = fs::read_to_string(out.join("audit/ingestion.txt"))?;
        assert!(audit.contains("Consistencia: OK"));
        assert!(audit.contains("Última fecha registrada: 20210307"));
        Ok(())
    }

    #[tokio::test]
    async fn test_stages_are_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let pipeline = Pipeline::new(fixture(dir.path(), 30, 10)?)?;
        pipeline.ingest().await?;
        let first = pipeline.clean().await?;
        let dirty = pipeline.store().load_table(tables::DIRTY)?;
        let second = pipeline.clean().await?;

        // same seed, same dirty table; only the timestamp columns may move
        assert_eq!(pipeline.store().load_table(tables::DIRTY)?, dirty);
        assert_eq!(first.num_rows(), second.num_rows());
        assert_eq!(
            first.column("casos_positivos")?.values,
            second.column("casos_positivos")?.values
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_enrich_reports_size_mismatch() -> Result<()> {
        let dir = tempdir()?;
        // 10 COVID days, but 12 joined external rows
        let mut config = fixture(dir.path(), 10, 12)?;
        config.enrich.sample_size = 12;
        let pipeline = Pipeline::new(config)?;
        pipeline.ingest().await?;
        pipeline.clean().await?;

        let err = pipeline.enrich().await.unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::SampleSizeMismatch { base, external }) => {
                assert_eq!((*base, *external), (10, 12));
            }
            other => panic!("unexpected: {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_needs_ingest_first() -> Result<()> {
        let dir = tempdir()?;
        let pipeline = Pipeline::new(fixture(dir.path(), 5, 5)?)?;
        let err = pipeline.clean().await.unwrap_err();
        assert!(format!("{:#}", err).contains("run `ingest` first"));
        Ok(())
    }
}
