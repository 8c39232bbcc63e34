// src/store/mod.rs

pub mod convert;

use crate::table::Table;
use anyhow::{Context, Result};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
};
use tracing::{debug, info};

/// Named-table persistence used between stages.
pub trait TableStore {
    /// Read the whole table `name`.
    fn load_table(&self, name: &str) -> Result<Table>;

    /// Replace `name` with `table`. Never appends.
    fn save_table(&self, name: &str, table: &Table) -> Result<()>;
}

/// One Parquet file per table: `<dir>/<name>.parquet`.
#[derive(Debug, Clone)]
pub struct ParquetStore {
    dir: PathBuf,
}

impl ParquetStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("could not create `{}`", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.parquet", name))
    }

    /// Names of every table currently in the store, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let pattern = format!("{}/*.parquet", self.dir.display());
        let mut names = Vec::new();
        for entry in glob(&pattern)? {
            let path = entry?;
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl TableStore for ParquetStore {
    #[tracing::instrument(level = "debug", skip(self), fields(dir = %self.dir.display()))]
    fn load_table(&self, name: &str) -> Result<Table> {
        let path = self.path_for(name);
        let file = File::open(&path)
            .with_context(|| format!("failed to open table `{}` at `{}`", name, path.display()))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("reading Parquet metadata of `{}`", path.display()))?;
        let schema = builder.schema().clone();
        let reader = builder.with_batch_size(8192).build()?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch.with_context(|| format!("reading batch of `{}`", path.display()))?);
        }
        let table = convert::batches_to_table(&schema, &batches)?;
        debug!(table = %name, rows = table.num_rows(), "loaded");
        Ok(table)
    }

    #[tracing::instrument(level = "info", skip(self, table), fields(rows = table.num_rows()))]
    fn save_table(&self, name: &str, table: &Table) -> Result<()> {
        // 1) Encode
        let batch = convert::table_to_batch(table)?;

        // 2) Write to "<name>.parquet.tmp"
        let final_path = self.path_for(name);
        let tmp_path = self.dir.join(format!("{}.parquet.tmp", name));
        let tmp_file = File::create(&tmp_path)
            .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(BufWriter::new(tmp_file), batch.schema(), Some(props))
            .context("creating ArrowWriter")?;
        writer.write(&batch).context("writing batch")?;
        writer.close().context("closing ArrowWriter")?;

        // 3) Swap into place
        fs::rename(&tmp_path, &final_path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp_path.display(),
                final_path.display()
            )
        })?;

        info!(table = %name, path = %final_path.display(), "saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Value};
    use crate::testutil::{covid_table, init_test_logging};
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let store = ParquetStore::new(dir.path().join("store"))?;

        let table = covid_table(25).with_column(Column::new(
            "tasa",
            (0..25).map(|i| if i % 5 == 0 { Value::Missing } else { Value::Float(i as f64 / 4.0) }).collect(),
        ))?;
        store.save_table("covid_data", &table)?;
        assert_eq!(store.load_table("covid_data")?, table);
        assert!(!dir.path().join("store/covid_data.parquet.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_save_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let store = ParquetStore::new(dir.path())?;
        store.save_table("t", &covid_table(10))?;
        store.save_table("t", &covid_table(3))?;
        assert_eq!(store.load_table("t")?.num_rows(), 3);
        assert_eq!(store.list_tables()?, vec!["t".to_string()]);
        Ok(())
    }

    #[test]
    fn test_unknown_table_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let store = ParquetStore::new(dir.path())?;
        let err = store.load_table("nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
        Ok(())
    }
}
