// src/sources.rs

use crate::error::PipelineError;
use crate::fetch::{fetch_records, json_records, Retry};
use crate::table::{Column, Table, Value};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where an external table comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalSource {
    /// CSV file with a header row.
    CsvFile(PathBuf),
    /// HTTP endpoint returning a JSON array of objects.
    JsonUrl(String),
    /// Local file holding a JSON array of objects.
    JsonFile(PathBuf),
}

impl ExternalSource {
    /// `http(s)://` locations are fetched; anything else is a local JSON file.
    pub fn json_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            ExternalSource::JsonUrl(location.to_string())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            ExternalSource::JsonFile(PathBuf::from(path))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ExternalSource::CsvFile(p) | ExternalSource::JsonFile(p) => p.display().to_string(),
            ExternalSource::JsonUrl(u) => u.clone(),
        }
    }
}

/// Records of a JSON source. CSV sources have no record form.
pub async fn load_json_records(
    client: &Client,
    source: &ExternalSource,
    retry: Retry,
) -> Result<Vec<Map<String, Json>>> {
    match source {
        ExternalSource::JsonUrl(url) => fetch_records(client, url, retry).await,
        ExternalSource::JsonFile(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading `{}`", path.display()))?;
            let body = serde_json::from_str(&text)
                .with_context(|| format!("parsing JSON in `{}`", path.display()))?;
            json_records(body)
        }
        ExternalSource::CsvFile(path) => {
            anyhow::bail!("`{}` is a CSV source, not JSON records", path.display())
        }
    }
}

/// Load `source` and rename its columns through `rename`.
///
/// Any failure, including a rename that would collide with an existing
/// column, comes back as [`PipelineError::ExternalSource`] tagged with
/// `source_id`.
pub async fn load_external(
    client: &Client,
    source_id: &str,
    source: &ExternalSource,
    rename: &BTreeMap<String, String>,
    retry: Retry,
) -> Result<Table, PipelineError> {
    let loaded = match source {
        ExternalSource::CsvFile(path) => read_csv_table(path),
        json => load_json_records(client, json, retry)
            .await
            .and_then(|records| Ok(json_records_to_table(&records)?)),
    };
    let table = loaded
        .and_then(|t| Ok(t.rename(rename)?))
        .map_err(|e| PipelineError::external(source_id, e))?;
    info!(
        source = %source_id,
        from = %source.describe(),
        rows = table.num_rows(),
        columns = table.num_columns(),
        "loaded external table"
    );
    Ok(table)
}

/// Read a headed CSV, typing every cell with [`Value::infer`].
pub fn read_csv_table(path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV `{}`", path.display()))?;
    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of `{}`", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("reading record {} of `{}`", i + 1, path.display()))?;
        rows.push(record.iter().map(Value::infer).collect());
    }
    Ok(Table::from_rows(&headers, rows)?)
}

/// One JSON cell as a table value. Integers stay integers; nested values
/// are kept as their JSON text.
pub fn json_to_value(v: &Json) -> Value {
    match v {
        Json::Null => Value::Missing,
        Json::Bool(b) => Value::Str(b.to_string()),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Missing),
        },
        Json::String(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

/// Columns are the union of the records' keys in first-seen order; a key a
/// record lacks is missing in that row.
pub fn json_records_to_table(records: &[Map<String, Json>]) -> Result<Table, PipelineError> {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
    }
    let columns = names
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
