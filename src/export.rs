// src/export.rs

use crate::table::Table;
use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write to `<path>.tmp` through `fill`, then rename over `path`.
fn write_atomic(path: &Path, fill: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create `{}`", parent.display()))?;
    }
    let tmp = tmp_path(path);
    let file = File::create(&tmp)
        .with_context(|| format!("could not create temporary file `{}`", tmp.display()))?;
    let mut out = BufWriter::new(file);
    fill(&mut out)?;
    out.flush()
        .with_context(|| format!("flushing `{}`", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename `{}` to `{}`", tmp.display(), path.display()))?;
    Ok(())
}

/// Header row, then one record per row. Missing cells are empty fields.
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    write_atomic(path, |out| {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(table.column_names())?;
        for i in 0..table.num_rows() {
            wtr.write_record(table.row(i).iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    })?;
    info!(path = %path.display(), rows = table.num_rows(), "exported csv");
    Ok(())
}

/// One line per entry, newline separated.
pub fn write_report(path: &Path, lines: &[String]) -> Result<()> {
    write_atomic(path, |out| {
        out.write_all(lines.join("\n").as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    })?;
    info!(path = %path.display(), lines = lines.len(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use tempfile::tempdir;

    #[test]
    fn test_csv_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("csv/datos.csv");
        let table = Table::from_rows(
            &["fecha", "casos"],
            vec![
                vec![Value::Int(20210307), Value::Float(1.5)],
                vec![Value::from("a,b"), Value::Missing],
            ],
        )?;
        write_csv(&path, &table)?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "fecha,casos\n20210307,1.5\n\"a,b\",\n"
        );
        Ok(())
    }

    #[test]
    fn test_report_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("audit/informe.txt");
        write_report(&path, &["first".into(), "second".into()])?;
        write_report(&path, &["only".into()])?;
        assert_eq!(fs::read_to_string(&path)?, "only\n");
        assert!(!dir.path().join("audit/informe.txt.tmp").exists());
        Ok(())
    }
}
