use anyhow::{Context, Result};
use clap::Parser;
use covid_etl::store::convert::batches_to_table;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::metadata::RowGroupMetaData;
use std::{fs::File, path::PathBuf};

#[derive(Parser)]
#[command(about = "Print the schema and first rows of a stored table")]
struct Args {
    /// Path to a `<table>.parquet` file.
    file: PathBuf,
    /// How many rows to print.
    #[arg(short, long, default_value_t = 10)]
    rows: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Open the file and read its metadata.
    let file = File::open(&args.file).with_context(|| format!("opening `{}`", args.file.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading Parquet metadata of `{}`", args.file.display()))?;
    let meta = builder.metadata().clone();
    let schema = builder.schema().clone();
    let file_size_disk = std::fs::metadata(&args.file)?.len();

    println!("=== Table: {} ===", args.file.display());
    println!("Total rows:           {}", meta.file_metadata().num_rows());
    println!("Number of row groups: {}", meta.num_row_groups());
    println!("File-size on disk:    {} bytes", file_size_disk);
    println!();

    // 2) Columns with their Arrow types.
    println!("=== Columns ===");
    for field in schema.fields() {
        println!("- {:<30} | {}", field.name(), field.data_type());
    }
    println!();

    for (idx, rg) in meta.row_groups().iter().enumerate() {
        print_row_group(idx, rg);
    }

    // 3) First rows, decoded the same way the pipeline loads tables.
    let reader = builder.with_limit(args.rows).build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let table = batches_to_table(&schema, &batches)?;

    println!("=== First {} rows ===", table.num_rows());
    println!("{}", table.column_names().join(" | "));
    for i in 0..table.num_rows() {
        let cells: Vec<String> = table
            .row(i)
            .iter()
            .map(|v| if v.is_missing() { "<null>".to_string() } else { v.to_string() })
            .collect();
        println!("{}", cells.join(" | "));
    }
    Ok(())
}

/// Rows and per-column null counts of one row group.
fn print_row_group(idx: usize, rg: &RowGroupMetaData) {
    println!("--- Row Group {} ---", idx);
    println!("  Rows in this RG:        {}", rg.num_rows());
    println!("  Uncompressed size (RG): {} bytes", rg.total_byte_size());
    for col in rg.columns() {
        let nulls = col
            .statistics()
            .and_then(|s| s.null_count_opt())
            .map_or("?".to_string(), |n| n.to_string());
        println!(
            "  > {:<28} compressed {:>8} bytes, nulls {}",
            col.column_descr().name(),
            col.compressed_size(),
            nulls
        );
    }
    println!();
}
