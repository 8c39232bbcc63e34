// src/table/mod.rs

pub mod utils;
pub mod value;

pub use value::Value;

use crate::error::PipelineError;
use std::collections::{BTreeMap, HashSet};

/// One named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// A column holding `value` in each of `len` rows.
    pub fn filled(name: impl Into<String>, value: Value, len: usize) -> Self {
        Self::new(name, vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

/// Row-aligned collection of named columns.
///
/// Every constructor checks that names are unique and lengths agree, so a
/// `Table` in hand always satisfies both. Transformations consume or borrow
/// the table and hand back a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::with_capacity(columns.len());
        let expected = columns.first().map(Column::len).unwrap_or(0);
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(PipelineError::DuplicateColumn {
                    column: col.name.clone(),
                });
            }
            if col.len() != expected {
                return Err(PipelineError::ColumnLength {
                    column: col.name.clone(),
                    expected,
                    found: col.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a table from row-major data. Short rows are padded with `Missing`.
    pub fn from_rows<S: AsRef<str>>(
        names: &[S],
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, PipelineError> {
        let mut columns: Vec<Column> = names
            .iter()
            .map(|n| Column::new(n.as_ref(), Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for col in columns.iter_mut() {
                col.values.push(cells.next().unwrap_or(Value::Missing));
            }
        }
        Self::new(columns)
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Typed lookup by name.
    pub fn column(&self, name: &str) -> Result<&Column, PipelineError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| PipelineError::missing_column(name))
    }

    /// Clone of row `i`, in column order.
    pub fn row(&self, i: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.values[i].clone()).collect()
    }

    /// New table with the given rows, in the given order.
    pub fn take(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(&c.name, indices.iter().map(|&i| c.values[i].clone()).collect()))
            .collect();
        Table { columns }
    }

    /// First `n` rows (fewer if the table is shorter).
    pub fn head(&self, n: usize) -> Table {
        let n = n.min(self.num_rows());
        let indices: Vec<usize> = (0..n).collect();
        self.take(&indices)
    }

    /// Append the rows of `other`, matched to these columns by name.
    pub fn concat_rows(self, other: &Table) -> Result<Table, PipelineError> {
        if let Some(stray) = other.columns.iter().find(|c| !self.has_column(&c.name)) {
            return Err(PipelineError::missing_column(&stray.name));
        }
        let mut columns = self.columns;
        for col in columns.iter_mut() {
            let extra = other.column(&col.name)?;
            col.values.extend(extra.values.iter().cloned());
        }
        Table::new(columns)
    }

    /// Place the columns of `other` to the right of these.
    pub fn concat_columns(self, other: Table) -> Result<Table, PipelineError> {
        let mut columns = self.columns;
        columns.extend(other.columns);
        Table::new(columns)
    }

    /// Add a column at the right edge.
    pub fn with_column(self, column: Column) -> Result<Table, PipelineError> {
        let mut columns = self.columns;
        columns.push(column);
        Table::new(columns)
    }

    /// Swap the values of an existing column, keeping its position.
    pub fn replace_column(self, column: Column) -> Result<Table, PipelineError> {
        let mut columns = self.columns;
        let slot = columns
            .iter_mut()
            .find(|c| c.name == column.name)
            .ok_or_else(|| PipelineError::missing_column(&column.name))?;
        *slot = column;
        Table::new(columns)
    }

    /// Remove every listed column that is present. Returns the new table and
    /// the names actually removed, in list order.
    pub fn drop_columns<S: AsRef<str>>(self, names: &[S]) -> (Table, Vec<String>) {
        let removed: Vec<String> = names
            .iter()
            .map(|n| n.as_ref().to_string())
            .filter(|n| self.has_column(n))
            .collect();
        let columns = self
            .columns
            .into_iter()
            .filter(|c| !removed.contains(&c.name))
            .collect();
        (Table { columns }, removed)
    }

    /// Rename columns through `mapping`; names not in the map pass through.
    pub fn rename(self, mapping: &BTreeMap<String, String>) -> Result<Table, PipelineError> {
        let columns = self
            .columns
            .into_iter()
            .map(|mut c| {
                if let Some(new_name) = mapping.get(&c.name) {
                    c.name = new_name.clone();
                }
                c
            })
            .collect();
        Table::new(columns)
    }

    /// Drop exact duplicate rows, keeping the first occurrence in order.
    pub fn dedup(&self) -> Table {
        let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(self.num_rows());
        let keep: Vec<usize> = (0..self.num_rows())
            .filter(|&i| seen.insert(self.row(i)))
            .collect();
        if keep.len() == self.num_rows() {
            return self.clone();
        }
        self.take(&keep)
    }

    /// `(column, missing cells)` for every column, in column order.
    pub fn null_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.null_count()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            &["id", "name"],
            vec![
                vec![Value::Int(1), "a".into()],
                vec![Value::Int(2), "b".into()],
                vec![Value::Int(1), "a".into()],
                vec![Value::Int(3), Value::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_names_and_ragged_columns() {
        let dup = Table::new(vec![
            Column::new("a", vec![Value::Int(1)]),
            Column::new("a", vec![Value::Int(2)]),
        ]);
        assert!(matches!(dup, Err(PipelineError::DuplicateColumn { .. })));

        let ragged = Table::new(vec![
            Column::new("a", vec![Value::Int(1)]),
            Column::new("b", vec![]),
        ]);
        assert!(matches!(
            ragged,
            Err(PipelineError::ColumnLength { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_column_lookup_names_missing_column() {
        let t = sample();
        match t.column("nope") {
            Err(PipelineError::MissingColumn { column }) => assert_eq!(column, "nope"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_dedup_keeps_first_and_is_idempotent() {
        let t = sample();
        let once = t.dedup();
        assert_eq!(once.num_rows(), 3);
        assert_eq!(once.column("id").unwrap().values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(once.dedup(), once);
    }

    #[test]
    fn test_drop_reports_only_present_columns() {
        let (t, removed) = sample().drop_columns(&["name", "ghost"]);
        assert_eq!(removed, vec!["name".to_string()]);
        assert_eq!(t.column_names(), vec!["id".to_string()]);
    }

    #[test]
    fn test_rename_passes_unmapped_through() {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), "key".to_string());
        let t = sample().rename(&map).unwrap();
        assert_eq!(t.column_names(), vec!["key".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_concat_rows_and_head() {
        let t = sample();
        let extra = t.take(&[1]);
        let both = t.concat_rows(&extra).unwrap();
        assert_eq!(both.num_rows(), 5);
        assert_eq!(both.row(4), vec![Value::Int(2), "b".into()]);
        assert_eq!(both.head(2).num_rows(), 2);
        assert_eq!(both.head(100).num_rows(), 5);
    }

    #[test]
    fn test_null_counts() {
        assert_eq!(
            sample().null_counts(),
            vec![("id".to_string(), 0), ("name".to_string(), 1)]
        );
    }
}
