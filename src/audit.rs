// src/audit.rs

use crate::table::Table;

/// Ordered, append-only list of human-readable audit lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLog {
    lines: Vec<String>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Row/column counts and per-column missing counts of `table`.
    pub fn snapshot(&mut self, label: &str, table: &Table) {
        self.push(format!(
            "{}: {} registros, {} columnas",
            label,
            table.num_rows(),
            table.num_columns()
        ));
        for (name, nulls) in table.null_counts() {
            self.push(format!("  - nulos en '{}': {}", name, nulls));
        }
    }
}
