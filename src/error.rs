// src/error.rs

use thiserror::Error;

/// Structural failures raised by the transformation stages.
///
/// Cell-level parse failures never show up here: they are recovered as
/// [`crate::table::Value::Missing`] by the numeric coercion helpers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A column the stage depends on is absent from its input table.
    #[error("missing column `{column}`")]
    MissingColumn { column: String },

    /// The join key is absent from one side of a join.
    #[error("join key `{column}` missing from {side}")]
    JoinKeyMissing { side: String, column: String },

    /// Positional concatenation was attempted on samples of unequal length.
    #[error("sample size mismatch: base has {base} rows, external has {external} rows")]
    SampleSizeMismatch { base: usize, external: usize },

    /// An external table loader failed; the core never retries.
    #[error("external source `{source_id}` failed")]
    ExternalSource {
        source_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Two columns with the same name in one table.
    #[error("duplicate column `{column}`")]
    DuplicateColumn { column: String },

    /// A column whose length disagrees with the rest of the table.
    #[error("column `{column}` has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
}

impl PipelineError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        PipelineError::MissingColumn {
            column: column.into(),
        }
    }

    /// Wrap a loader failure, keeping the underlying error as the source.
    pub fn external(source_id: impl Into<String>, err: anyhow::Error) -> Self {
        PipelineError::ExternalSource {
            source_id: source_id.into(),
            source: err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_offender() {
        let err = PipelineError::missing_column("positive");
        assert_eq!(err.to_string(), "missing column `positive`");

        let err = PipelineError::JoinKeyMissing {
            side: "external_b".into(),
            column: "municipio".into(),
        };
        assert_eq!(err.to_string(), "join key `municipio` missing from external_b");

        let err = PipelineError::SampleSizeMismatch {
            base: 10,
            external: 9,
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn test_external_keeps_source() {
        let err = PipelineError::external("bovinos_api", anyhow::anyhow!("HTTP error: 503"));
        assert_eq!(err.to_string(), "external source `bovinos_api` failed");
        let source = err.source().expect("source should be kept");
        assert!(source.to_string().contains("503"));
    }
}
