use crate::config::RatioColumn;
use crate::error::PipelineError;
use crate::table::{Column, Table, Value};

/// Compute `ratio.output` row by row.
///
/// A denominator that is missing, zero or negative yields `0.0`. A missing
/// numerator with a usable denominator yields `Missing`.
/// Returns the column and how many rows fell back to zero.
pub fn ratio_column(table: &Table, ratio: &RatioColumn) -> Result<(Column, usize), PipelineError> {
    let num = table.column(&ratio.numerator)?;
    let den = table.column(&ratio.denominator)?;

    let mut zeroed = 0;
    let values = num
        .values
        .iter()
        .zip(&den.values)
        .map(|(n, d)| match d.as_f64() {
            Some(d) if d > 0.0 => match n.as_f64() {
                Some(n) => Value::Float(n / d * 100.0),
                None => Value::Missing,
            },
            _ => {
                zeroed += 1;
                Value::Float(0.0)
            }
        })
        .collect();

    Ok((Column::new(&ratio.output, values), zeroed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio() -> RatioColumn {
        RatioColumn {
            output: "tasa_positividad".into(),
            numerator: "casos_positivos".into(),
            denominator: "total_resultados".into(),
        }
    }

    #[test]
    fn test_zero_guard() {
        let t = Table::from_rows(
            &["casos_positivos", "total_resultados"],
            vec![
                vec![Value::Float(50.0), Value::Int(200)],
                vec![Value::Float(50.0), Value::Int(0)],
                vec![Value::Float(50.0), Value::Int(-4)],
                vec![Value::Float(50.0), Value::Missing],
            ],
        )
        .unwrap();
        let (col, zeroed) = ratio_column(&t, &ratio()).unwrap();
        assert_eq!(
            col.values,
            vec![
                Value::Float(25.0),
                Value::Float(0.0),
                Value::Float(0.0),
                Value::Float(0.0)
            ]
        );
        assert_eq!(zeroed, 3);
        assert!(col.values.iter().all(|v| v.as_f64().is_some_and(f64::is_finite)));
    }

    #[test]
    fn test_needs_both_inputs() {
        let t = Table::from_rows(&["casos_positivos"], vec![vec![Value::Int(1)]]).unwrap();
        match ratio_column(&t, &ratio()) {
            Err(PipelineError::MissingColumn { column }) => assert_eq!(column, "total_resultados"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
