//! Columnar datasets of `f64` observations keyed by vertex name.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use rand::Rng;

use causa_core::errors::{CausaResult, EstimationError};

/// Named columns of equal, non-zero length.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: BTreeMap<String, Vec<f64>>,
    n_rows: usize,
}

impl Dataset {
    pub fn from_columns(columns: BTreeMap<String, Vec<f64>>) -> Result<Self, EstimationError> {
        let n_rows = columns.values().next().map_or(0, Vec::len);
        if n_rows == 0 {
            return Err(EstimationError::EmptyData);
        }
        for (name, values) in &columns {
            if values.len() != n_rows {
                return Err(EstimationError::LengthMismatch {
                    name: name.clone(),
                    expected: n_rows,
                    found: values.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Parse a JSON array of records, e.g. `[{"T": 1, "Y": 0.3}, ...]`.
    /// Every record must carry the same fields.
    pub fn from_records(json: &str) -> CausaResult<Self> {
        let records: Vec<BTreeMap<String, f64>> = serde_json::from_str(json)?;
        let Some(first) = records.first() else {
            return Err(EstimationError::EmptyData.into());
        };
        let mut columns: BTreeMap<String, Vec<f64>> = first
            .keys()
            .map(|name| (name.clone(), Vec::with_capacity(records.len())))
            .collect();
        for record in &records {
            for (name, column) in columns.iter_mut() {
                let value = record
                    .get(name)
                    .ok_or_else(|| EstimationError::MissingColumn { name: name.clone() })?;
                column.push(*value);
            }
        }
        Ok(Self::from_columns(columns)?)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64], EstimationError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EstimationError::MissingColumn {
                name: name.to_string(),
            })
    }

    /// A copy with `name` added or replaced.
    pub fn with_column(&self, name: &str, values: Vec<f64>) -> Result<Self, EstimationError> {
        if values.len() != self.n_rows {
            return Err(EstimationError::LengthMismatch {
                name: name.to_string(),
                expected: self.n_rows,
                found: values.len(),
            });
        }
        let mut columns = self.columns.clone();
        columns.insert(name.to_string(), values);
        Ok(Self {
            columns,
            n_rows: self.n_rows,
        })
    }

    /// A copy with every value of an existing column set to `value`.
    pub fn assign(&self, name: &str, value: f64) -> Result<Self, EstimationError> {
        self.column(name)?;
        self.with_column(name, vec![value; self.n_rows])
    }

    /// Bootstrap resample: `n_rows` rows drawn with replacement.
    pub fn resample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let rows: Vec<usize> = (0..self.n_rows).map(|_| rng.gen_range(0..self.n_rows)).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), rows.iter().map(|&r| values[r]).collect()))
            .collect();
        Self {
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Distinct observed values of a column, ascending.
    pub fn domain(&self, name: &str) -> Result<Vec<f64>, EstimationError> {
        let mut values = self.column(name)?.to_vec();
        values.sort_by(f64::total_cmp);
        values.dedup();
        Ok(values)
    }

    pub fn is_binary(&self, name: &str) -> Result<bool, EstimationError> {
        Ok(self.column(name)?.iter().all(|&v| v == 0.0 || v == 1.0))
    }

    pub fn mean(&self, name: &str) -> Result<f64, EstimationError> {
        Ok(self.column(name)?.iter().sum::<f64>() / self.n_rows as f64)
    }

    /// Design matrix with a leading intercept column.
    pub fn design(&self, covariates: &[String]) -> Result<DMatrix<f64>, EstimationError> {
        let columns = covariates
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DMatrix::from_fn(self.n_rows, covariates.len() + 1, |i, j| {
            if j == 0 {
                1.0
            } else {
                columns[j - 1][i]
            }
        }))
    }
}

impl TryFrom<BTreeMap<String, Vec<f64>>> for Dataset {
    type Error = EstimationError;

    fn try_from(columns: BTreeMap<String, Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_columns(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Dataset {
        Dataset::from_columns(BTreeMap::from([
            ("A".to_string(), vec![1.0, 0.0, 1.0]),
            ("Y".to_string(), vec![2.5, -1.0, 2.5]),
        ]))
        .unwrap()
    }

    #[test]
    fn domain_is_sorted_and_distinct() {
        assert_eq!(small().domain("Y").unwrap(), vec![-1.0, 2.5]);
    }

    #[test]
    fn design_has_an_intercept() {
        let x = small().design(&["A".to_string()]).unwrap();
        assert_eq!(x.shape(), (3, 2));
        assert_eq!(x[(1, 0)], 1.0);
        assert_eq!(x[(1, 1)], 0.0);
    }
}
