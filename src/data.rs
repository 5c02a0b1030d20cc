//! Dataset loading and column extraction
//!
//! The monitoring jobs consume CSV snapshots. Both datasets of a comparison
//! are loaded through the same reader so column names and dtypes stay stable
//! within a run.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::{DriftwatchError, Result};

/// CSV dataset loader
pub struct DatasetLoader {
    infer_schema_length: Option<usize>,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
        }
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            DriftwatchError::Data(format!("cannot open {}: {}", path.display(), e))
        })?;

        let reader = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file);

        reader
            .finish()
            .map_err(|e| DriftwatchError::Data(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Extract a column as `f64` values, nulls removed.
///
/// Fails with `TypeMismatch` when the column's dtype is not numeric; values
/// are never coerced from strings.
pub fn numeric_values(series: &Series, column: &str) -> Result<Vec<f64>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(DriftwatchError::TypeMismatch {
            column: column.to_string(),
            expected: "numeric".to_string(),
            actual: series.dtype().to_string(),
        });
    }
    let ca = series
        .cast(&DataType::Float64)
        .map_err(|e| DriftwatchError::Data(e.to_string()))?;
    let ca = ca.f64().map_err(|e| DriftwatchError::Data(e.to_string()))?;
    Ok(ca.into_iter().flatten().filter(|v| !v.is_nan()).collect())
}

/// Extract a column as string category labels, nulls removed.
pub fn string_values(series: &Series) -> Result<Vec<String>> {
    let ca = series
        .cast(&DataType::String)
        .map_err(|e| DriftwatchError::Data(e.to_string()))?;
    let ca = ca.str().map_err(|e| DriftwatchError::Data(e.to_string()))?;
    Ok(ca.into_iter().flatten().map(|s| s.to_string()).collect())
}

/// Extract a column as optional `f64` values, preserving row alignment.
/// Used where null positions matter (joined evaluation tables).
pub fn numeric_values_nullable(series: &Series, column: &str) -> Result<Vec<Option<f64>>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(DriftwatchError::TypeMismatch {
            column: column.to_string(),
            expected: "numeric".to_string(),
            actual: series.dtype().to_string(),
        });
    }
    let ca = series
        .cast(&DataType::Float64)
        .map_err(|e| DriftwatchError::Data(e.to_string()))?;
    let ca = ca.f64().map_err(|e| DriftwatchError::Data(e.to_string()))?;
    Ok(ca.into_iter().collect())
}

pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}
