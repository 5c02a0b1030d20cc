//! Column role classification
//!
//! Every feature column is either categorical or continuous. The role is
//! decided once, from the reference table's declared dtypes, and reused for
//! the new table so both sides of a comparison agree on how each feature is
//! tested.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::is_numeric_dtype;

/// Role of a feature column in drift testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Non-numeric storage type; tested with a contingency test
    Categorical,
    /// Numeric storage type; tested with a distribution-equality test
    Continuous,
}

/// Column name to role mapping for one table schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnRoles {
    roles: BTreeMap<String, ColumnRole>,
}

impl ColumnRoles {
    /// Classify every column of a table by its declared dtype.
    ///
    /// Non-numeric dtypes (string, categorical, boolean) are categorical;
    /// numeric dtypes are continuous. Pure: an empty table yields empty sets.
    pub fn classify(df: &DataFrame) -> Self {
        let mut roles = BTreeMap::new();
        for column in df.get_columns() {
            let role = if is_numeric_dtype(column.dtype()) {
                ColumnRole::Continuous
            } else {
                ColumnRole::Categorical
            };
            roles.insert(column.name().to_string(), role);
        }
        Self { roles }
    }

    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        self.roles.get(column).copied()
    }

    /// Names of categorical columns, sorted
    pub fn categorical(&self) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, r)| **r == ColumnRole::Categorical)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Names of continuous columns, sorted
    pub fn continuous(&self) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, r)| **r == ColumnRole::Continuous)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_df() -> DataFrame {
        df!(
            "age" => &[23i64, 54, 41],
            "bmi" => &[21.5, 28.0, 24.2],
            "sex" => &["F", "M", "F"],
            "smoker" => &[true, false, false]
        )
        .unwrap()
    }

    #[test]
    fn test_classify_mixed_table() {
        let roles = ColumnRoles::classify(&mixed_df());

        assert_eq!(roles.role_of("age"), Some(ColumnRole::Continuous));
        assert_eq!(roles.role_of("bmi"), Some(ColumnRole::Continuous));
        assert_eq!(roles.role_of("sex"), Some(ColumnRole::Categorical));
        assert_eq!(roles.role_of("smoker"), Some(ColumnRole::Categorical));
        assert_eq!(roles.categorical(), vec!["sex", "smoker"]);
        assert_eq!(roles.continuous(), vec!["age", "bmi"]);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let df = mixed_df();
        let first = ColumnRoles::classify(&df);
        let second = ColumnRoles::classify(&df);

        assert_eq!(first.categorical(), second.categorical());
        assert_eq!(first.continuous(), second.continuous());
    }

    #[test]
    fn test_classify_empty_table() {
        let df = DataFrame::empty();
        let roles = ColumnRoles::classify(&df);

        assert!(roles.is_empty());
        assert!(roles.categorical().is_empty());
        assert!(roles.continuous().is_empty());
    }

    #[test]
    fn test_unknown_column_has_no_role() {
        let roles = ColumnRoles::classify(&mixed_df());
        assert_eq!(roles.role_of("missing"), None);
    }
}
