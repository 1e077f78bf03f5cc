use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::models::{EncodedGroupColumn, GroupSpec, GroupValue};

/// Number of decimals kept for derived values when none is configured.
pub const DEFAULT_FLOAT_PRECISION: u32 = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("{columns} output columns but {values} values")]
    LengthMismatch { columns: usize, values: usize },
}

/// A column name that could not be parsed. Decoding goes on with a degenerate
/// record for that column.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeWarning {
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not decode output column {:?} ({}), keeping it as is",
            self.raw, self.reason
        )
    }
}

/// One row of a grouped aggregation, identified by its group key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupRow {
    /// The group key: one `(column, value)` pair per grouping dimension.
    pub groups: Vec<GroupValue>,
    pub count: Option<i64>,
    /// Aggregated value of each column.
    pub aggregates: BTreeMap<String, f64>,
    /// Derived averages, keyed by the aggregated column.
    pub averages: BTreeMap<String, f64>,
}

impl GroupRow {
    /// The value of this row along the given grouping dimension.
    pub fn group(&self, column: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|group| group.column == column)
            .map(|group| group.value.as_str())
    }

    pub fn average(&self, column: &str) -> Option<f64> {
        self.averages.get(column).copied()
    }

    /// Flatten the row into a record: one entry per group column, `count`,
    /// one entry per aggregated column and one `average_<column>` entry per
    /// derived average.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        for group in &self.groups {
            record.insert(group.column.clone(), Value::from(group.value.clone()));
        }
        if let Some(count) = self.count {
            record.insert("count".to_string(), Value::from(count));
        }
        for (column, value) in &self.aggregates {
            record.insert(column.clone(), Value::from(*value));
        }
        for (column, value) in &self.averages {
            record.insert(format!("average_{}", column), Value::from(*value));
        }
        record
    }

    fn derive_averages(&mut self, precision: u32) {
        let count = match self.count {
            Some(count) if count != 0 => count as f64,
            _ => return,
        };
        for (column, value) in &self.aggregates {
            self.averages
                .insert(column.clone(), round_to(value / count, precision));
        }
    }
}

/// Output of [`GroupAggregationDecoder::decode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Rows in order of first encounter of their group key.
    pub rows: Vec<GroupRow>,
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows.iter().map(GroupRow::to_record).collect()
    }
}

/// Rebuilds a group-by table from the flat output of a grouped aggregation.
///
/// The aggregation returns a single row of values whose column names are JSON
/// encoded [`EncodedGroupColumn`]s. Columns sharing a group key are merged
/// into one [`GroupRow`].
#[derive(Debug, Clone)]
pub struct GroupAggregationDecoder {
    specs: Vec<GroupSpec>,
    average: bool,
    precision: u32,
}

impl GroupAggregationDecoder {
    pub fn new(specs: Vec<GroupSpec>) -> Self {
        Self {
            specs,
            average: false,
            precision: DEFAULT_FLOAT_PRECISION,
        }
    }

    /// Derive `average_<column>` values from the sums and counts.
    pub fn with_average(mut self, average: bool) -> Self {
        self.average = average;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn decode(&self, columns: &[String], values: &[f64]) -> Result<Decoded, DecodeError> {
        if columns.len() != values.len() {
            return Err(DecodeError::LengthMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        let mut decoded = Decoded::default();
        let mut index: HashMap<Vec<GroupValue>, usize> = HashMap::new();

        for (raw, value) in columns.iter().zip(values) {
            let column = match EncodedGroupColumn::decode(raw) {
                Ok(column) => column,
                Err(e) => {
                    let warning = DecodeWarning {
                        raw: raw.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", warning);
                    decoded.warnings.push(warning);
                    EncodedGroupColumn::fallback(raw)
                }
            };

            let key = self.group_key(column.groups);
            let position = match index.get(&key).copied() {
                Some(position) => position,
                None => {
                    decoded.rows.push(GroupRow {
                        groups: key.clone(),
                        ..Default::default()
                    });
                    index.insert(key, decoded.rows.len() - 1);
                    decoded.rows.len() - 1
                }
            };

            let row = &mut decoded.rows[position];
            if column.count {
                row.count = Some(value.round() as i64);
            } else {
                row.aggregates.insert(column.aggregated_column, *value);
            }
        }

        if self.average {
            for row in &mut decoded.rows {
                row.derive_averages(self.precision);
            }
        }
        Ok(decoded)
    }

    /// Order the pairs of a group key like the grouping dimensions were
    /// declared, so that the same groups listed in different orders end up in
    /// the same row. Columns without a group spec come last, in wire order.
    fn group_key(&self, mut groups: Vec<GroupValue>) -> Vec<GroupValue> {
        let rank = |group: &GroupValue| {
            self.specs
                .iter()
                .position(|spec| spec.column == group.column)
                .unwrap_or(self.specs.len())
        };
        groups.sort_by_key(rank);
        groups
    }
}

/// Precisions above this one are clamped, `f64` has no more significant digits.
const MAX_PRECISION: u32 = 15;

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn column(aggregated_column: &str, groups: &[(&str, &str)], count: bool) -> String {
        EncodedGroupColumn {
            aggregated_column: aggregated_column.to_string(),
            groups: groups.iter().map(|(c, v)| GroupValue::new(*c, *v)).collect(),
            count,
        }
        .encode()
    }

    fn age_spec() -> Vec<GroupSpec> {
        vec![GroupSpec::cuts("age", vec![0.0, 18.0, 65.0])]
    }

    #[test]
    fn single_count_column() {
        let columns = vec![
            r#"{"aggregatedColumn":"","groups":[{"column":"age","value":"[18,65)"}],"count":true}"#
                .to_string(),
        ];
        let decoded = GroupAggregationDecoder::new(age_spec())
            .decode(&columns, &[7.0])
            .unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert!(decoded.warnings.is_empty());
        let record = Value::Object(decoded.rows[0].to_record());
        assert_eq!(record, json!({"age": "[18,65)", "count": 7}));
    }

    #[test]
    fn merges_columns_sharing_a_key() {
        let columns = vec![
            column("", &[("age", "[0,18)")], true),
            column("weight", &[("age", "[0,18)")], false),
            column("", &[("age", "[18,65)")], true),
            column("weight", &[("age", "[18,65)")], false),
            column("height", &[("age", "[0,18)")], false),
        ];
        let values = [3.2, 90.0, 5.0, 400.0, 420.0];
        let decoded = GroupAggregationDecoder::new(age_spec())
            .decode(&columns, &values)
            .unwrap();
        assert_eq!(decoded.rows.len(), 2);
        let first = &decoded.rows[0];
        assert_eq!(first.group("age"), Some("[0,18)"));
        assert_eq!(first.count, Some(3));
        assert_eq!(first.aggregates.get("weight"), Some(&90.0));
        assert_eq!(first.aggregates.get("height"), Some(&420.0));
        assert_eq!(decoded.rows[1].group("age"), Some("[18,65)"));
        assert!(first.averages.is_empty());
    }

    #[test]
    fn rows_keep_first_encounter_order() {
        let columns = vec![
            column("", &[("gender", "M")], true),
            column("", &[("gender", "F")], true),
            column("", &[("gender", "A")], true),
        ];
        let decoded = GroupAggregationDecoder::new(vec![GroupSpec::categorical("gender")])
            .decode(&columns, &[1.0, 2.0, 3.0])
            .unwrap();
        let order: Vec<_> = decoded
            .rows
            .iter()
            .map(|row| row.group("gender").unwrap())
            .collect();
        assert_eq!(order, vec!["M", "F", "A"]);
    }

    #[test]
    fn group_order_follows_specs() {
        let specs = vec![
            GroupSpec::categorical("gender"),
            GroupSpec::cuts("age", vec![0.0, 18.0]),
        ];
        let columns = vec![
            column("", &[("age", "[0,18)"), ("gender", "F")], true),
            column("weight", &[("gender", "F"), ("age", "[0,18)")], false),
        ];
        let decoded = GroupAggregationDecoder::new(specs)
            .decode(&columns, &[2.0, 60.0])
            .unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.rows[0].groups[0].column, "gender");
        assert_eq!(decoded.rows[0].count, Some(2));
        assert_eq!(decoded.rows[0].aggregates.get("weight"), Some(&60.0));
    }

    #[test]
    fn averages() {
        let columns = vec![
            column("", &[("age", "[0,18)")], true),
            column("sum", &[("age", "[0,18)")], false),
            column("", &[("age", "[18,65)")], true),
            column("sum", &[("age", "[18,65)")], false),
            column("sum", &[("age", "[65,inf)")], false),
        ];
        let values = [4.0, 10.0, 0.0, 3.0, 1.0];
        let decoded = GroupAggregationDecoder::new(age_spec())
            .with_average(true)
            .decode(&columns, &values)
            .unwrap();
        assert_eq!(decoded.rows[0].average("sum"), Some(2.5));
        assert_eq!(
            decoded.rows[0].to_record().get("average_sum"),
            Some(&json!(2.5))
        );
        // a zero count must not be divided by
        assert_eq!(decoded.rows[1].average("sum"), None);
        assert!(decoded.rows[1].to_record().get("average_sum").is_none());
        // nor a missing one
        assert_eq!(decoded.rows[2].average("sum"), None);
    }

    #[test]
    fn averages_are_rounded() {
        let columns = vec![column("", &[], true), column("x", &[], false)];
        let decoded = GroupAggregationDecoder::new(vec![])
            .with_average(true)
            .with_precision(2)
            .decode(&columns, &[3.0, 1.0])
            .unwrap();
        assert_eq!(decoded.rows[0].average("x"), Some(0.33));
    }

    #[test]
    fn huge_precision_is_clamped() {
        let columns = vec![column("", &[], true), column("x", &[], false)];
        let decoded = GroupAggregationDecoder::new(vec![])
            .with_average(true)
            .with_precision(u32::MAX)
            .decode(&columns, &[3.0, 1.0])
            .unwrap();
        let average = decoded.rows[0].average("x").unwrap();
        assert!((average - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn counts_are_rounded() {
        let columns = vec![column("", &[("g", "a")], true), column("", &[("g", "b")], true)];
        let decoded = GroupAggregationDecoder::new(vec![])
            .decode(&columns, &[6.6, -0.7])
            .unwrap();
        assert_eq!(decoded.rows[0].count, Some(7));
        assert_eq!(decoded.rows[1].count, Some(-1));
    }

    #[test]
    fn malformed_columns_fall_back() {
        let columns = vec!["total".to_string(), column("", &[("g", "a")], true)];
        let decoded = GroupAggregationDecoder::new(vec![])
            .decode(&columns, &[12.0, 1.0])
            .unwrap();
        assert_eq!(decoded.warnings.len(), 1);
        assert_eq!(decoded.warnings[0].raw, "total");
        assert_eq!(decoded.rows.len(), 2);
        assert!(decoded.rows[0].groups.is_empty());
        assert_eq!(decoded.rows[0].aggregates.get("total"), Some(&12.0));
        assert_eq!(decoded.rows[0].count, None);
    }

    #[test]
    fn length_mismatch() {
        let columns = vec![column("", &[], true)];
        assert_eq!(
            GroupAggregationDecoder::new(vec![]).decode(&columns, &[]),
            Err(DecodeError::LengthMismatch {
                columns: 1,
                values: 0
            })
        );
    }
}
