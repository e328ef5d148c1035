use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::RecordObject;
use crate::column_index::ColumnIndex;
use crate::error::{TableError, TableResult};
use crate::value::{values_match, CellValue};

/// Required value per column. An empty criteria map matches every record.
pub type Criteria = BTreeMap<String, CellValue>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Criteria resolved against a column index: `(position, required value)`.
pub(crate) struct Filter<'a> {
    terms: Vec<(usize, &'a CellValue)>,
}

impl<'a> Filter<'a> {
    pub(crate) fn new(criteria: &'a Criteria, columns: &ColumnIndex, table: &str) -> TableResult<Self> {
        let terms = criteria
            .iter()
            .map(|(column, value)| Ok((column_position(columns, table, column)?, value)))
            .collect::<TableResult<Vec<_>>>()?;
        Ok(Self { terms })
    }

    pub(crate) fn single(position: usize, value: &'a CellValue) -> Self {
        Self {
            terms: vec![(position, value)],
        }
    }

    pub(crate) fn matches(&self, record: &[CellValue]) -> bool {
        self.terms.iter().all(|(idx, expected)| {
            let cell = record.get(*idx).unwrap_or(&CellValue::Empty);
            values_match(cell, expected)
        })
    }
}

pub(crate) fn column_position(columns: &ColumnIndex, table: &str, column: &str) -> TableResult<usize> {
    columns
        .position(column)
        .ok_or_else(|| TableError::InvalidColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn kind_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Empty => 0,
        CellValue::Number(_) => 1,
        CellValue::String(s) if s.is_empty() => 0,
        CellValue::String(_) => 2,
        CellValue::Boolean(_) => 3,
    }
}

/// Natural ordering of two cells.
///
/// Numbers compare numerically, strings lexically and booleans `false < true`.
/// Across kinds the order is empty < number < string < boolean. Numbers use
/// [`f64::total_cmp`], so `NaN` sorts after every other number.
pub fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
        (CellValue::String(a), CellValue::String(b)) => a.cmp(b),
        (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

/// Stable in-place sort of `records` by `spec`.
///
/// Fails with [`TableError::InvalidColumn`] when the sort column is not in
/// `columns`, even if `records` is empty.
pub fn sort_records(
    records: &mut [RecordObject],
    spec: &SortSpec,
    columns: &ColumnIndex,
    table: &str,
) -> TableResult<()> {
    column_position(columns, table, &spec.column)?;
    let empty = CellValue::Empty;
    records.sort_by(|a, b| {
        let a = a.get(&spec.column).unwrap_or(&empty);
        let b = b.get(&spec.column).unwrap_or(&empty);
        let ord = compare_cells(a, b);
        match spec.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns() -> ColumnIndex {
        ColumnIndex::from_header(&[CellValue::from("x"), CellValue::from("tag")])
    }

    fn rows(xs: &[f64]) -> Vec<RecordObject> {
        xs.iter()
            .map(|x| {
                let mut obj = RecordObject::new();
                obj.insert("x".into(), CellValue::Number(*x));
                obj
            })
            .collect()
    }

    fn xs(records: &[RecordObject]) -> Vec<CellValue> {
        records.iter().map(|r| r["x"].clone()).collect()
    }

    #[test]
    fn sorts_ascending_and_descending() {
        let mut records = rows(&[3.0, 1.0, 2.0]);
        sort_records(&mut records, &SortSpec::asc("x"), &columns(), "T").unwrap();
        assert_eq!(
            xs(&records),
            vec![CellValue::Number(1.0), CellValue::Number(2.0), CellValue::Number(3.0)]
        );

        sort_records(&mut records, &SortSpec::desc("x"), &columns(), "T").unwrap();
        assert_eq!(
            xs(&records),
            vec![CellValue::Number(3.0), CellValue::Number(2.0), CellValue::Number(1.0)]
        );
    }

    #[test]
    fn unknown_sort_column_is_rejected() {
        let mut records = rows(&[1.0]);
        let err = sort_records(&mut records, &SortSpec::asc("y"), &columns(), "T").unwrap_err();
        assert!(matches!(err, TableError::InvalidColumn { column, .. } if column == "y"));
    }

    #[test]
    fn ties_keep_input_order() {
        let mut records = Vec::new();
        for (x, tag) in [(1.0, "a"), (0.0, "b"), (1.0, "c"), (0.0, "d")] {
            let mut obj = RecordObject::new();
            obj.insert("x".into(), CellValue::Number(x));
            obj.insert("tag".into(), CellValue::from(tag));
            records.push(obj);
        }
        sort_records(&mut records, &SortSpec::desc("x"), &columns(), "T").unwrap();
        let tags: Vec<_> = records.iter().map(|r| r["tag"].to_string()).collect();
        assert_eq!(tags, vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn nan_sorts_after_finite_numbers() {
        let xs_in: Vec<f64> = (0..60)
            .map(|i| if i % 3 == 0 { f64::NAN } else { f64::from((i * 37) % 50) })
            .collect();
        let mut records = rows(&xs_in);
        sort_records(&mut records, &SortSpec::asc("x"), &columns(), "T").unwrap();

        let sorted: Vec<f64> = xs(&records)
            .iter()
            .map(|v| match v {
                CellValue::Number(n) => *n,
                other => panic!("unexpected cell {other:?}"),
            })
            .collect();
        let finite = sorted.iter().take_while(|n| !n.is_nan()).count();
        assert_eq!(finite, 40);
        assert!(sorted[..finite].windows(2).all(|w| w[0] <= w[1]));
        assert!(sorted[finite..].iter().all(|n| n.is_nan()));
    }

    #[test]
    fn mixed_kinds_follow_rank() {
        let mut values = vec![
            CellValue::Boolean(false),
            CellValue::from("b"),
            CellValue::Number(10.0),
            CellValue::Empty,
            CellValue::from("a"),
            CellValue::Number(2.0),
        ];
        values.sort_by(compare_cells);
        assert_eq!(
            values,
            vec![
                CellValue::Empty,
                CellValue::Number(2.0),
                CellValue::Number(10.0),
                CellValue::from("a"),
                CellValue::from("b"),
                CellValue::Boolean(false),
            ]
        );
    }

    #[test]
    fn filter_requires_every_term() {
        let mut criteria = Criteria::new();
        criteria.insert("x".into(), CellValue::from("7"));
        criteria.insert("tag".into(), CellValue::from("a"));
        let columns = columns();
        let filter = Filter::new(&criteria, &columns, "T").unwrap();

        assert!(filter.matches(&[CellValue::Number(7.0), CellValue::from("a")]));
        assert!(!filter.matches(&[CellValue::Number(7.0), CellValue::from("b")]));
        assert!(!filter.matches(&[CellValue::Number(7.0)]));

        let everything = Criteria::new();
        assert!(Filter::new(&everything, &columns, "T").unwrap().matches(&[]));
    }

    #[test]
    fn filter_rejects_unknown_columns() {
        let mut criteria = Criteria::new();
        criteria.insert("nope".into(), CellValue::from(1));
        assert!(matches!(
            Filter::new(&criteria, &columns(), "T"),
            Err(TableError::InvalidColumn { .. })
        ));
    }
}
