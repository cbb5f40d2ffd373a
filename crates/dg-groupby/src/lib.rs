#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use dg_types::Scalar;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupByError {
    #[error("unknown reducer {0:?}; expected one of sum, count, min, max, avg")]
    UnknownReducer(String),
    #[error("invalid aggregate option {0:?}; expected \"column|reducer\"")]
    InvalidOption(String),
}

/// A user-supplied reducer with a display name.
pub struct CustomReducer {
    name: String,
    func: Arc<dyn Fn(&[Scalar]) -> Scalar + Send + Sync>,
}

impl CustomReducer {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Scalar]) -> Scalar + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl Clone for CustomReducer {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl fmt::Debug for CustomReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomReducer({:?})", self.name)
    }
}

/// Reduces the member values of a partition to a single summary value.
#[derive(Debug, Clone)]
pub enum Reducer {
    Sum,
    Count,
    Min,
    Max,
    Avg,
    Custom(CustomReducer),
}

impl Reducer {
    pub fn custom(
        name: impl Into<String>,
        func: impl Fn(&[Scalar]) -> Scalar + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(CustomReducer::new(name, func))
    }

    pub fn parse(name: &str) -> Result<Self, GroupByError> {
        match name.trim() {
            "sum" => Ok(Self::Sum),
            "count" | "len" => Ok(Self::Count),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "avg" | "mean" => Ok(Self::Avg),
            other => Err(GroupByError::UnknownReducer(other.to_owned())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Custom(custom) => &custom.name,
        }
    }

    /// Apply the reducer to `values`, skipping blank placeholders.
    ///
    /// With no input `sum` and `count` give `0` while `min`, `max` and `avg`
    /// give a blank. Non-numeric input to `sum` or `avg` gives `--`.
    #[must_use]
    pub fn reduce(&self, values: &[Scalar]) -> Scalar {
        let present: Vec<Scalar> = values.iter().filter(|v| !v.is_blank()).cloned().collect();
        match self {
            Self::Sum => reduce_sum(&present),
            Self::Count => Scalar::Int64(present.len() as i64),
            Self::Min => present
                .iter()
                .min_by(|a, b| a.natural_cmp(b))
                .cloned()
                .unwrap_or_else(Scalar::blank),
            Self::Max => present
                .iter()
                .max_by(|a, b| a.natural_cmp(b))
                .cloned()
                .unwrap_or_else(Scalar::blank),
            Self::Avg => reduce_avg(&present),
            Self::Custom(custom) => (custom.func)(&present),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn reduce_sum(values: &[Scalar]) -> Scalar {
    if values.iter().all(|v| matches!(v, Scalar::Int64(_))) {
        let mut total = 0_i64;
        let mut overflowed = false;
        for value in values {
            if let Scalar::Int64(v) = value {
                match total.checked_add(*v) {
                    Some(next) => total = next,
                    None => {
                        overflowed = true;
                        break;
                    }
                }
            }
        }
        if !overflowed {
            return Scalar::Int64(total);
        }
    }

    match float_sum(values) {
        Some(total) => Scalar::Float64(total),
        None => Scalar::unavailable(),
    }
}

fn reduce_avg(values: &[Scalar]) -> Scalar {
    if values.is_empty() {
        return Scalar::blank();
    }
    match float_sum(values) {
        Some(total) => Scalar::Float64(total / values.len() as f64),
        None => Scalar::unavailable(),
    }
}

fn float_sum(values: &[Scalar]) -> Option<f64> {
    values
        .iter()
        .try_fold(0.0_f64, |acc, value| value.to_f64().ok().map(|v| acc + v))
}

/// Parse `column|reducer` strings into an ordered aggregate mapping.
pub fn parse_aggregate_options<S: AsRef<str>>(
    options: &[S],
) -> Result<Vec<(String, Reducer)>, GroupByError> {
    options
        .iter()
        .map(|option| {
            let option = option.as_ref();
            let (column, reducer) = option
                .rsplit_once('|')
                .filter(|(column, _)| !column.is_empty())
                .ok_or_else(|| GroupByError::InvalidOption(option.to_owned()))?;
            Ok((column.to_owned(), Reducer::parse(reducer)?))
        })
        .collect()
}

/// One partition of rows sharing a group key.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub key: Scalar,
    /// Positions of the member rows, in input order.
    pub members: Vec<usize>,
}

/// Stable sort-then-group partitioning on `column`.
///
/// Partitions come back in ascending key order; members keep their input
/// order.
#[must_use]
pub fn partition<R: AsRef<[Scalar]>>(rows: &[R], column: usize) -> Vec<Partition> {
    let blank = Scalar::blank();
    let key_of = |pos: usize| rows[pos].as_ref().get(column).unwrap_or(&blank);

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| key_of(a).natural_cmp(key_of(b)));

    let mut out: Vec<Partition> = Vec::new();
    for pos in order {
        let key = key_of(pos);
        match out.last_mut() {
            Some(current) if current.key.natural_cmp(key).is_eq() => current.members.push(pos),
            _ => out.push(Partition {
                key: key.clone(),
                members: vec![pos],
            }),
        }
    }
    out
}

/// Build a summary row: `template` with each aggregated column replaced by
/// its reducer applied to the member values of that column.
#[must_use]
pub fn aggregate_summary<R: AsRef<[Scalar]>>(
    mut template: Vec<Scalar>,
    members: &[R],
    aggregates: &[(usize, Reducer)],
) -> Vec<Scalar> {
    for (column, reducer) in aggregates {
        let values: Vec<Scalar> = members
            .iter()
            .filter_map(|row| row.as_ref().get(*column).cloned())
            .collect();
        if let Some(slot) = template.get_mut(*column) {
            *slot = reducer.reduce(&values);
        }
    }
    template
}

#[cfg(test)]
mod tests {
    use dg_types::Scalar;

    use super::{GroupByError, Reducer, aggregate_summary, parse_aggregate_options, partition};

    fn ints(values: &[i64]) -> Vec<Scalar> {
        values.iter().map(|v| Scalar::Int64(*v)).collect()
    }

    #[test]
    fn reducers_on_empty_input() {
        assert_eq!(Reducer::Sum.reduce(&[]), Scalar::Int64(0));
        assert_eq!(Reducer::Count.reduce(&[]), Scalar::Int64(0));
        assert!(Reducer::Min.reduce(&[]).is_blank());
        assert!(Reducer::Max.reduce(&[]).is_blank());
        assert!(Reducer::Avg.reduce(&[]).is_blank());
    }

    #[test]
    fn reducers_skip_blank_placeholders() {
        let values = vec![Scalar::Int64(4), Scalar::blank(), Scalar::Int64(2)];
        assert_eq!(Reducer::Sum.reduce(&values), Scalar::Int64(6));
        assert_eq!(Reducer::Count.reduce(&values), Scalar::Int64(2));
        assert_eq!(Reducer::Avg.reduce(&values), Scalar::Float64(3.0));
        assert_eq!(Reducer::Min.reduce(&values), Scalar::Int64(2));
        assert_eq!(Reducer::Max.reduce(&values), Scalar::Int64(4));
    }

    #[test]
    fn sum_widens_to_float_on_mixed_input() {
        let values = vec![Scalar::Int64(1), Scalar::Float64(0.5)];
        assert_eq!(Reducer::Sum.reduce(&values), Scalar::Float64(1.5));

        let overflow = ints(&[i64::MAX, 1]);
        assert!(matches!(Reducer::Sum.reduce(&overflow), Scalar::Float64(_)));
    }

    #[test]
    fn non_numeric_sum_and_avg_are_unavailable() {
        let values = vec![Scalar::Int64(1), Scalar::from("north")];
        assert!(Reducer::Sum.reduce(&values).is_unavailable());
        assert!(Reducer::Avg.reduce(&values).is_unavailable());
        assert_eq!(Reducer::Max.reduce(&values), Scalar::from("north"));
    }

    #[test]
    fn custom_reducers_see_present_values_only() {
        let reducer = Reducer::custom("first", |values| {
            values.first().cloned().unwrap_or_else(Scalar::blank)
        });
        assert_eq!(reducer.name(), "first");
        let values = vec![Scalar::blank(), Scalar::from("x"), Scalar::from("y")];
        assert_eq!(reducer.reduce(&values), Scalar::from("x"));
    }

    #[test]
    fn aggregate_options_parse_in_order() {
        let parsed = parse_aggregate_options(&["colA|count", "colB|max"]).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, "colA");
        assert_eq!(parsed[0].1.name(), "count");
        assert_eq!(parsed[1].1.name(), "max");

        assert_eq!(
            parse_aggregate_options(&["colA"]).expect_err("no reducer"),
            GroupByError::InvalidOption("colA".into())
        );
        assert_eq!(
            parse_aggregate_options(&["colA|median"]).expect_err("unknown"),
            GroupByError::UnknownReducer("median".into())
        );
    }

    #[test]
    fn partition_orders_keys_and_keeps_member_order() {
        let rows = vec![
            vec![Scalar::from("b"), Scalar::Int64(1)],
            vec![Scalar::from("a"), Scalar::Int64(2)],
            vec![Scalar::from("b"), Scalar::Int64(3)],
            vec![Scalar::from("a"), Scalar::Int64(4)],
        ];
        let groups = partition(&rows, 0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, Scalar::from("a"));
        assert_eq!(groups[0].members, vec![1, 3]);
        assert_eq!(groups[1].key, Scalar::from("b"));
        assert_eq!(groups[1].members, vec![0, 2]);
    }

    #[test]
    fn partition_treats_equal_numbers_as_one_key() {
        let rows = vec![vec![Scalar::Int64(2)], vec![Scalar::Float64(2.0)]];
        let groups = partition(&rows, 0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1]);
    }

    #[test]
    fn summary_fills_only_reduced_columns() {
        let rows = vec![ints(&[1, 2, 3]), ints(&[1, 5, 6])];
        let template = vec![Scalar::Int64(1), Scalar::blank(), Scalar::blank()];
        let summary = aggregate_summary(template, &rows, &[(1, Reducer::Sum)]);
        assert_eq!(
            summary,
            vec![Scalar::Int64(1), Scalar::Int64(7), Scalar::blank()]
        );
    }
}
