use std::cmp::Ordering;

use dg_columns::{ResolvedSortKey, SortDirection};
use dg_types::Scalar;

/// Sort `items` by `keys`, the first key being primary.
///
/// Applies one stable sort per key, innermost first. Text compares
/// case-insensitively; ties keep their relative order in both directions.
pub fn sort_by_keys<T, F>(items: &mut [T], keys: &[ResolvedSortKey], values_of: F)
where
    F: Fn(&T) -> &[Scalar],
{
    let blank = Scalar::blank();
    for key in keys.iter().rev() {
        items.sort_by(|a, b| {
            let lhs = values_of(a).get(key.index).unwrap_or(&blank);
            let rhs = values_of(b).get(key.index).unwrap_or(&blank);
            directed(lhs.sort_cmp(rhs), key.direction)
        });
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}
