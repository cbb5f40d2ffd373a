//! Pre- and post-aggregation row filters.

use dg_columns::ColumnSet;
use dg_expr::{Bindings, Formula};
use dg_types::Scalar;

/// Name-based access to a positional row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a ColumnSet,
    values: &'a [Scalar],
}

impl<'a> RowView<'a> {
    #[must_use]
    pub fn new(columns: &'a ColumnSet, values: &'a [Scalar]) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn values(&self) -> &'a [Scalar] {
        self.values
    }
}

impl Bindings for RowView<'_> {
    fn lookup(&self, name: &str) -> Option<&Scalar> {
        self.columns
            .position(name)
            .and_then(|idx| self.values.get(idx))
    }
}

/// A predicate that fails to evaluate does not match.
#[must_use]
pub fn predicate_holds<B: Bindings + ?Sized>(predicate: &Formula, row: &B) -> bool {
    predicate.matches(row).unwrap_or(false)
}

/// A row passes when every filter holds for it.
#[must_use]
pub fn row_matches<B: Bindings + ?Sized>(filters: &[Formula], row: &B) -> bool {
    filters.iter().all(|filter| predicate_holds(filter, row))
}

/// A group survives when each filter holds for at least one of its members.
///
/// This is looser than [`row_matches`] applied member by member: different
/// filters may be satisfied by different rows.
#[must_use]
pub fn group_matches<B: Bindings>(filters: &[Formula], members: &[B]) -> bool {
    filters
        .iter()
        .all(|filter| members.iter().any(|row| predicate_holds(filter, row)))
}
