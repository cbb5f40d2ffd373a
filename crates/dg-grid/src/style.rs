//! Conditional row and cell style rules. Styles are opaque strings.

use dg_expr::{Bindings, ExprError, Formula};

use crate::filter::predicate_holds;

/// Adds `style` to every row for which `predicate` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RowStyleRule {
    pub predicate: Formula,
    pub style: String,
}

impl RowStyleRule {
    pub fn new(style: impl Into<String>, predicate: &str) -> Result<Self, ExprError> {
        Ok(Self {
            predicate: Formula::predicate(predicate)?,
            style: style.into(),
        })
    }
}

/// Adds `style` to one column's cell in rows where `predicate` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CellStyleRule {
    pub column: String,
    pub predicate: Formula,
    pub style: String,
}

impl CellStyleRule {
    pub fn new(
        column: impl Into<String>,
        style: impl Into<String>,
        predicate: &str,
    ) -> Result<Self, ExprError> {
        Ok(Self {
            column: column.into(),
            predicate: Formula::predicate(predicate)?,
            style: style.into(),
        })
    }
}

/// Base style of a column, optionally conditional.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStyleRule {
    pub column: String,
    pub style: String,
    pub predicate: Option<Formula>,
}

impl ColumnStyleRule {
    pub fn new(
        column: impl Into<String>,
        style: impl Into<String>,
        predicate: Option<&str>,
    ) -> Result<Self, ExprError> {
        Ok(Self {
            column: column.into(),
            style: style.into(),
            predicate: predicate.map(Formula::predicate).transpose()?,
        })
    }

    fn applies<B: Bindings + ?Sized>(&self, row: &B) -> bool {
        self.predicate
            .as_ref()
            .is_none_or(|predicate| predicate_holds(predicate, row))
    }
}

fn push_style(target: &mut String, style: &str) {
    if style.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(style);
}

/// Space-joined styles of every matching row rule.
#[must_use]
pub fn row_style<B: Bindings + ?Sized>(rules: &[RowStyleRule], row: &B) -> String {
    let mut style = String::new();
    for rule in rules {
        if predicate_holds(&rule.predicate, row) {
            push_style(&mut style, &rule.style);
        }
    }
    style
}

/// Style of `column`: matching column styles first, then matching cell rules.
#[must_use]
pub fn cell_style<B: Bindings + ?Sized>(
    column: &str,
    column_rules: &[ColumnStyleRule],
    cell_rules: &[CellStyleRule],
    row: &B,
) -> String {
    let mut style = String::new();
    for rule in column_rules {
        if rule.column == column && rule.applies(row) {
            push_style(&mut style, &rule.style);
        }
    }
    for rule in cell_rules {
        if rule.column == column && predicate_holds(&rule.predicate, row) {
            push_style(&mut style, &rule.style);
        }
    }
    style
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use dg_types::Scalar;

    use super::{CellStyleRule, ColumnStyleRule, RowStyleRule, cell_style, row_style};

    fn row(one: i64, two: i64) -> BTreeMap<String, Scalar> {
        BTreeMap::from([
            ("one".to_owned(), Scalar::Int64(one)),
            ("two".to_owned(), Scalar::Int64(two)),
        ])
    }

    #[test]
    fn matching_row_styles_are_space_joined() {
        let rules = vec![
            RowStyleRule::new("odd", "{one} % 2 == 1").expect("rule"),
            RowStyleRule::new("big", "{two} > 3").expect("rule"),
            RowStyleRule::new("never", "false").expect("rule"),
        ];
        assert_eq!(row_style(&rules, &row(1, 5)), "odd big");
        assert_eq!(row_style(&rules, &row(2, 5)), "big");
        assert_eq!(row_style(&rules, &row(2, 1)), "");
    }

    #[test]
    fn column_styles_precede_cell_rules() {
        let column_rules = vec![
            ColumnStyleRule::new("two", "num", None).expect("rule"),
            ColumnStyleRule::new("two", "hot", Some("{two} > 4")).expect("rule"),
            ColumnStyleRule::new("one", "id", None).expect("rule"),
        ];
        let cell_rules = vec![
            CellStyleRule::new("two", "flag", "{one} == 1").expect("rule"),
            CellStyleRule::new("one", "flag", "{one} == 2").expect("rule"),
        ];
        assert_eq!(
            cell_style("two", &column_rules, &cell_rules, &row(1, 5)),
            "num hot flag"
        );
        assert_eq!(
            cell_style("two", &column_rules, &cell_rules, &row(2, 1)),
            "num"
        );
        assert_eq!(
            cell_style("one", &column_rules, &cell_rules, &row(2, 1)),
            "id flag"
        );
    }
}
