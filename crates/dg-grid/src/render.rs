//! The narrow interface between the pipeline and output formats.

use std::collections::BTreeMap;

use dg_types::Scalar;

/// What a renderer may know about the grid being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridView {
    columns: Vec<String>,
    groupby: Vec<String>,
    suppress_detail: bool,
    descriptions: BTreeMap<String, String>,
}

impl GridView {
    #[must_use]
    pub fn new(
        columns: Vec<String>,
        groupby: Vec<String>,
        suppress_detail: bool,
        descriptions: BTreeMap<String, String>,
    ) -> Self {
        Self {
            columns,
            groupby,
            suppress_detail,
            descriptions,
        }
    }

    /// Names of the displayed columns, in display order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn groupby(&self) -> &[String] {
        &self.groupby
    }

    #[must_use]
    pub fn is_grouped(&self) -> bool {
        !self.groupby.is_empty()
    }

    #[must_use]
    pub fn suppress_detail(&self) -> bool {
        self.suppress_detail
    }

    /// Number of group levels that carry a level marker: the group-by depth,
    /// minus one when detail rows are suppressed.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.groupby
            .len()
            .saturating_sub(usize::from(self.suppress_detail))
    }

    #[must_use]
    pub fn description(&self, column: &str) -> Option<&str> {
        self.descriptions.get(column).map(String::as_str)
    }
}

/// Identifies the group a summary row belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupLabel<'a> {
    pub name: &'a str,
    pub value: &'a Scalar,
}

/// An output format.
///
/// The render driver calls `setup`, then `head`, then for every row one
/// `cell` per displayed column followed by `row`, then one `cell` per
/// displayed column of the footer followed by `tail`, and finally `table`
/// with the collected fragments.
pub trait Renderer {
    fn setup(&mut self, _view: &GridView) {}

    fn head(&mut self, view: &GridView) -> String;

    /// `column` is the position among the displayed columns.
    fn cell(&mut self, view: &GridView, style: &str, value: &Scalar, column: usize) -> String;

    /// `level` is the remaining group depth; leaf rows are level 0 and carry
    /// no group label.
    fn row(
        &mut self,
        view: &GridView,
        style: &str,
        cells: &str,
        level: usize,
        group: Option<GroupLabel<'_>>,
    ) -> String;

    fn tail(&mut self, view: &GridView, cells: &str) -> String;

    fn table(&mut self, view: &GridView, head: &str, body: &str, tail: &str) -> String;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::GridView;

    #[test]
    fn depth_discounts_suppressed_detail() {
        let groupby = vec!["region".to_owned(), "rep".to_owned()];
        let view = GridView::new(vec![], groupby.clone(), false, BTreeMap::new());
        assert_eq!(view.depth(), 2);
        let view = GridView::new(vec![], groupby, true, BTreeMap::new());
        assert_eq!(view.depth(), 1);
        let flat = GridView::new(vec![], vec![], true, BTreeMap::new());
        assert_eq!(flat.depth(), 0);
        assert!(!flat.is_grouped());
    }

    #[test]
    fn descriptions_are_looked_up_by_column() {
        let view = GridView::new(
            vec!["amount".to_owned()],
            vec![],
            false,
            BTreeMap::from([("amount".to_owned(), "Net amount".to_owned())]),
        );
        assert_eq!(view.description("amount"), Some("Net amount"));
        assert_eq!(view.description("other"), None);
    }
}
