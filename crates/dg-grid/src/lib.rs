#![forbid(unsafe_code)]

pub mod calc;
pub mod config;
pub mod filter;
pub mod format;
pub mod render;
pub mod sort;
pub mod style;
pub mod tree;

use std::collections::BTreeMap;

use dg_columns::{ColumnError, ColumnSet, ResolvedSortKey};
use dg_expr::{ExprError, Formula};
use dg_groupby::{GroupByError, Reducer};
use dg_types::Scalar;
use thiserror::Error;

pub use dg_columns::{SortDirection, SortKey};

pub use calc::{CalcFn, Calculation, Calculations, RowMap, calculate};
pub use config::{
    CalculatedColumnConfig, CellStyleConfig, ColumnStyleConfig, ConfigError, GridConfig,
    RowStyleConfig,
};
pub use filter::RowView;
pub use format::{FormatError, Formatter, PrintfTemplate, parse_formatter, parse_formatter_options};
pub use render::{GridView, GroupLabel, Renderer};
pub use style::{CellStyleRule, ColumnStyleRule, RowStyleRule};
pub use tree::{GroupBody, GroupNode, GroupTree};

use filter::row_matches;
use style::{cell_style, row_style};
use tree::TreeBuilder;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("column does not exist: {0:?}")]
    ColumnNotFound(String),
    #[error("column is defined more than once: {0:?}")]
    DuplicateColumn(String),
    #[error("row {row} has {found} cells; expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("calculated columns could not be resolved: {}", .pending.join(", "))]
    CalculationUnresolvable { pending: Vec<String> },
    #[error("dataset has no rows")]
    EmptyDataset,
    #[error(transparent)]
    Formula(#[from] ExprError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ColumnError> for GridError {
    fn from(err: ColumnError) -> Self {
        match err {
            ColumnError::ColumnNotFound(name) => Self::ColumnNotFound(name),
            ColumnError::DuplicateColumn(name) => Self::DuplicateColumn(name),
            ColumnError::InvalidSortDirection(direction) => {
                Self::Config(ConfigError::SortDirection(direction))
            }
        }
    }
}

impl From<GroupByError> for GridError {
    fn from(err: GroupByError) -> Self {
        Self::Config(err.into())
    }
}

impl From<FormatError> for GridError {
    fn from(err: FormatError) -> Self {
        Self::Config(err.into())
    }
}

/// A dataset plus the declarative description of how to render it.
///
/// Nothing is resolved until [`Grid::build_tree`] or [`Grid::render`]; both
/// validate every column name before producing output.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    data: Vec<Vec<Scalar>>,
    labels: Vec<String>,
    calculated_columns: Calculations,
    groupby: Vec<String>,
    aggregate: Vec<(String, Reducer)>,
    formatters: Vec<(String, Formatter)>,
    sortby: Vec<SortKey>,
    columns: Vec<String>,
    filters: Vec<Formula>,
    post_aggregate_filters: Vec<Formula>,
    cellstyles: Vec<CellStyleRule>,
    rowstyles: Vec<RowStyleRule>,
    columnstyles: Vec<ColumnStyleRule>,
    suppressdetail: bool,
    descriptions: BTreeMap<String, String>,
}

/// Column names resolved to positions for one render.
struct Plan {
    columns: ColumnSet,
    display: Vec<usize>,
    groupby: Vec<usize>,
    aggregates: Vec<(usize, Reducer)>,
    formatters: Vec<Option<Formatter>>,
    sort_keys: Vec<ResolvedSortKey>,
}

impl Grid {
    #[must_use]
    pub fn new(data: Vec<Vec<Scalar>>, labels: Vec<String>) -> Self {
        Self {
            data,
            labels,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn data(&self) -> &[Vec<Scalar>] {
        &self.data
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn calculated_columns(&self) -> &Calculations {
        &self.calculated_columns
    }

    /// Add a calculated column from a `{column}` formula.
    pub fn with_calculated_column(self, name: &str, formula: &str) -> Result<Self, GridError> {
        Ok(self.with_calculation(name, Calculation::formula(formula)?))
    }

    #[must_use]
    pub fn with_calculation(mut self, name: impl Into<String>, calculation: Calculation) -> Self {
        self.calculated_columns.insert(name, calculation);
        self
    }

    /// Append a group-by column; the first one added is the outermost.
    #[must_use]
    pub fn with_groupby(mut self, column: impl Into<String>) -> Self {
        self.groupby.push(column.into());
        self
    }

    #[must_use]
    pub fn with_aggregate(mut self, column: impl Into<String>, reducer: Reducer) -> Self {
        let column = column.into();
        self.aggregate.retain(|(existing, _)| *existing != column);
        self.aggregate.push((column, reducer));
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, column: impl Into<String>, formatter: Formatter) -> Self {
        let column = column.into();
        self.formatters.retain(|(existing, _)| *existing != column);
        self.formatters.push((column, formatter));
        self
    }

    #[must_use]
    pub fn with_sortby(mut self, key: impl Into<SortKey>) -> Self {
        self.sortby.push(key.into());
        self
    }

    /// Restrict and order the displayed columns.
    #[must_use]
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Keep only raw rows for which `predicate` holds, before grouping.
    pub fn with_filter(mut self, predicate: &str) -> Result<Self, GridError> {
        self.filters.push(Formula::predicate(predicate)?);
        Ok(self)
    }

    /// Filter resolved rows and groups after aggregation.
    pub fn with_post_aggregate_filter(mut self, predicate: &str) -> Result<Self, GridError> {
        self.post_aggregate_filters.push(Formula::predicate(predicate)?);
        Ok(self)
    }

    pub fn with_row_style(mut self, style: &str, predicate: &str) -> Result<Self, GridError> {
        self.rowstyles.push(RowStyleRule::new(style, predicate)?);
        Ok(self)
    }

    pub fn with_cell_style(
        mut self,
        column: &str,
        style: &str,
        predicate: &str,
    ) -> Result<Self, GridError> {
        self.cellstyles.push(CellStyleRule::new(column, style, predicate)?);
        Ok(self)
    }

    pub fn with_column_style(
        mut self,
        column: &str,
        style: &str,
        predicate: Option<&str>,
    ) -> Result<Self, GridError> {
        self.columnstyles
            .push(ColumnStyleRule::new(column, style, predicate)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_suppress_detail(mut self, suppress: bool) -> Self {
        self.suppressdetail = suppress;
        self
    }

    #[must_use]
    pub fn with_description(mut self, column: impl Into<String>, text: impl Into<String>) -> Self {
        self.descriptions.insert(column.into(), text.into());
        self
    }

    fn plan(&self) -> Result<Plan, GridError> {
        let first = self.data.first().ok_or(GridError::EmptyDataset)?;
        let width = self.labels.len().max(first.len());
        if let Some((row, values)) = self
            .data
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != width)
        {
            return Err(GridError::RaggedRow {
                row,
                expected: width,
                found: values.len(),
            });
        }

        let columns = ColumnSet::resolve(&self.labels, &self.calculated_columns.names(), width)?;
        let display = columns.display_indices(&self.columns)?;
        let groupby = columns.indices_of(&self.groupby)?;
        let aggregates = self
            .aggregate
            .iter()
            .map(|(name, reducer)| Ok((columns.index_of(name)?, reducer.clone())))
            .collect::<Result<Vec<_>, GridError>>()?;

        let mut formatters = vec![None; columns.len()];
        for (name, formatter) in &self.formatters {
            formatters[columns.index_of(name)?] = Some(formatter.clone());
        }
        let sort_keys = columns.resolve_sort_keys(&self.sortby)?;

        for filter in &self.filters {
            for name in filter.references() {
                columns.raw_index_of(name)?;
            }
        }
        let predicates = self
            .post_aggregate_filters
            .iter()
            .chain(self.rowstyles.iter().map(|rule| &rule.predicate))
            .chain(self.cellstyles.iter().map(|rule| &rule.predicate))
            .chain(self.columnstyles.iter().filter_map(|rule| rule.predicate.as_ref()));
        for predicate in predicates {
            for name in predicate.references() {
                columns.index_of(name)?;
            }
        }
        for column in self
            .cellstyles
            .iter()
            .map(|rule| &rule.column)
            .chain(self.columnstyles.iter().map(|rule| &rule.column))
        {
            columns.index_of(column)?;
        }

        Ok(Plan {
            columns,
            display,
            groupby,
            aggregates,
            formatters,
            sort_keys,
        })
    }

    fn tree(&self, plan: &Plan) -> Result<GroupTree, GridError> {
        let builder = TreeBuilder {
            columns: &plan.columns,
            calculations: &self.calculated_columns,
            groupby: &plan.groupby,
            aggregates: &plan.aggregates,
            post_filters: &self.post_aggregate_filters,
            sort_keys: &plan.sort_keys,
            suppress_detail: self.suppressdetail,
        };

        let mut rows = Vec::with_capacity(self.data.len());
        for raw in &self.data {
            if row_matches(&self.filters, &RowView::new(&plan.columns, raw)) {
                rows.push(builder.resolve_row(raw)?);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            total = self.data.len(),
            kept = rows.len(),
            groupby = plan.groupby.len(),
            "building group tree"
        );

        builder.build(&rows)
    }

    /// Resolve, filter, group and sort the data without rendering it.
    pub fn build_tree(&self) -> Result<GroupTree, GridError> {
        let plan = self.plan()?;
        self.tree(&plan)
    }

    /// The renderer-facing description of this grid.
    pub fn view(&self) -> Result<GridView, GridError> {
        let plan = self.plan()?;
        Ok(self.view_for(&plan))
    }

    fn view_for(&self, plan: &Plan) -> GridView {
        let names = plan.columns.names();
        GridView::new(
            plan.display.iter().map(|&idx| names[idx].clone()).collect(),
            self.groupby.clone(),
            self.suppressdetail,
            self.descriptions.clone(),
        )
    }

    /// Render the grid. All fatal errors surface before the renderer is
    /// first called.
    pub fn render<R: Renderer + ?Sized>(&self, renderer: &mut R) -> Result<String, GridError> {
        let plan = self.plan()?;
        let tree = self.tree(&plan)?;
        let view = self.view_for(&plan);

        #[cfg(feature = "tracing")]
        tracing::debug!(columns = view.columns().len(), depth = view.depth(), "rendering grid");

        let mut driver = Driver {
            grid: self,
            plan: &plan,
            view: &view,
            renderer,
        };
        driver.renderer.setup(&view);
        let head = driver.renderer.head(&view);
        let mut body = String::new();
        driver.body(&tree.body, &mut body);
        let cells = driver.cells(&tree.summary);
        let tail = driver.renderer.tail(&view, &cells);
        Ok(driver.renderer.table(&view, &head, &body, &tail))
    }
}

struct Driver<'a, R: Renderer + ?Sized> {
    grid: &'a Grid,
    plan: &'a Plan,
    view: &'a GridView,
    renderer: &'a mut R,
}

impl<R: Renderer + ?Sized> Driver<'_, R> {
    fn cells(&mut self, values: &[Scalar]) -> String {
        let bindings = RowView::new(&self.plan.columns, values);
        let names = self.plan.columns.names();
        let blank = Scalar::blank();
        let mut cells = String::new();
        for (position, &idx) in self.plan.display.iter().enumerate() {
            let style = cell_style(
                &names[idx],
                &self.grid.columnstyles,
                &self.grid.cellstyles,
                &bindings,
            );
            let raw = values.get(idx).unwrap_or(&blank);
            let value = match &self.plan.formatters[idx] {
                Some(formatter) => formatter.format(raw),
                None => raw.clone(),
            };
            cells.push_str(&self.renderer.cell(self.view, &style, &value, position));
        }
        cells
    }

    fn row(&mut self, values: &[Scalar], level: usize, group: Option<GroupLabel<'_>>) -> String {
        let cells = self.cells(values);
        let style = row_style(
            &self.grid.rowstyles,
            &RowView::new(&self.plan.columns, values),
        );
        self.renderer.row(self.view, &style, &cells, level, group)
    }

    fn body(&mut self, body: &GroupBody, out: &mut String) {
        match body {
            GroupBody::Suppressed => {}
            GroupBody::Rows(rows) => {
                for row in rows {
                    let fragment = self.row(row, 0, None);
                    out.push_str(&fragment);
                }
            }
            GroupBody::Groups(nodes) => {
                for node in nodes {
                    let label = GroupLabel {
                        name: &node.name,
                        value: &node.key,
                    };
                    let fragment = self.row(&node.summary, node.level, Some(label));
                    out.push_str(&fragment);
                    self.body(&node.body, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dg_groupby::Reducer;
    use dg_types::Scalar;

    use super::{Grid, GridError, GroupBody};

    fn ints(rows: &[&[i64]]) -> Vec<Vec<Scalar>> {
        rows.iter()
            .map(|row| row.iter().map(|v| Scalar::Int64(*v)).collect())
            .collect()
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn sample() -> Grid {
        Grid::new(ints(&[&[1, 2, 3], &[4, 5, 6]]), labels(&["one", "two", "three"]))
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let grid = Grid::new(Vec::new(), labels(&["one"]));
        assert_eq!(grid.build_tree().expect_err("empty"), GridError::EmptyDataset);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let grid = Grid::new(
            ints(&[&[1, 2, 3], &[4, 5]]),
            labels(&["one", "two", "three"]),
        );
        assert_eq!(
            grid.build_tree().expect_err("ragged"),
            GridError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn unknown_names_fail_before_rendering() {
        let err = sample().with_groupby("nope").build_tree().expect_err("groupby");
        assert_eq!(err, GridError::ColumnNotFound("nope".into()));

        let err = sample()
            .with_aggregate("missing", Reducer::Sum)
            .build_tree()
            .expect_err("aggregate");
        assert_eq!(err, GridError::ColumnNotFound("missing".into()));

        let err = sample()
            .with_columns(["one", "four"])
            .view()
            .expect_err("projection");
        assert_eq!(err, GridError::ColumnNotFound("four".into()));

        let err = sample()
            .with_filter("{nope} == 1")
            .expect("parse")
            .build_tree()
            .expect_err("filter");
        assert_eq!(err, GridError::ColumnNotFound("nope".into()));
    }

    #[test]
    fn pre_filters_may_only_name_raw_columns() {
        let err = sample()
            .with_calculated_column("four", "{two} + {three}")
            .expect("calc")
            .with_filter("{four} > 6")
            .expect("parse")
            .build_tree()
            .expect_err("calculated name in pre-filter");
        assert_eq!(err, GridError::ColumnNotFound("four".into()));
    }

    #[test]
    fn calculated_name_colliding_with_label_is_rejected() {
        let err = sample()
            .with_calculated_column("two", "{one} + 1")
            .expect("calc")
            .build_tree()
            .expect_err("duplicate");
        assert_eq!(err, GridError::DuplicateColumn("two".into()));
    }

    #[test]
    fn formula_syntax_errors_surface_at_build_time() {
        assert!(matches!(
            sample().with_calculated_column("x", "{one} +"),
            Err(GridError::Formula(_))
        ));
    }

    #[test]
    fn labels_are_synthesized_without_user_names() {
        let grid = Grid::new(ints(&[&[1, 2]]), Vec::new());
        let view = grid.view().expect("view");
        assert_eq!(view.columns(), &labels(&["A", "B"])[..]);
    }

    #[test]
    fn nested_groups_carry_enclosing_keys() {
        let data = vec![
            vec![Scalar::from("east"), Scalar::from("ann"), Scalar::Int64(10)],
            vec![Scalar::from("west"), Scalar::from("bob"), Scalar::Int64(5)],
            vec![Scalar::from("east"), Scalar::from("cal"), Scalar::Int64(7)],
            vec![Scalar::from("east"), Scalar::from("ann"), Scalar::Int64(1)],
        ];
        let tree = Grid::new(data, labels(&["region", "rep", "amount"]))
            .with_groupby("region")
            .with_groupby("rep")
            .with_aggregate("amount", Reducer::Sum)
            .build_tree()
            .expect("tree");

        assert_eq!(tree.summary, vec![Scalar::blank(), Scalar::blank(), Scalar::Int64(23)]);
        let regions = tree.body.groups();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].key, Scalar::from("east"));
        assert_eq!(regions[0].level, 2);
        assert_eq!(
            regions[0].summary,
            vec![Scalar::from("east"), Scalar::blank(), Scalar::Int64(18)]
        );

        let reps = regions[0].body.groups();
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[0].level, 1);
        assert_eq!(
            reps[0].summary,
            vec![Scalar::from("east"), Scalar::from("ann"), Scalar::Int64(11)]
        );
        assert_eq!(reps[0].body.leaf_rows().len(), 2);
    }

    #[test]
    fn suppressed_detail_stops_one_level_early() {
        let tree = sample()
            .with_groupby("one")
            .with_aggregate("two", Reducer::Sum)
            .with_suppress_detail(true)
            .build_tree()
            .expect("tree");
        let groups = tree.body.groups();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|node| node.level == 0));
        assert!(groups.iter().all(|node| node.body == GroupBody::Suppressed));
        assert_eq!(tree.summary[1], Scalar::Int64(7));
    }

    #[test]
    fn suppressed_detail_without_grouping_keeps_only_totals() {
        let tree = sample()
            .with_aggregate("three", Reducer::Sum)
            .with_suppress_detail(true)
            .build_tree()
            .expect("tree");
        assert_eq!(tree.body, GroupBody::Suppressed);
        assert_eq!(tree.summary[2], Scalar::Int64(9));
    }

    #[test]
    fn reduced_calculated_column_keeps_its_reduction() {
        let tree = sample()
            .with_calculated_column("four", "{two} + {three}")
            .expect("calc")
            .with_calculated_column("half", "{four} / 2")
            .expect("calc")
            .with_aggregate("four", Reducer::Sum)
            .build_tree()
            .expect("tree");
        assert_eq!(tree.summary[3], Scalar::Float64(16.0));
        assert_eq!(tree.summary[4], Scalar::Float64(8.0));
    }

    #[test]
    fn post_filters_keep_groups_with_any_matching_member() {
        let data = ints(&[&[1, 1], &[1, 9], &[2, 3]]);
        let tree = Grid::new(data, labels(&["g", "v"]))
            .with_groupby("g")
            .with_post_aggregate_filter("{v} > 5")
            .expect("filter")
            .build_tree()
            .expect("tree");
        let groups = tree.body.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, Scalar::Int64(1));
        assert_eq!(
            groups[0].body.leaf_rows(),
            vec![&[Scalar::Int64(1), Scalar::Int64(9)][..]]
        );
    }

    #[test]
    fn group_siblings_sort_by_summary_values() {
        let data = ints(&[&[1, 10], &[2, 30], &[3, 20]]);
        let tree = Grid::new(data, labels(&["g", "v"]))
            .with_groupby("g")
            .with_aggregate("v", Reducer::Sum)
            .with_sortby(("v", dg_columns::SortDirection::Desc))
            .build_tree()
            .expect("tree");
        let keys: Vec<&Scalar> = tree.body.groups().iter().map(|node| &node.key).collect();
        assert_eq!(
            keys,
            vec![&Scalar::Int64(2), &Scalar::Int64(3), &Scalar::Int64(1)]
        );
    }
}
