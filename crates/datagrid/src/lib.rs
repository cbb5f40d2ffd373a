#![forbid(unsafe_code)]

//! Render tabular data with grouping, per-group aggregation, calculated
//! columns, filters, multi-key sorting and conditional styles.
//!
//! ```
//! use datagrid::{AsciiRenderer, Grid, Reducer, Scalar};
//!
//! let grid = Grid::new(
//!     vec![
//!         vec![Scalar::from("east"), Scalar::Int64(10)],
//!         vec![Scalar::from("west"), Scalar::Int64(4)],
//!         vec![Scalar::from("east"), Scalar::Int64(6)],
//!     ],
//!     vec!["region".to_owned(), "amount".to_owned()],
//! )
//! .with_groupby("region")
//! .with_aggregate("amount", Reducer::Sum);
//!
//! let text = grid.render(&mut AsciiRenderer::default()).expect("render");
//! assert!(text.contains("region: east"));
//! ```

pub use dg_columns::{
    ColumnError, ColumnSet, ResolvedSortKey, SortDirection, SortKey, spreadsheet_name,
};
pub use dg_expr::{Bindings, EvalError, EvalMode, Expr, ExprError, Formula, parse_formula};
pub use dg_grid::{
    CalcFn, Calculation, Calculations, CalculatedColumnConfig, CellStyleConfig, CellStyleRule,
    ColumnStyleConfig, ColumnStyleRule, ConfigError, FormatError, Formatter, Grid, GridConfig,
    GridError, GridView, GroupBody, GroupLabel, GroupNode, GroupTree, PrintfTemplate, Renderer,
    RowMap, RowStyleConfig, RowStyleRule, RowView, calculate, parse_formatter,
    parse_formatter_options,
};
pub use dg_groupby::{CustomReducer, GroupByError, Reducer, parse_aggregate_options};
pub use dg_io::{
    AsciiRenderer, CsvRenderer, Dataset, HtmlRenderer, IoError, JsonRenderer, read_csv_reader,
    read_csv_str, renderer_by_name,
};
pub use dg_types::{DType, NullKind, Scalar, TypeError, UNAVAILABLE_TEXT};
