//! String-only grid description, suitable for JSON files and CLI options.

use std::collections::BTreeMap;

use dg_columns::SortKey;
use dg_groupby::{GroupByError, parse_aggregate_options};
use dg_types::Scalar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::{FormatError, parse_formatter_options};
use crate::{Grid, GridError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Aggregate(#[from] GroupByError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid sort direction {0:?}; expected \"asc\" or \"desc\"")]
    SortDirection(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedColumnConfig {
    pub name: String,
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStyleConfig {
    pub style: String,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStyleConfig {
    pub column: String,
    pub style: String,
    pub when: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStyleConfig {
    pub column: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

/// Declarative grid settings.
///
/// `aggregate` entries read `column|reducer` and `formatters` entries read
/// `column|format[|format..]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub calculated_columns: Vec<CalculatedColumnConfig>,
    pub groupby: Vec<String>,
    pub aggregate: Vec<String>,
    pub formatters: Vec<String>,
    pub sortby: Vec<SortKey>,
    pub columns: Vec<String>,
    pub filters: Vec<String>,
    pub post_aggregate_filters: Vec<String>,
    pub rowstyles: Vec<RowStyleConfig>,
    pub cellstyles: Vec<CellStyleConfig>,
    pub columnstyles: Vec<ColumnStyleConfig>,
    pub descriptions: BTreeMap<String, String>,
    pub suppressdetail: bool,
}

impl Grid {
    /// Build a grid over `data` from a [`GridConfig`], compiling every
    /// formula, reducer and formatter it names.
    pub fn from_config(
        data: Vec<Vec<Scalar>>,
        labels: Vec<String>,
        config: &GridConfig,
    ) -> Result<Self, GridError> {
        let mut grid = Self::new(data, labels).with_suppress_detail(config.suppressdetail);

        for calc in &config.calculated_columns {
            grid = grid.with_calculated_column(&calc.name, &calc.formula)?;
        }
        for column in &config.groupby {
            grid = grid.with_groupby(column.as_str());
        }
        for (column, reducer) in parse_aggregate_options(&config.aggregate)? {
            grid = grid.with_aggregate(column, reducer);
        }
        for (column, formatter) in parse_formatter_options(&config.formatters)? {
            grid = grid.with_formatter(column, formatter);
        }
        for key in &config.sortby {
            grid = grid.with_sortby(key.clone());
        }
        if !config.columns.is_empty() {
            grid = grid.with_columns(config.columns.iter().cloned());
        }
        for filter in &config.filters {
            grid = grid.with_filter(filter)?;
        }
        for filter in &config.post_aggregate_filters {
            grid = grid.with_post_aggregate_filter(filter)?;
        }
        for rule in &config.rowstyles {
            grid = grid.with_row_style(&rule.style, &rule.when)?;
        }
        for rule in &config.cellstyles {
            grid = grid.with_cell_style(&rule.column, &rule.style, &rule.when)?;
        }
        for rule in &config.columnstyles {
            grid = grid.with_column_style(&rule.column, &rule.style, rule.when.as_deref())?;
        }
        for (column, text) in &config.descriptions {
            grid = grid.with_description(column.as_str(), text.as_str());
        }
        Ok(grid)
    }
}
