#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("column does not exist: {0:?}")]
    ColumnNotFound(String),
    #[error("column is defined more than once: {0:?}")]
    DuplicateColumn(String),
    #[error("invalid sort direction {0:?}; expected \"asc\" or \"desc\"")]
    InvalidSortDirection(String),
}

/// Spreadsheet-style name for a zero-based column position: `A`..`Z`, `AA`..
#[must_use]
pub fn spreadsheet_name(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Raw labels followed by calculated column names, with a name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    names: Vec<String>,
    raw_count: usize,
    positions: HashMap<String, usize>,
}

impl ColumnSet {
    /// Build the column set for rows of `row_width` cells.
    ///
    /// Positions not covered by `labels` get spreadsheet names; user labels
    /// are kept as given.
    pub fn resolve(
        labels: &[String],
        calculated: &[String],
        row_width: usize,
    ) -> Result<Self, ColumnError> {
        let raw_count = labels.len().max(row_width);
        let mut names = Vec::with_capacity(raw_count + calculated.len());
        names.extend(labels.iter().cloned());
        names.extend((labels.len()..raw_count).map(spreadsheet_name));
        names.extend(calculated.iter().cloned());

        let mut positions = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(ColumnError::DuplicateColumn(name.clone()));
            }
        }

        Ok(Self {
            names,
            raw_count,
            positions,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn raw_names(&self) -> &[String] {
        &self.names[..self.raw_count]
    }

    #[must_use]
    pub fn calculated_names(&self) -> &[String] {
        &self.names[self.raw_count..]
    }

    #[must_use]
    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    #[must_use]
    pub fn is_calculated(&self, index: usize) -> bool {
        index >= self.raw_count && index < self.names.len()
    }

    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn index_of(&self, name: &str) -> Result<usize, ColumnError> {
        self.position(name)
            .ok_or_else(|| ColumnError::ColumnNotFound(name.to_owned()))
    }

    /// Like [`ColumnSet::index_of`], but only raw columns qualify.
    pub fn raw_index_of(&self, name: &str) -> Result<usize, ColumnError> {
        match self.position(name) {
            Some(idx) if idx < self.raw_count => Ok(idx),
            _ => Err(ColumnError::ColumnNotFound(name.to_owned())),
        }
    }

    pub fn indices_of<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, ColumnError> {
        names.iter().map(|name| self.index_of(name.as_ref())).collect()
    }

    /// Indices of the displayed columns; an empty projection shows everything.
    pub fn display_indices<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<usize>, ColumnError> {
        if columns.is_empty() {
            return Ok((0..self.names.len()).collect());
        }
        self.indices_of(columns)
    }

    pub fn resolve_sort_keys(&self, keys: &[SortKey]) -> Result<Vec<ResolvedSortKey>, ColumnError> {
        keys.iter()
            .map(|key| {
                Ok(ResolvedSortKey {
                    index: self.index_of(&key.column)?,
                    direction: key.direction,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ColumnError::InvalidSortDirection(s.to_owned())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// One `sortby` entry. Deserializes from a bare column name (ascending), a
/// `[name, direction]` pair, or `{ "column": .., "direction": .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SortKeyRepr")]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Desc)
    }
}

impl From<&str> for SortKey {
    fn from(column: &str) -> Self {
        Self::asc(column)
    }
}

impl From<(&str, SortDirection)> for SortKey {
    fn from((column, direction): (&str, SortDirection)) -> Self {
        Self::new(column, direction)
    }
}

/// Parses `name` or `name:asc` / `name:desc`.
impl FromStr for SortKey {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((column, direction)) = s.rsplit_once(':') {
            if let Ok(direction) = direction.parse::<SortDirection>() {
                return Ok(Self::new(column, direction));
            }
        }
        Ok(Self::asc(s))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SortKeyRepr {
    Name(String),
    Pair(String, SortDirection),
    Full {
        column: String,
        #[serde(default)]
        direction: SortDirection,
    },
}

impl From<SortKeyRepr> for SortKey {
    fn from(repr: SortKeyRepr) -> Self {
        match repr {
            SortKeyRepr::Name(column) => Self::asc(column),
            SortKeyRepr::Pair(column, direction) | SortKeyRepr::Full { column, direction } => {
                Self::new(column, direction)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSortKey {
    pub index: usize,
    pub direction: SortDirection,
}
