//! The resolved, filtered and sorted group hierarchy, built before any
//! renderer is called.

use dg_columns::{ColumnSet, ResolvedSortKey};
use dg_expr::Formula;
use dg_groupby::{Reducer, aggregate_summary, partition};
use dg_types::Scalar;

use crate::GridError;
use crate::calc::{Calculations, RowMap, calculate};
use crate::filter::{RowView, group_matches, row_matches};
use crate::sort::sort_by_keys;

/// Root of a built grid: the footer summary and the top-level body.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTree {
    pub summary: Vec<Scalar>,
    pub body: GroupBody,
}

/// Contents below a summary row.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupBody {
    Groups(Vec<GroupNode>),
    /// Leaf rows, each spanning every column (raw then calculated).
    Rows(Vec<Vec<Scalar>>),
    Suppressed,
}

impl GroupBody {
    /// Leaf rows in render order, across all nested groups.
    #[must_use]
    pub fn leaf_rows(&self) -> Vec<&[Scalar]> {
        match self {
            Self::Groups(nodes) => nodes
                .iter()
                .flat_map(|node| node.body.leaf_rows())
                .collect(),
            Self::Rows(rows) => rows.iter().map(Vec::as_slice).collect(),
            Self::Suppressed => Vec::new(),
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[GroupNode] {
        match self {
            Self::Groups(nodes) => nodes,
            _ => &[],
        }
    }
}

/// Rows sharing one value of a group-by column.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    /// Name of the group-by column.
    pub name: String,
    pub key: Scalar,
    pub summary: Vec<Scalar>,
    /// Remaining group depth, as passed to the renderer.
    pub level: usize,
    pub body: GroupBody,
}

pub(crate) struct TreeBuilder<'a> {
    pub columns: &'a ColumnSet,
    pub calculations: &'a Calculations,
    pub groupby: &'a [usize],
    pub aggregates: &'a [(usize, Reducer)],
    pub post_filters: &'a [Formula],
    pub sort_keys: &'a [ResolvedSortKey],
    pub suppress_detail: bool,
}

impl TreeBuilder<'_> {
    /// Extend a raw row with its calculated columns.
    pub fn resolve_row(&self, raw: &[Scalar]) -> Result<Vec<Scalar>, GridError> {
        let mut row: RowMap = self
            .columns
            .raw_names()
            .iter()
            .cloned()
            .zip(raw.iter().cloned())
            .collect();
        calculate(&mut row, self.calculations)?;

        let mut resolved = raw.to_vec();
        resolved.extend(
            self.columns
                .calculated_names()
                .iter()
                .map(|name| row.remove(name).unwrap_or_else(Scalar::unavailable)),
        );
        Ok(resolved)
    }

    pub fn build(&self, rows: &[Vec<Scalar>]) -> Result<GroupTree, GridError> {
        let members: Vec<&[Scalar]> = rows.iter().map(Vec::as_slice).collect();
        let template = vec![Scalar::blank(); self.columns.len()];
        let summary = self.summarize(template.clone(), &members)?;
        let body = self.body(&members, &template, 0)?;
        Ok(GroupTree { summary, body })
    }

    fn is_aggregated(&self, column: usize) -> bool {
        self.aggregates.iter().any(|(idx, _)| *idx == column)
    }

    /// Reduce `members` into `template`, then recompute the calculated
    /// columns that have no reducer of their own.
    fn summarize(
        &self,
        template: Vec<Scalar>,
        members: &[&[Scalar]],
    ) -> Result<Vec<Scalar>, GridError> {
        let mut summary = aggregate_summary(template, members, self.aggregates);

        let mut row = RowMap::new();
        for (idx, name) in self.columns.names().iter().enumerate() {
            if !self.columns.is_calculated(idx) || self.is_aggregated(idx) {
                row.insert(name.clone(), summary[idx].clone());
            }
        }
        calculate(&mut row, self.calculations)?;

        for idx in self.columns.raw_count()..self.columns.len() {
            if self.is_aggregated(idx) {
                continue;
            }
            if let Some(value) = self.columns.name(idx).and_then(|name| row.remove(name)) {
                summary[idx] = value;
            }
        }
        Ok(summary)
    }

    fn body(
        &self,
        members: &[&[Scalar]],
        template: &[Scalar],
        depth: usize,
    ) -> Result<GroupBody, GridError> {
        let Some(&column) = self.groupby.get(depth) else {
            return Ok(self.leaves(members));
        };

        let remaining = self.groupby.len() - depth;
        let level = remaining - usize::from(self.suppress_detail);
        let name = self.columns.name(column).unwrap_or_default().to_owned();

        let mut nodes = Vec::new();
        for part in partition(members, column) {
            let group: Vec<&[Scalar]> = part.members.iter().map(|&pos| members[pos]).collect();
            let views: Vec<RowView<'_>> = group
                .iter()
                .map(|row| RowView::new(self.columns, row))
                .collect();
            if !group_matches(self.post_filters, &views) {
                continue;
            }

            let mut template = template.to_vec();
            template[column] = part.key.clone();
            let summary = self.summarize(template.clone(), &group)?;
            let body = if level > 0 {
                self.body(&group, &template, depth + 1)?
            } else {
                GroupBody::Suppressed
            };

            nodes.push(GroupNode {
                name: name.clone(),
                key: part.key,
                summary,
                level,
                body,
            });
        }

        sort_by_keys(&mut nodes, self.sort_keys, |node| node.summary.as_slice());
        Ok(GroupBody::Groups(nodes))
    }

    fn leaves(&self, members: &[&[Scalar]]) -> GroupBody {
        if self.suppress_detail {
            return GroupBody::Suppressed;
        }
        let mut rows: Vec<Vec<Scalar>> = members
            .iter()
            .filter(|row| row_matches(self.post_filters, &RowView::new(self.columns, row)))
            .map(|row| row.to_vec())
            .collect();
        sort_by_keys(&mut rows, self.sort_keys, Vec::as_slice);
        GroupBody::Rows(rows)
    }
}
