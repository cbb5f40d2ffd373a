//! Plain-text tables.
//!
//! Every fragment is buffered until `table`, because column widths depend on
//! all cells. Group summary rows are prefixed by a `name: value` caption, and
//! `|` markers in the left margin show how deep each row sits.

use dg_grid::{GridView, GroupLabel, Renderer};
use dg_types::Scalar;

const PADDING: &str = "   ";

#[derive(Debug, Clone)]
struct BufferedRow {
    cells: Vec<(String, usize)>,
    level: usize,
    caption: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AsciiRenderer {
    columns: Vec<String>,
    widths: Vec<usize>,
    levels: usize,
    current: Vec<(String, usize)>,
    rows: Vec<BufferedRow>,
    footer: Vec<(String, usize)>,
}

impl AsciiRenderer {
    fn width(&self, column: usize) -> usize {
        self.widths.get(column).copied().unwrap_or(0)
    }

    /// Left margin for a row at `level`; header and footer use `None`.
    fn indent(&self, level: Option<usize>) -> String {
        if self.levels == 0 {
            return String::new();
        }
        match level {
            Some(level) => {
                let markers = "|".repeat(self.levels.saturating_sub(level));
                format!("{markers:<width$} ", width = self.levels + 1)
            }
            None => " ".repeat(self.levels + 2),
        }
    }

    fn line_width(&self) -> usize {
        self.widths.iter().sum::<usize>() + self.widths.len() * PADDING.len()
    }

    fn cells(&self, cells: &[(String, usize)]) -> String {
        cells
            .iter()
            .map(|(text, column)| {
                let width = self.width(*column);
                if text.trim().parse::<f64>().is_ok() {
                    format!("{text:>width$}{PADDING}")
                } else {
                    format!("{text:<width$}{PADDING}")
                }
            })
            .collect()
    }

    fn heading(&self) -> String {
        let indent = self.indent(None);
        let heading: String = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| format!("{name:<width$}{PADDING}", width = self.width(idx)))
            .collect();
        let border = "=".repeat(self.line_width());
        format!("{indent}{heading}\n{indent}{border}\n")
    }

    fn body(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let cells = self.cells(&row.cells);
            if self.levels == 0 {
                out.push_str(&cells);
                out.push('\n');
                continue;
            }
            let indent = self.indent(Some(row.level));
            if let Some(caption) = row.caption.as_ref().filter(|_| row.level > 0) {
                out.push_str(&format!("{indent}{caption}\n"));
            }
            out.push_str(&format!("{indent}{cells}\n"));
        }
        out
    }

    fn footer(&self) -> String {
        let indent = self.indent(None);
        let border = "=".repeat(self.line_width());
        format!("{indent}{border}\n{indent}{}", self.cells(&self.footer))
    }
}

impl Renderer for AsciiRenderer {
    fn setup(&mut self, view: &GridView) {
        *self = Self {
            columns: view.columns().to_vec(),
            widths: view.columns().iter().map(|name| name.chars().count()).collect(),
            levels: view.depth(),
            ..Self::default()
        };
    }

    fn head(&mut self, _view: &GridView) -> String {
        String::new()
    }

    fn cell(&mut self, _view: &GridView, _style: &str, value: &Scalar, column: usize) -> String {
        let text = value.to_string();
        if let Some(width) = self.widths.get_mut(column) {
            *width = (*width).max(text.chars().count());
        }
        self.current.push((text, column));
        String::new()
    }

    fn row(
        &mut self,
        _view: &GridView,
        _style: &str,
        _cells: &str,
        level: usize,
        group: Option<GroupLabel<'_>>,
    ) -> String {
        self.rows.push(BufferedRow {
            cells: std::mem::take(&mut self.current),
            level,
            caption: group.map(|label| format!("{}: {}", label.name, label.value)),
        });
        String::new()
    }

    fn tail(&mut self, _view: &GridView, _cells: &str) -> String {
        self.footer = std::mem::take(&mut self.current);
        String::new()
    }

    fn table(&mut self, _view: &GridView, _head: &str, _body: &str, _tail: &str) -> String {
        format!("{}{}{}", self.heading(), self.body(), self.footer())
    }
}
