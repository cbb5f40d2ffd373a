use dg_grid::{GridView, GroupLabel, Renderer};
use dg_types::Scalar;

/// HTML `<table>` output.
///
/// Grouped grids get a leading caption column: summary rows carry the group
/// name and value there, and every body row is tagged `l-{level}`.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    id: String,
    class: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            id: "datagrid".to_owned(),
            class: "datagrid".to_owned(),
        }
    }
}

impl HtmlRenderer {
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn class_attr(classes: &str) -> String {
    if classes.is_empty() {
        String::new()
    } else {
        format!(" class='{}'", escape(classes))
    }
}

impl Renderer for HtmlRenderer {
    fn head(&mut self, view: &GridView) -> String {
        let cells: String = view
            .columns()
            .iter()
            .map(|column| match view.description(column) {
                Some(title) => format!("<th title=\"{}\">{}</th>", escape(title), escape(column)),
                None => format!("<th>{}</th>", escape(column)),
            })
            .collect();
        let caption = if view.is_grouped() { "<th></th>" } else { "" };
        format!("<thead><tr>{caption}{cells}</tr></thead>")
    }

    fn cell(&mut self, _view: &GridView, style: &str, value: &Scalar, _column: usize) -> String {
        format!("<td{}>{}</td>", class_attr(style), escape(&value.to_string()))
    }

    fn row(
        &mut self,
        view: &GridView,
        style: &str,
        cells: &str,
        level: usize,
        group: Option<GroupLabel<'_>>,
    ) -> String {
        if !view.is_grouped() {
            return format!("<tr{}>{cells}</tr>", class_attr(style));
        }
        let classes = if style.is_empty() {
            format!("l-{level}")
        } else {
            format!("l-{level} {style}")
        };
        let caption = group
            .map(|label| {
                format!(
                    "<span>{}</span><span>{}</span>",
                    escape(label.name),
                    escape(&label.value.to_string())
                )
            })
            .unwrap_or_default();
        format!("<tr{}><td>{caption}</td>{cells}</tr>", class_attr(&classes))
    }

    fn tail(&mut self, view: &GridView, cells: &str) -> String {
        let caption = if view.is_grouped() { "<td></td>" } else { "" };
        format!("<tfoot><tr>{caption}{cells}</tr></tfoot>")
    }

    fn table(&mut self, view: &GridView, head: &str, body: &str, tail: &str) -> String {
        format!(
            "<table id='{}' class='{}' cols='{}'>{head}<tbody>{body}</tbody>{tail}</table>",
            escape(&self.id),
            escape(&self.class),
            view.columns().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use dg_grid::Grid;
    use dg_groupby::Reducer;
    use dg_types::Scalar;

    use super::{HtmlRenderer, escape};

    fn sample() -> Grid {
        Grid::new(
            vec![
                vec![Scalar::from("a&b"), Scalar::Int64(2)],
                vec![Scalar::from("<c>"), Scalar::Int64(5)],
            ],
            vec!["name".to_owned(), "qty".to_owned()],
        )
    }

    #[test]
    fn flat_table_escapes_values_and_titles_headers() {
        let output = sample()
            .with_description("qty", "Units \"sold\"")
            .render(&mut HtmlRenderer::default())
            .expect("render");
        assert_eq!(
            output,
            concat!(
                "<table id='datagrid' class='datagrid' cols='2'>",
                "<thead><tr><th>name</th><th title=\"Units &quot;sold&quot;\">qty</th></tr></thead>",
                "<tbody>",
                "<tr><td>a&amp;b</td><td>2</td></tr>",
                "<tr><td>&lt;c&gt;</td><td>5</td></tr>",
                "</tbody>",
                "<tfoot><tr><td></td><td></td></tr></tfoot>",
                "</table>",
            )
        );
    }

    #[test]
    fn grouped_rows_carry_level_classes_and_captions() {
        let grid = Grid::new(
            vec![vec![Scalar::from("east"), Scalar::Int64(3)]],
            vec!["region".to_owned(), "qty".to_owned()],
        )
        .with_groupby("region")
        .with_aggregate("qty", Reducer::Sum)
        .with_row_style("big", "{qty} > 1")
        .expect("style");
        let output = grid
            .render(&mut HtmlRenderer::default().with_id("sales"))
            .expect("render");

        assert!(output.starts_with("<table id='sales' class='datagrid' cols='2'>"));
        assert!(output.contains("<thead><tr><th></th><th>region</th><th>qty</th></tr></thead>"));
        assert!(output.contains(
            "<tr class='l-1 big'><td><span>region</span><span>east</span></td><td>east</td><td>3</td></tr>"
        ));
        assert!(output.contains("<tr class='l-0 big'><td></td><td>east</td><td>3</td></tr>"));
        assert!(output.contains("<tfoot><tr><td></td><td></td><td>3</td></tr></tfoot>"));
    }

    #[test]
    fn cell_styles_become_class_attributes() {
        let output = sample()
            .with_cell_style("qty", "warn", "{qty} > 4")
            .expect("style")
            .render(&mut HtmlRenderer::default())
            .expect("render");
        assert!(output.contains("<td class='warn'>5</td>"));
        assert!(output.contains("<td>2</td>"));
    }

    #[test]
    fn escape_handles_quotes() {
        assert_eq!(escape("it's \"x\""), "it&#39;s &quot;x&quot;");
    }
}
