//! Record-oriented outputs: one header record followed by one record per
//! rendered row. Neither format carries the footer.

use csv::WriterBuilder;
use dg_grid::{GridView, GroupLabel, Renderer};
use dg_types::Scalar;
use serde_json::{Number, Value};

/// Encode one CSV record, terminator included.
fn csv_record<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    // Writing into memory only fails on invalid UTF-8, which `String` fields rule out.
    if writer.write_record(fields).is_err() {
        return String::new();
    }
    writer
        .into_inner()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct CsvRenderer {
    current: Vec<String>,
}

impl Renderer for CsvRenderer {
    fn setup(&mut self, _view: &GridView) {
        self.current.clear();
    }

    fn head(&mut self, view: &GridView) -> String {
        csv_record(view.columns())
    }

    fn cell(&mut self, _view: &GridView, _style: &str, value: &Scalar, _column: usize) -> String {
        self.current.push(value.to_string());
        String::new()
    }

    fn row(
        &mut self,
        _view: &GridView,
        _style: &str,
        _cells: &str,
        _level: usize,
        _group: Option<GroupLabel<'_>>,
    ) -> String {
        csv_record(std::mem::take(&mut self.current))
    }

    fn tail(&mut self, _view: &GridView, _cells: &str) -> String {
        self.current.clear();
        String::new()
    }

    fn table(&mut self, _view: &GridView, head: &str, body: &str, tail: &str) -> String {
        format!("{head}{body}{tail}")
    }
}

/// JSON array whose first element lists the column names.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    current: Vec<Value>,
}

fn json_value(value: &Scalar) -> Value {
    match value {
        Scalar::Bool(v) => Value::Bool(*v),
        Scalar::Int64(v) => Value::from(*v),
        Scalar::Float64(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Scalar::Null(_) | Scalar::Utf8(_) => Value::String(value.to_string()),
    }
}

impl Renderer for JsonRenderer {
    fn setup(&mut self, _view: &GridView) {
        self.current.clear();
    }

    fn head(&mut self, view: &GridView) -> String {
        Value::from(view.columns().to_vec()).to_string()
    }

    fn cell(&mut self, _view: &GridView, _style: &str, value: &Scalar, _column: usize) -> String {
        self.current.push(json_value(value));
        String::new()
    }

    fn row(
        &mut self,
        _view: &GridView,
        _style: &str,
        _cells: &str,
        _level: usize,
        _group: Option<GroupLabel<'_>>,
    ) -> String {
        format!(",{}", Value::Array(std::mem::take(&mut self.current)))
    }

    fn tail(&mut self, _view: &GridView, _cells: &str) -> String {
        self.current.clear();
        String::new()
    }

    fn table(&mut self, _view: &GridView, head: &str, body: &str, _tail: &str) -> String {
        format!("[{head}{body}]")
    }
}

#[cfg(test)]
mod tests {
    use dg_grid::{Formatter, Grid};
    use dg_groupby::Reducer;
    use dg_types::Scalar;
    use serde_json::{Value, json};

    use super::{CsvRenderer, JsonRenderer};

    fn sample() -> Grid {
        Grid::new(
            vec![
                vec![Scalar::from("east, north"), Scalar::Int64(2), Scalar::Float64(0.5)],
                vec![Scalar::from("west"), Scalar::Int64(5), Scalar::blank()],
            ],
            vec!["region".to_owned(), "units".to_owned(), "share".to_owned()],
        )
    }

    #[test]
    fn csv_quotes_fields_and_drops_the_footer() {
        let output = sample()
            .with_aggregate("units", Reducer::Sum)
            .render(&mut CsvRenderer::default())
            .expect("render");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec!["region,units,share", "\"east, north\",2,0.5", "west,5,"]
        );
    }

    #[test]
    fn json_keeps_numbers_numeric() {
        let output = sample()
            .render(&mut JsonRenderer::default())
            .expect("render");
        let parsed: Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(
            parsed,
            json!([
                ["region", "units", "share"],
                ["east, north", 2, 0.5],
                ["west", 5, ""],
            ])
        );
    }

    #[test]
    fn json_emits_formatted_values_as_strings() {
        let output = sample()
            .with_formatter("share", Formatter::percent(0))
            .with_columns(["share"])
            .render(&mut JsonRenderer::default())
            .expect("render");
        let parsed: Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(parsed, json!([["share"], ["50%"], [""]]));
    }

    #[test]
    fn grouped_output_includes_summary_records() {
        let output = sample()
            .with_groupby("region")
            .with_aggregate("units", Reducer::Sum)
            .render(&mut JsonRenderer::default())
            .expect("render");
        let parsed: Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(parsed.as_array().map(Vec::len), Some(5));
    }
}
