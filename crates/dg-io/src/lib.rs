#![forbid(unsafe_code)]

pub mod ascii;
pub mod html;
pub mod records;

use std::io::Read;

use csv::ReaderBuilder;
use dg_grid::{Grid, Renderer};
use dg_types::Scalar;
use thiserror::Error;

pub use ascii::AsciiRenderer;
pub use html::HtmlRenderer;
pub use records::{CsvRenderer, JsonRenderer};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("unknown renderer {0:?}; expected ascii, html, csv or json")]
    UnknownRenderer(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Labels and typed rows read from a CSV source.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl Dataset {
    #[must_use]
    pub fn into_grid(self) -> Grid {
        Grid::new(self.rows, self.labels)
    }
}

pub fn read_csv_str(input: &str) -> Result<Dataset, IoError> {
    read_csv_reader(input.as_bytes())
}

/// Read a headed CSV source, inferring one type per column.
///
/// A column is numeric when every non-empty field is a plain decimal number;
/// its fields become `Int64` (or `Float64` when they carry a fraction or
/// overflow). Empty fields become the blank placeholder in every column.
pub fn read_csv_reader<R: Read>(source: R) -> Result<Dataset, IoError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(source);

    let headers = reader.headers().cloned()?;
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }
    let labels: Vec<String> = headers.iter().map(str::to_owned).collect();

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }

    let numeric: Vec<bool> = (0..labels.len())
        .map(|idx| {
            records
                .iter()
                .filter_map(|record| record.get(idx))
                .filter(|field| !field.trim().is_empty())
                .all(is_decimal)
        })
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            record
                .iter()
                .enumerate()
                .map(|(idx, field)| parse_field(field, numeric.get(idx).copied().unwrap_or(false)))
                .collect()
        })
        .collect();

    Ok(Dataset { labels, rows })
}

/// Digits with at most one decimal point and an optional leading minus.
fn is_decimal(field: &str) -> bool {
    let trimmed = field.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    digits.chars().filter(|ch| *ch == '.').count() <= 1
        && digits.chars().any(|ch| ch.is_ascii_digit())
        && digits.chars().all(|ch| ch.is_ascii_digit() || ch == '.')
}

fn parse_field(field: &str, numeric: bool) -> Scalar {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Scalar::blank();
    }
    if !numeric {
        return Scalar::Utf8(field.to_owned());
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Scalar::Int64(value);
    }
    trimmed
        .parse::<f64>()
        .map_or_else(|_| Scalar::Utf8(field.to_owned()), Scalar::Float64)
}

/// Look up a renderer by its command-line name.
pub fn renderer_by_name(name: &str) -> Result<Box<dyn Renderer>, IoError> {
    match name.to_ascii_lowercase().as_str() {
        "ascii" | "text" => Ok(Box::new(AsciiRenderer::default())),
        "html" => Ok(Box::new(HtmlRenderer::default())),
        "csv" => Ok(Box::new(CsvRenderer::default())),
        "json" => Ok(Box::new(JsonRenderer::default())),
        _ => Err(IoError::UnknownRenderer(name.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use dg_types::Scalar;

    use super::{IoError, read_csv_str, renderer_by_name};

    #[test]
    fn numeric_columns_are_typed_and_text_columns_kept() {
        let dataset = read_csv_str("region,units,price\neast,3,1.50\nwest,,2\n").expect("read");
        assert_eq!(dataset.labels, vec!["region", "units", "price"]);
        assert_eq!(
            dataset.rows,
            vec![
                vec![Scalar::from("east"), Scalar::Int64(3), Scalar::Float64(1.5)],
                vec![Scalar::from("west"), Scalar::blank(), Scalar::Int64(2)],
            ]
        );
    }

    #[test]
    fn one_non_numeric_field_makes_the_column_text() {
        let dataset = read_csv_str("code\n1\n2.0.0\n-4\n").expect("read");
        assert_eq!(
            dataset.rows,
            vec![
                vec![Scalar::from("1")],
                vec![Scalar::from("2.0.0")],
                vec![Scalar::from("-4")],
            ]
        );
    }

    #[test]
    fn negative_numbers_and_overflow_stay_numeric() {
        let dataset = read_csv_str("v\n-4\n99999999999999999999\n").expect("read");
        assert_eq!(dataset.rows[0][0], Scalar::Int64(-4));
        assert_eq!(dataset.rows[1][0], Scalar::Float64(1e20));
    }

    #[test]
    fn dataset_converts_into_a_grid() {
        let grid = read_csv_str("a,b\n1,2\n").expect("read").into_grid();
        assert_eq!(grid.labels(), &["a".to_owned(), "b".to_owned()][..]);
        assert_eq!(grid.data().len(), 1);
    }

    #[test]
    fn empty_input_has_no_headers() {
        assert!(matches!(read_csv_str(""), Err(IoError::MissingHeaders)));
    }

    #[test]
    fn renderers_are_found_by_name() {
        for name in ["ascii", "HTML", "csv", "json"] {
            assert!(renderer_by_name(name).is_ok(), "{name}");
        }
        assert!(matches!(
            renderer_by_name("xml"),
            Err(IoError::UnknownRenderer(name)) if name == "xml"
        ));
    }
}
