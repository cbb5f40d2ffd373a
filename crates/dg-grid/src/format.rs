//! Cell formatters: printf-style templates, `percent`, and `|` pipelines.

use std::fmt;
use std::sync::Arc;

use dg_types::Scalar;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown formatter {0:?}")]
    UnknownFormatter(String),
    #[error("invalid format option {0:?}; expected \"column|format[|format..]\"")]
    InvalidOption(String),
    #[error("invalid format template {0:?}")]
    InvalidTemplate(String),
    #[error("value {0:?} is not numeric")]
    NotNumeric(String),
}

const CONVERSION_PATTERN: &str = r"%([-+ 0,#]*)(\d+)?(?:\.(\d+))?([sdifFeExXo%])";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    grouping: bool,
    alternate: bool,
}

impl Flags {
    fn parse(text: &str) -> Self {
        let mut flags = Self::default();
        for ch in text.chars() {
            match ch {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '0' => flags.zero = true,
                ',' => flags.grouping = true,
                '#' => flags.alternate = true,
                _ => {}
            }
        }
        flags
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Conversion {
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    kind: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Conversion(Conversion),
}

/// A parsed printf-style template such as `%.1f`, `%05.2f` or `$%,d each`.
///
/// Every conversion in the template formats the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintfTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PrintfTemplate {
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let pattern = Regex::new(CONVERSION_PATTERN)
            .map_err(|_| FormatError::InvalidTemplate(template.to_owned()))?;
        let invalid = || FormatError::InvalidTemplate(template.to_owned());

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in pattern.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            let text = &template[last..whole.start()];
            if text.contains('%') {
                return Err(invalid());
            }
            if !text.is_empty() {
                segments.push(Segment::Text(text.to_owned()));
            }

            let kind = caps
                .get(4)
                .and_then(|m| m.as_str().chars().next())
                .ok_or_else(invalid)?;
            if kind == '%' {
                segments.push(Segment::Text("%".to_owned()));
            } else {
                let count = |idx: usize| -> Result<Option<usize>, FormatError> {
                    caps.get(idx)
                        .map(|m| m.as_str().parse::<usize>().map_err(|_| invalid()))
                        .transpose()
                };
                segments.push(Segment::Conversion(Conversion {
                    flags: Flags::parse(caps.get(1).map_or("", |m| m.as_str())),
                    width: count(2)?,
                    precision: count(3)?,
                    kind,
                }));
            }
            last = whole.end();
        }

        let rest = &template[last..];
        if rest.contains('%') {
            return Err(invalid());
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_owned()));
        }

        Ok(Self {
            source: template.to_owned(),
            segments,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn apply(&self, value: &Scalar) -> Result<String, FormatError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Conversion(conversion) => out.push_str(&convert(conversion, value)?),
            }
        }
        Ok(out)
    }
}

fn number(value: &Scalar) -> Result<f64, FormatError> {
    value
        .to_f64()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FormatError::NotNumeric(value.to_string()))
}

/// Sign and magnitude digits of the integral part of `value`.
fn integer_parts(value: &Scalar) -> Result<(bool, u128), FormatError> {
    match value {
        Scalar::Int64(v) => Ok((*v < 0, u128::from(v.unsigned_abs()))),
        other => {
            let v = number(other)?.trunc();
            Ok((v < 0.0, v.abs() as u128))
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let (int_part, frac_part) = match digits.find('.') {
        Some(pos) => digits.split_at(pos),
        None => (digits, ""),
    };
    let capacity = int_part.len() + int_part.len() / 3 + frac_part.len();
    let mut grouped = String::with_capacity(capacity);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push_str(frac_part);
    grouped
}

fn exponent_form(value: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{value:.precision$e}");
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{mantissa}{marker}{sign}{:02}", exponent.unsigned_abs())
}

fn convert(conversion: &Conversion, value: &Scalar) -> Result<String, FormatError> {
    let flags = conversion.flags;

    if conversion.kind == 's' {
        let mut text = value.to_string();
        if let Some(precision) = conversion.precision {
            text = text.chars().take(precision).collect();
        }
        return Ok(pad(String::new(), text, conversion.width, flags.left, false));
    }

    let (negative, mut digits) = match conversion.kind {
        'd' | 'i' => {
            let (negative, magnitude) = integer_parts(value)?;
            (negative && magnitude != 0, magnitude.to_string())
        }
        'f' | 'F' => {
            let v = number(value)?;
            let precision = conversion.precision.unwrap_or(6);
            (v < 0.0, format!("{:.precision$}", v.abs()))
        }
        'e' | 'E' => {
            let v = number(value)?;
            let precision = conversion.precision.unwrap_or(6);
            (v < 0.0, exponent_form(v.abs(), precision, conversion.kind == 'E'))
        }
        'x' | 'X' | 'o' => {
            let (negative, magnitude) = integer_parts(value)?;
            let body = match conversion.kind {
                'x' => format!("{magnitude:x}"),
                'X' => format!("{magnitude:X}"),
                _ => format!("{magnitude:o}"),
            };
            let prefix = match (flags.alternate, conversion.kind) {
                (false, _) => "",
                (true, 'x') => "0x",
                (true, 'X') => "0X",
                (true, _) => "0o",
            };
            (negative && magnitude != 0, format!("{prefix}{body}"))
        }
        other => return Err(FormatError::InvalidTemplate(format!("%{other}"))),
    };

    if flags.grouping && matches!(conversion.kind, 'd' | 'i' | 'f' | 'F') {
        digits = group_thousands(&digits);
    }

    let sign = if negative {
        "-"
    } else if flags.plus {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    };

    Ok(pad(
        sign.to_owned(),
        digits,
        conversion.width,
        flags.left,
        flags.zero,
    ))
}

fn pad(sign: String, body: String, width: Option<usize>, left: bool, zero: bool) -> String {
    let len = sign.chars().count() + body.chars().count();
    let fill = width.unwrap_or(0).saturating_sub(len);
    if fill == 0 {
        return sign + &body;
    }
    if left {
        format!("{sign}{body}{}", " ".repeat(fill))
    } else if zero {
        format!("{sign}{}{body}", "0".repeat(fill))
    } else {
        format!("{}{sign}{body}", " ".repeat(fill))
    }
}

type FormatFn = dyn Fn(&Scalar) -> Result<String, FormatError> + Send + Sync;

/// Turns a cell value into display text.
///
/// Blank placeholders and the `--` sentinel are never passed to the
/// underlying function. A value the formatter cannot interpret renders as
/// `--`.
pub struct Formatter {
    name: String,
    func: Arc<FormatFn>,
}

impl Formatter {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Scalar) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(move |value| Ok(func(value))),
        }
    }

    fn fallible(
        name: impl Into<String>,
        func: impl Fn(&Scalar) -> Result<String, FormatError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// `0.125` -> `12%` (precision 0) or `12.50%` (precision 2).
    #[must_use]
    pub fn percent(precision: usize) -> Self {
        let name = if precision == 0 {
            "percent".to_owned()
        } else {
            format!("percent{precision}")
        };
        Self::fallible(name, move |value| {
            let v = number(value)?;
            Ok(format!("{:.precision$}%", 100.0 * v))
        })
    }

    pub fn printf(template: &str) -> Result<Self, FormatError> {
        let template = PrintfTemplate::parse(template)?;
        Ok(Self::fallible(template.source().to_owned(), move |value| {
            template.apply(value)
        }))
    }

    /// Look up a formatter from the built-in library by name.
    pub fn named(name: &str) -> Result<Self, FormatError> {
        let unknown = || FormatError::UnknownFormatter(name.to_owned());
        let precision = name.strip_prefix("percent").ok_or_else(unknown)?;
        if precision.is_empty() {
            return Ok(Self::percent(0));
        }
        precision
            .parse::<usize>()
            .map(Self::percent)
            .map_err(|_| unknown())
    }

    /// Feed this formatter's output into `next`.
    #[must_use]
    pub fn then(self, next: Formatter) -> Self {
        let name = format!("{}|{}", self.name, next.name);
        let first = self.func;
        let second = next.func;
        Self::fallible(name, move |value| {
            let text = first(value)?;
            second(&Scalar::Utf8(text))
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn try_format(&self, value: &Scalar) -> Result<String, FormatError> {
        (self.func)(value)
    }

    #[must_use]
    pub fn format(&self, value: &Scalar) -> Scalar {
        if value.is_missing() {
            return value.clone();
        }
        match self.try_format(value) {
            Ok(text) => Scalar::Utf8(text),
            Err(_) => Scalar::unavailable(),
        }
    }
}

impl Clone for Formatter {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Formatter({:?})", self.name)
    }
}

fn parse_step(step: &str) -> Result<Formatter, FormatError> {
    let step = step.trim();
    if step.starts_with('%') {
        return Formatter::printf(step);
    }
    for quote in ['"', '\''] {
        if step.len() >= 2 && step.starts_with(quote) && step.ends_with(quote) {
            return Formatter::printf(&step[1..step.len() - 1]);
        }
    }
    Formatter::named(step)
}

/// Parse a `|`-separated pipeline such as `%.0f|percent`.
pub fn parse_formatter(pipeline: &str) -> Result<Formatter, FormatError> {
    let mut steps = pipeline.split('|');
    let first = steps
        .next()
        .filter(|step| !step.trim().is_empty())
        .ok_or_else(|| FormatError::UnknownFormatter(pipeline.to_owned()))?;
    steps.try_fold(parse_step(first)?, |acc, step| Ok(acc.then(parse_step(step)?)))
}

/// Parse `column|format[|format..]` options into a column -> formatter list.
pub fn parse_formatter_options<S: AsRef<str>>(
    options: &[S],
) -> Result<Vec<(String, Formatter)>, FormatError> {
    options
        .iter()
        .map(|option| {
            let option = option.as_ref();
            let (column, pipeline) = option
                .split_once('|')
                .filter(|(column, pipeline)| !column.is_empty() && !pipeline.is_empty())
                .ok_or_else(|| FormatError::InvalidOption(option.to_owned()))?;
            Ok((column.to_owned(), parse_formatter(pipeline)?))
        })
        .collect()
}
