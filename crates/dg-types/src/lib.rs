#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Bool,
    Int64,
    Float64,
    Utf8,
}

/// The two kinds of "no value" a grid cell can hold.
///
/// `Blank` is the empty placeholder used for summary cells without a reducer
/// and for empty input fields; reducers and formatters skip it. `Unavailable`
/// is the sentinel produced when a calculated column cannot be evaluated for
/// a row; it renders as `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKind {
    Blank,
    Unavailable,
}

pub const UNAVAILABLE_TEXT: &str = "--";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Null(NullKind),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Scalar {
    #[must_use]
    pub const fn blank() -> Self {
        Self::Null(NullKind::Blank)
    }

    #[must_use]
    pub const fn unavailable() -> Self {
        Self::Null(NullKind::Unavailable)
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null(_) => DType::Null,
            Self::Bool(_) => DType::Bool,
            Self::Int64(_) => DType::Int64,
            Self::Float64(_) => DType::Float64,
            Self::Utf8(_) => DType::Utf8,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Null(NullKind::Blank))
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Null(NullKind::Unavailable))
    }

    /// True for both the blank placeholder and the `--` sentinel.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64(_) | Self::Float64(_))
    }

    /// Truthiness used by predicate formulas: zero, empty strings and missing
    /// values are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null(_) => false,
            Self::Bool(v) => *v,
            Self::Int64(v) => *v != 0,
            Self::Float64(v) => *v != 0.0 && !v.is_nan(),
            Self::Utf8(v) => !v.is_empty(),
        }
    }

    /// Numeric coercion used by numeric formulas and reducers.
    ///
    /// Text is parsed after trimming; the blank placeholder and the `--`
    /// sentinel are rejected.
    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Int64(v) => Ok(*v as f64),
            Self::Float64(v) => Ok(*v),
            Self::Null(kind) => Err(TypeError::ValueIsMissing { kind: *kind }),
            Self::Utf8(v) => v
                .trim()
                .parse::<f64>()
                .map_err(|_| TypeError::NonNumericValue {
                    value: v.clone(),
                    dtype: DType::Utf8,
                }),
        }
    }

    /// Total order used for grouping: values that compare `Equal` belong to
    /// the same group.
    ///
    /// Missing values sort first (blank before `--`), then booleans, then
    /// numbers (integers and floats compared by value, NaN last), then text.
    #[must_use]
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            _ => self.cmp_non_text(other),
        }
    }

    /// Order used by sort keys: like [`Scalar::natural_cmp`] but text is
    /// compared lower-cased.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Utf8(a), Self::Utf8(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            _ => self.cmp_non_text(other),
        }
    }

    fn cmp_non_text(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null(a), Self::Null(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (left, right) if left.is_numeric() && right.is_numeric() => {
                let lhs = left.to_f64().unwrap_or(f64::NAN);
                let rhs = right.to_f64().unwrap_or(f64::NAN);
                match (lhs.is_nan(), rhs.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => lhs.partial_cmp(&rhs).unwrap_or(Ordering::Equal),
                }
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null(NullKind::Blank) => 0,
            Self::Null(NullKind::Unavailable) => 1,
            Self::Bool(_) => 2,
            Self::Int64(_) | Self::Float64(_) => 3,
            Self::Utf8(_) => 4,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(NullKind::Blank) => Ok(()),
            Self::Null(NullKind::Unavailable) => f.write_str(UNAVAILABLE_TEXT),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            // Whole floats keep a trailing `.0` so `5.0` stays distinguishable from `5`.
            Self::Float64(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int64(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("value {value:?} has non-numeric dtype {dtype:?}")]
    NonNumericValue { value: String, dtype: DType },
    #[error("value is missing ({kind:?})")]
    ValueIsMissing { kind: NullKind },
}
