//! Calculated columns: a readiness-driven worklist over formulas and callables.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dg_expr::{Bindings, EvalError, ExprError, Formula};
use dg_types::Scalar;

use crate::GridError;

/// Working values of one row, keyed by column name.
pub type RowMap = BTreeMap<String, Scalar>;

/// A prebuilt calculation over a row mapping.
pub struct CalcFn(Arc<dyn Fn(&RowMap) -> Result<Scalar, EvalError> + Send + Sync>);

impl CalcFn {
    pub fn new(f: impl Fn(&RowMap) -> Result<Scalar, EvalError> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, row: &RowMap) -> Result<Scalar, EvalError> {
        self.0(row)
    }
}

impl Clone for CalcFn {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl fmt::Debug for CalcFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalcFn(...)")
    }
}

/// How a calculated column derives its value.
#[derive(Debug, Clone)]
pub enum Calculation {
    /// A `{column}` template evaluated in numeric mode.
    Formula(Formula),
    /// A callable with declared dependencies. It may still report
    /// [`EvalError::MissingColumn`] at run time, which keeps it pending.
    Function {
        dependencies: Vec<String>,
        func: CalcFn,
    },
}

impl Calculation {
    pub fn formula(source: &str) -> Result<Self, ExprError> {
        Formula::numeric(source).map(Self::Formula)
    }

    pub fn function<S: Into<String>>(
        dependencies: impl IntoIterator<Item = S>,
        f: impl Fn(&RowMap) -> Result<Scalar, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self::Function {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            func: CalcFn::new(f),
        }
    }

    /// Column names this calculation reads.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Self::Formula(formula) => formula.references().iter().map(String::as_str).collect(),
            Self::Function { dependencies, .. } => {
                dependencies.iter().map(String::as_str).collect()
            }
        }
    }

    fn is_ready(&self, row: &RowMap) -> bool {
        match self {
            Self::Formula(formula) => formula.is_ready(row),
            Self::Function { dependencies, .. } => {
                dependencies.iter().all(|name| row.contains(name))
            }
        }
    }

    fn evaluate(&self, row: &RowMap) -> Result<Scalar, EvalError> {
        match self {
            Self::Formula(formula) => formula.evaluate(row),
            Self::Function { func, .. } => func.call(row),
        }
    }
}

/// Calculated columns in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Calculations {
    entries: Vec<(String, Calculation)>,
}

impl Calculations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the calculation for `name`. A replaced entry keeps its
    /// original position.
    pub fn insert(&mut self, name: impl Into<String>, calculation: Calculation) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = calculation,
            None => self.entries.push((name, calculation)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Calculation> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, calculation)| calculation)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Calculation)> {
        self.entries.iter().map(|(name, calc)| (name.as_str(), calc))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum Outcome {
    Value(Scalar),
    Pending,
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn run_one(name: &str, calculation: &Calculation, row: &RowMap) -> Outcome {
    match calculation.evaluate(row) {
        Ok(value) => Outcome::Value(value),
        Err(EvalError::DivisionByZero) => Outcome::Value(Scalar::Int64(0)),
        Err(EvalError::MissingColumn(_)) => Outcome::Pending,
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(column = name, error = %err, "calculated value unavailable");
            Outcome::Value(Scalar::unavailable())
        }
    }
}

/// Resolve every calculation into `row`.
///
/// Calculations whose column is already bound are left as they are. Each
/// pass evaluates the ready calculations; a pass that resolves nothing while
/// some remain fails with [`GridError::CalculationUnresolvable`].
pub fn calculate(row: &mut RowMap, calculations: &Calculations) -> Result<(), GridError> {
    let mut pending: Vec<(&str, &Calculation)> = calculations
        .iter()
        .filter(|(name, _)| !row.contains_key(*name))
        .collect();

    while !pending.is_empty() {
        let before = pending.len();
        let mut still_pending = Vec::with_capacity(before);
        for (name, calculation) in pending {
            if !calculation.is_ready(row) {
                still_pending.push((name, calculation));
                continue;
            }
            match run_one(name, calculation, row) {
                Outcome::Value(value) => {
                    row.insert(name.to_owned(), value);
                }
                Outcome::Pending => still_pending.push((name, calculation)),
            }
        }

        if still_pending.len() == before {
            return Err(GridError::CalculationUnresolvable {
                pending: still_pending.iter().map(|(name, _)| (*name).to_owned()).collect(),
            });
        }
        pending = still_pending;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use dg_expr::EvalError;
    use dg_types::Scalar;

    use super::{Calculation, Calculations, RowMap, calculate};
    use crate::GridError;

    fn row(values: &[(&str, Scalar)]) -> RowMap {
        values
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect()
    }

    fn formula(source: &str) -> Calculation {
        Calculation::formula(source).expect("formula")
    }

    #[test]
    fn constant_callable_is_added_to_row() {
        let mut calcs = Calculations::new();
        calcs.insert(
            "c",
            Calculation::function(Vec::<String>::new(), |_| Ok(Scalar::Int64(3))),
        );
        let mut data = row(&[("a", Scalar::Int64(1)), ("b", Scalar::Int64(2))]);
        calculate(&mut data, &calcs).expect("calculate");
        assert_eq!(data.get("c"), Some(&Scalar::Int64(3)));
        assert_eq!(data.len(), 3);
        assert_eq!(calcs.len(), 1);
    }

    #[test]
    fn chained_formulas_resolve_in_any_declaration_order() {
        let mut calcs = Calculations::new();
        calcs.insert("d", formula("{c} * 2"));
        calcs.insert("c", formula("{a} + {b}"));
        let mut data = row(&[("a", Scalar::Int64(1)), ("b", Scalar::Int64(2))]);
        calculate(&mut data, &calcs).expect("calculate");
        assert_eq!(data.get("c"), Some(&Scalar::Float64(3.0)));
        assert_eq!(data.get("d"), Some(&Scalar::Float64(6.0)));
    }

    #[test]
    fn bad_input_becomes_unavailable_and_zero_division_becomes_zero() {
        let mut calcs = Calculations::new();
        calcs.insert("ratio", formula("{a} / {b}"));
        calcs.insert("text", formula("{name} + 1"));
        let mut data = row(&[
            ("a", Scalar::Int64(4)),
            ("b", Scalar::Int64(0)),
            ("name", Scalar::from("north")),
        ]);
        calculate(&mut data, &calcs).expect("calculate");
        assert_eq!(data.get("ratio"), Some(&Scalar::Int64(0)));
        assert!(data.get("text").expect("text").is_unavailable());
    }

    #[test]
    fn blank_placeholders_are_invalid_numeric_input() {
        let mut calcs = Calculations::new();
        calcs.insert("four", formula("{two} + {three}"));
        let mut data = row(&[("two", Scalar::blank()), ("three", Scalar::blank())]);
        calculate(&mut data, &calcs).expect("calculate");
        assert!(data.get("four").expect("four").is_unavailable());
    }

    #[test]
    fn unsatisfiable_dependency_is_reported() {
        let mut calcs = Calculations::new();
        calcs.insert("x", formula("{nope} + 1"));
        let mut data = row(&[("a", Scalar::Int64(1))]);
        let err = calculate(&mut data, &calcs).expect_err("must fail");
        assert!(matches!(
            err,
            GridError::CalculationUnresolvable { ref pending } if pending == &["x".to_owned()]
        ));
    }

    #[test]
    fn cyclic_formulas_terminate_with_failure() {
        let mut calcs = Calculations::new();
        calcs.insert("x", formula("{y} + 1"));
        calcs.insert("y", formula("{x} + 1"));
        let mut data = RowMap::new();
        let err = calculate(&mut data, &calcs).expect_err("cycle");
        assert!(matches!(
            err,
            GridError::CalculationUnresolvable { ref pending } if pending.len() == 2
        ));
    }

    #[test]
    fn callable_reporting_missing_column_waits_for_it() {
        let mut calcs = Calculations::new();
        calcs.insert(
            "late",
            Calculation::function(Vec::<String>::new(), |row| {
                row.get("early")
                    .cloned()
                    .ok_or_else(|| EvalError::MissingColumn("early".into()))
            }),
        );
        calcs.insert("early", formula("{a} * 10"));
        let mut data = row(&[("a", Scalar::Int64(2))]);
        calculate(&mut data, &calcs).expect("calculate");
        assert_eq!(data.get("late"), Some(&Scalar::Float64(20.0)));
    }

    #[test]
    fn bound_columns_are_not_recalculated() {
        let mut calcs = Calculations::new();
        calcs.insert("c", formula("{a} + 1"));
        let mut data = row(&[("a", Scalar::Int64(1)), ("c", Scalar::Int64(99))]);
        calculate(&mut data, &calcs).expect("calculate");
        assert_eq!(data.get("c"), Some(&Scalar::Int64(99)));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut calcs = Calculations::new();
        calcs.insert("a", formula("1"));
        calcs.insert("b", formula("2"));
        calcs.insert("a", formula("3"));
        assert_eq!(calcs.names(), vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(calcs.get("a").expect("a").dependencies(), Vec::<&str>::new());
    }
}
