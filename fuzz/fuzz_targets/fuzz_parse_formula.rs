#![no_main]

use std::collections::BTreeMap;

use dg_expr::Formula;
use dg_types::Scalar;
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_BYTES: usize = 4_096;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let rest = &rest[..rest.len().min(MAX_INPUT_BYTES)];
    let source = String::from_utf8_lossy(rest);

    let compiled = if selector & 1 == 0 {
        Formula::numeric(source.as_ref())
    } else {
        Formula::predicate(source.as_ref())
    };
    let Ok(formula) = compiled else {
        return;
    };

    // Evaluate once unbound, then with every placeholder bound.
    let _ = formula.evaluate(&BTreeMap::<String, Scalar>::new());
    let value = match (selector >> 1) & 0b11 {
        0 => Scalar::Int64(i64::from(selector)),
        1 => Scalar::Float64(f64::from(selector) / 7.0),
        2 => Scalar::from(source.as_ref()),
        _ => Scalar::blank(),
    };
    let bindings: BTreeMap<String, Scalar> = formula
        .references()
        .iter()
        .map(|name| (name.clone(), value.clone()))
        .collect();
    let _ = formula.evaluate(&bindings);
    let _ = formula.matches(&bindings);
});
