use pretty_dtoa::{dtoa, FmtFloatConfig};
use std::collections::BTreeMap;
use std::fmt::Display;

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

pub fn format_f64(v: f64) -> String {
    dtoa(v, FLOAT_CONFIG)
}

/// Formats per-node values as `{A1: 400, A2: 401.5}` in key order.
pub fn format_f64_map<K: Display>(m: &BTreeMap<K, f64>) -> String {
    let a: Vec<String> = m
        .iter()
        .map(|(k, v)| format!("{}: {}", k, dtoa(*v, FLOAT_CONFIG)))
        .collect();
    format!("{{{}}}", a.join(", "))
}
