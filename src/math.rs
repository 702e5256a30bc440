use crate::error::{BankError, BankResult};
use crate::topology::Node;
use std::f64::consts::PI;

/// Microfarads per farad.
pub const UF_PER_F: f64 = 1e6;

/// Reciprocal of the sum of reciprocals: `1 / Σ(1/v_i)`.
///
/// A single value is returned unchanged.
pub fn reciprocal_sum(values: &[f64], node: Node) -> BankResult<f64> {
    match values {
        [] => Err(BankError::Degenerate {
            node,
            reason: "no values to combine".to_string(),
        }),
        [v] => Ok(*v),
        _ => {
            let mut inv = 0.0;
            for &v in values {
                if v == 0.0 {
                    return Err(BankError::Degenerate {
                        node,
                        reason: "zero operand in reciprocal sum".to_string(),
                    });
                }
                inv += 1.0 / v;
            }
            Ok(1.0 / inv)
        }
    }
}

/// Product over sum of a pair: `(a·b) / (a + b)`.
pub fn product_over_sum(a: f64, b: f64, node: Node) -> BankResult<f64> {
    let sum = a + b;
    if sum == 0.0 {
        return Err(BankError::Degenerate {
            node,
            reason: format!("operands {} and {} sum to zero", a, b),
        });
    }
    Ok((a * b) / sum)
}

/// Capacitive reactance (ohm) of `capacitance_uf` at `frequency_hz`.
pub fn capacitive_reactance(capacitance_uf: f64, frequency_hz: f64, node: Node) -> BankResult<f64> {
    let c_farad = capacitance_uf / UF_PER_F;
    if !(c_farad > 0.0) || !(frequency_hz > 0.0) {
        return Err(BankError::Degenerate {
            node,
            reason: format!(
                "reactance undefined for {} uF at {} Hz",
                capacitance_uf, frequency_hz
            ),
        });
    }
    Ok(1.0 / (2.0 * PI * frequency_hz * c_farad))
}

/// Relative difference `|a - b| / max(|a|, |b|)`, zero when both are zero.
pub fn rel_diff(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}
