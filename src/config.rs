use crate::error::{BankError, BankResult};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Electrical constants of the installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Constants {
    /// Nominal line-to-line voltage (kV).
    #[serde(rename = "tensao_nom_kV")]
    pub nominal_voltage_kv: f64,

    /// Grid frequency (Hz).
    #[serde(rename = "frequencia_Hz")]
    pub frequency_hz: f64,

    /// Rated capacitance of a single unit (uF). Only needed for preparation.
    #[serde(rename = "capacit_nom_capacitor_uF", default)]
    #[builder(default, setter(strip_option))]
    pub rated_capacitance_uf: Option<f64>,

    /// Reference temperature for the capacitance adjustment (deg C).
    #[serde(rename = "temp_ref_C", default)]
    #[builder(default, setter(strip_option))]
    pub reference_temperature_c: Option<f64>,
}

/// Limits applied to the unbalance current and to individual units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Constraints {
    /// Unbalance current (A) the optimizer tries to reach.
    #[serde(rename = "tolerancia_diferenca")]
    pub tolerance_a: f64,

    /// Unbalance current (A) at or above which the bank needs rebalancing.
    #[serde(rename = "corrente_desbalanco_alarme_A")]
    pub alarm_a: f64,

    /// Admissible adjusted field capacitance `[min, max]` (uF).
    #[serde(rename = "val_admit_capacit_capacitor_uF", default)]
    #[builder(default, setter(strip_option))]
    pub admissible_range_uf: Option<[f64; 2]>,
}

/// Which branches feed the capacitance of leg P3.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegWiring {
    /// P3 = A3 + A4, consistent with the wiring table.
    #[default]
    #[serde(rename = "standard")]
    Standard,
    /// P3 = A3 + B4, as computed by the field spreadsheets this tool replaced.
    #[serde(rename = "legacy_p3")]
    LegacyP3,
}

/// Configuration of a balancing run. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
    pub constants: Constants,
    pub constraints: Constraints,
    #[serde(default)]
    pub leg_wiring: LegWiring,
}

impl BankConfig {
    pub fn new(constants: Constants, constraints: Constraints) -> Self {
        Self {
            constants,
            constraints,
            leg_wiring: LegWiring::Standard,
        }
    }

    pub fn with_leg_wiring(mut self, leg_wiring: LegWiring) -> Self {
        self.leg_wiring = leg_wiring;
        self
    }

    /// Checks values that bypassed the builders, e.g. after deserializing.
    pub fn validate(&self) -> BankResult<()> {
        let c = &self.constants;
        check_constants(c.nominal_voltage_kv, c.frequency_hz).map_err(BankError::Config)?;
        let k = &self.constraints;
        check_constraints(k.tolerance_a, k.alarm_a, k.admissible_range_uf)
            .map_err(BankError::Config)
    }

    pub(crate) fn rated_capacitance_uf(&self) -> BankResult<f64> {
        self.constants
            .rated_capacitance_uf
            .ok_or_else(|| missing("constants.capacit_nom_capacitor_uF"))
    }

    pub(crate) fn reference_temperature_c(&self) -> BankResult<f64> {
        self.constants
            .reference_temperature_c
            .ok_or_else(|| missing("constants.temp_ref_C"))
    }

    pub(crate) fn admissible_range_uf(&self) -> BankResult<[f64; 2]> {
        self.constraints
            .admissible_range_uf
            .ok_or_else(|| missing("constraints.val_admit_capacit_capacitor_uF"))
    }
}

fn missing(key: &str) -> BankError {
    BankError::Config(format!("missing configuration key {}", key))
}

fn check_constants(nominal_voltage_kv: f64, frequency_hz: f64) -> Result<(), String> {
    if !(nominal_voltage_kv.is_finite() && nominal_voltage_kv > 0.0) {
        return Err(format!(
            "nominal voltage must be positive: {} kV",
            nominal_voltage_kv
        ));
    }
    if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
        return Err(format!("frequency must be positive: {} Hz", frequency_hz));
    }
    Ok(())
}

fn check_constraints(
    tolerance_a: f64,
    alarm_a: f64,
    range: Option<[f64; 2]>,
) -> Result<(), String> {
    if !(tolerance_a >= 0.0) {
        return Err(format!("tolerance must not be negative: {} A", tolerance_a));
    }
    if !(alarm_a >= 0.0) {
        return Err(format!("alarm threshold must not be negative: {} A", alarm_a));
    }
    if let Some([lo, hi]) = range {
        if lo > hi {
            return Err(format!("admissible range is inverted: [{}, {}] uF", lo, hi));
        }
    }
    Ok(())
}

impl ConstantsBuilder {
    fn validate(&self) -> Result<(), String> {
        match (self.nominal_voltage_kv, self.frequency_hz) {
            (Some(v), Some(f)) => check_constants(v, f),
            // missing fields are reported by the generated build fn
            _ => Ok(()),
        }
    }
}

impl ConstraintsBuilder {
    fn validate(&self) -> Result<(), String> {
        match (self.tolerance_a, self.alarm_a) {
            (Some(tol), Some(alarm)) => {
                check_constraints(tol, alarm, self.admissible_range_uf.flatten())
            }
            _ => Ok(()),
        }
    }
}
