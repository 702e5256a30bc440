use crate::config::BankConfig;
use crate::error::{BankError, BankResult};
use crate::topology::{BranchId, RackId};
use crate::unit::{CapacitorUnit, Conformity};
use std::collections::HashMap;

/// Relative capacitance change per degree C.
pub const TEMPERATURE_COEFFICIENT: f64 = -0.0004;

/// Raw field measurement of one unit.
///
/// Readings are numbered by their order: the k-th reading (from 1) belongs
/// to the slot at position k.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReading {
    pub date_time: Option<String>,
    /// Three capacitance readings (uF).
    pub readings_uf: [f64; 3],
    /// Case temperature (deg C).
    pub temperature_c: f64,
}

/// Row of the slot table: which unit sits where, and its nameplate value.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub rack: RackId,
    pub branch: BranchId,
    pub position: usize,
    pub serial: Option<String>,
    /// Factory capacitance (uF).
    pub rated_capacitance_uf: f64,
}

/// Corrects `capacitance_uf` measured at `temperature_c` back to
/// `reference_c`.
pub fn adjust_for_temperature(capacitance_uf: f64, temperature_c: f64, reference_c: f64) -> f64 {
    capacitance_uf / (1.0 + TEMPERATURE_COEFFICIENT * (temperature_c - reference_c))
}

/// Deviation of `capacitance_uf` from `nominal_uf` in percent.
pub fn delta_pct(capacitance_uf: f64, nominal_uf: f64) -> f64 {
    100.0 * (capacitance_uf - nominal_uf) / nominal_uf
}

/// Joins field readings with the slot table and derives the columns of the
/// prepared dataset. Units come out in reading order; slots without a
/// reading are dropped.
pub fn prepare_units(
    readings: &[FieldReading],
    slots: &[Slot],
    config: &BankConfig,
) -> BankResult<Vec<CapacitorUnit>> {
    let nominal = config.rated_capacitance_uf()?;
    let reference = config.reference_temperature_c()?;
    let [lo, hi] = config.admissible_range_uf()?;
    if !(nominal > 0.0) {
        return Err(BankError::Config(format!(
            "rated unit capacitance must be positive: {} uF",
            nominal
        )));
    }

    let mut by_position: HashMap<usize, &Slot> = HashMap::with_capacity(slots.len());
    for slot in slots {
        if by_position.insert(slot.position, slot).is_some() {
            return Err(BankError::DuplicatePosition(slot.position));
        }
    }

    let mut units = Vec::with_capacity(readings.len().min(slots.len()));
    for (k, reading) in readings.iter().enumerate() {
        let position = k + 1;
        let slot = match by_position.remove(&position) {
            Some(slot) => slot,
            None => {
                log::debug!("reading {} has no slot", position);
                continue;
            }
        };

        let field = reading.readings_uf.iter().sum::<f64>() / 3.0;
        let adjusted = adjust_for_temperature(field, reading.temperature_c, reference);
        let conformity = if lo <= adjusted && adjusted <= hi {
            Conformity::Conforming
        } else {
            Conformity::NonConforming
        };

        units.push(CapacitorUnit {
            date_time: reading.date_time.clone(),
            rack: slot.rack,
            branch: slot.branch,
            leg: slot.branch.leg(),
            position,
            serial: slot.serial.clone(),
            rated_capacitance_uf: Some(slot.rated_capacitance_uf),
            rated_delta_pct: Some(delta_pct(slot.rated_capacitance_uf, nominal)),
            field_capacitance_uf: Some(field),
            field_delta_pct: Some(delta_pct(field, nominal)),
            temperature_c: Some(reading.temperature_c),
            adjusted_capacitance_uf: adjusted,
            conformity: Some(conformity),
        });
    }

    if !by_position.is_empty() {
        let mut missing: Vec<usize> = by_position.into_keys().collect();
        missing.sort_unstable();
        log::warn!("no field reading for positions {:?}", missing);
    }

    Ok(units)
}
