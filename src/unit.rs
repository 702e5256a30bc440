use crate::error::{BankError, BankResult};
use crate::topology::{BranchId, LegId, RackId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum Conformity {
    /// Adjusted capacitance within the admissible range.
    #[serde(rename = "C")]
    Conforming,
    #[serde(rename = "NC")]
    NonConforming,
}

/// Where a unit sits in the bank. The only part of a unit that moves.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Placement {
    pub rack: RackId,
    pub leg: LegId,
    pub branch: BranchId,
    pub position: usize,
}

/// One capacitor unit: measured attributes plus its current placement.
///
/// Field names follow the columns of the prepared dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitorUnit {
    /// Measurement timestamp, passed through untouched.
    #[serde(default)]
    pub date_time: Option<String>,

    pub rack: RackId,

    #[serde(rename = "ramo")]
    pub branch: BranchId,

    #[serde(rename = "perna")]
    pub leg: LegId,

    /// Physical slot, unique within the bank.
    #[serde(rename = "posicao")]
    pub position: usize,

    /// Manufacturer serial number.
    #[serde(rename = "num_serie", default)]
    pub serial: Option<String>,

    /// Factory (nameplate) capacitance (uF).
    #[serde(rename = "capacitancia_fabrica_uF", default)]
    pub rated_capacitance_uf: Option<f64>,

    #[serde(rename = "delta_capacitancia_fabrica_%", default)]
    pub rated_delta_pct: Option<f64>,

    /// Mean of the field readings (uF).
    #[serde(rename = "capacitancia_campo_uF", default)]
    pub field_capacitance_uf: Option<f64>,

    #[serde(rename = "delta_capacitancia_campo_%", default)]
    pub field_delta_pct: Option<f64>,

    /// Case temperature at measurement time (deg C).
    #[serde(rename = "temperatura_capacitor_C", default)]
    pub temperature_c: Option<f64>,

    /// Field capacitance corrected to the reference temperature (uF).
    #[serde(rename = "capacitancia_campo_ajustada_uF")]
    pub adjusted_capacitance_uf: f64,

    #[serde(rename = "conformidade", default)]
    pub conformity: Option<Conformity>,
}

impl CapacitorUnit {
    /// Creates a unit with only the fields the network engine needs.
    pub fn new(branch: BranchId, position: usize, adjusted_capacitance_uf: f64) -> Self {
        Self {
            date_time: None,
            rack: branch.rack(),
            branch,
            leg: branch.leg(),
            position,
            serial: None,
            rated_capacitance_uf: None,
            rated_delta_pct: None,
            field_capacitance_uf: None,
            field_delta_pct: None,
            temperature_c: None,
            adjusted_capacitance_uf,
            conformity: None,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            rack: self.rack,
            leg: self.leg,
            branch: self.branch,
            position: self.position,
        }
    }

    pub(crate) fn set_placement(&mut self, p: Placement) {
        self.rack = p.rack;
        self.leg = p.leg;
        self.branch = p.branch;
        self.position = p.position;
    }

    fn check(&self) -> BankResult<()> {
        let c = self.adjusted_capacitance_uf;
        if !(c.is_finite() && c > 0.0) {
            return Err(BankError::InvalidCapacitance {
                position: self.position,
                value: c,
            });
        }
        if self.branch.leg() != self.leg {
            return Err(BankError::PlacementMismatch {
                position: self.position,
                reason: format!(
                    "branch {} belongs to leg {}, not {}",
                    self.branch,
                    self.branch.leg(),
                    self.leg
                ),
            });
        }
        if self.leg.rack() != self.rack {
            return Err(BankError::PlacementMismatch {
                position: self.position,
                reason: format!(
                    "leg {} belongs to rack {}, not {}",
                    self.leg,
                    self.leg.rack(),
                    self.rack
                ),
            });
        }
        Ok(())
    }
}

/// The working dataset: every unit of one phase of the bank.
#[derive(Debug, Clone, PartialEq)]
pub struct Bank {
    units: Vec<CapacitorUnit>,
}

impl Bank {
    /// Takes ownership of the prepared units after checking that placements
    /// agree with the wiring table and positions are unique.
    pub fn new(units: Vec<CapacitorUnit>) -> BankResult<Self> {
        let mut seen = HashSet::with_capacity(units.len());
        for u in units.iter() {
            u.check()?;
            if !seen.insert(u.position) {
                return Err(BankError::DuplicatePosition(u.position));
            }
        }
        Ok(Self { units })
    }

    pub fn units(&self) -> &[CapacitorUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn into_units(self) -> Vec<CapacitorUnit> {
        self.units
    }

    /// Units currently placed in `branch`, in dataset order.
    pub fn in_branch(&self, branch: BranchId) -> impl Iterator<Item = (usize, &CapacitorUnit)> {
        self.units
            .iter()
            .enumerate()
            .filter(move |(_, u)| u.branch == branch)
    }

    pub(crate) fn placement(&self, i: usize) -> Placement {
        self.units[i].placement()
    }

    /// Exchanges the placements of units `i` and `j` as one step.
    pub(crate) fn swap_placements(&mut self, i: usize, j: usize) {
        let (pi, pj) = (self.units[i].placement(), self.units[j].placement());
        self.units[i].set_placement(pj);
        self.units[j].set_placement(pi);
    }

    /// Puts back placements saved before a trial swap.
    pub(crate) fn restore(&mut self, saved: &[(usize, Placement)]) {
        for &(i, p) in saved {
            self.units[i].set_placement(p);
        }
    }
}
