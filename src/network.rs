use crate::config::{BankConfig, LegWiring};
use crate::debug::format_f64_map;
use crate::error::{BankError, BankResult};
use crate::math::{capacitive_reactance, product_over_sum, reciprocal_sum};
use crate::topology::{BranchId, LegId, Node, RackId};
use crate::unit::Bank;

use serde::Serialize;
use std::collections::BTreeMap;

/// Electrical state of the phase for one placement of the units.
///
/// Capacitances in uF, reactances in ohm, voltages in V and currents in A.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkParams {
    pub branch_capacitance_uf: BTreeMap<BranchId, f64>,
    pub leg_capacitance_uf: BTreeMap<LegId, f64>,
    pub rack_capacitance_uf: BTreeMap<RackId, f64>,
    pub phase_capacitance_uf: f64,

    pub branch_reactance_ohm: BTreeMap<BranchId, f64>,
    pub leg_reactance_ohm: BTreeMap<LegId, f64>,
    pub rack_reactance_ohm: BTreeMap<RackId, f64>,
    pub phase_reactance_ohm: f64,

    /// Phase-to-neutral voltage.
    pub phase_voltage_v: f64,
    pub phase_current_a: f64,
    pub rack_voltage_v: BTreeMap<RackId, f64>,
    pub leg_current_a: BTreeMap<LegId, f64>,

    /// Larger of the two cross-rack leg current differences.
    pub unbalance_current_a: f64,
}

/// Reduces the capacitor network of `bank` and solves for voltages and
/// currents at nominal voltage.
///
/// Capacitances combine bottom-up as reciprocal sum within a branch, sum
/// across the branches of a leg and the legs of a rack, and as a series pair
/// across the two racks. Reactances combine the other way round. Fails if a
/// branch holds no units or a series combination degenerates.
pub fn compute_parameters(bank: &Bank, config: &BankConfig) -> BankResult<NetworkParams> {
    let freq = config.constants.frequency_hz;

    // capacitances
    let mut branch_c = BTreeMap::new();
    for br in BranchId::ALL {
        let values: Vec<f64> = bank
            .in_branch(br)
            .map(|(_, u)| u.adjusted_capacitance_uf)
            .collect();
        if values.is_empty() {
            return Err(BankError::EmptyBranch(br));
        }
        branch_c.insert(br, reciprocal_sum(&values, Node::Branch(br))?);
    }

    let mut leg_c = BTreeMap::new();
    for leg in LegId::ALL {
        let [b1, b2] = leg_capacitance_branches(leg, config.leg_wiring);
        leg_c.insert(leg, branch_c[&b1] + branch_c[&b2]);
    }

    let mut rack_c = BTreeMap::new();
    for rack in RackId::ALL {
        let [l1, l2] = rack.legs();
        rack_c.insert(rack, leg_c[&l1] + leg_c[&l2]);
    }

    let phase_c = product_over_sum(rack_c[&RackId::R1], rack_c[&RackId::R2], Node::Phase)?;

    // reactances
    let mut branch_x = BTreeMap::new();
    for (&br, &c) in branch_c.iter() {
        branch_x.insert(br, capacitive_reactance(c, freq, Node::Branch(br))?);
    }

    let mut leg_x = BTreeMap::new();
    for leg in LegId::ALL {
        let [b1, b2] = leg.branches();
        let x = product_over_sum(branch_x[&b1], branch_x[&b2], Node::Leg(leg))?;
        leg_x.insert(leg, x);
    }

    let mut rack_x = BTreeMap::new();
    for rack in RackId::ALL {
        let [l1, l2] = rack.legs();
        let x = product_over_sum(leg_x[&l1], leg_x[&l2], Node::Rack(rack))?;
        rack_x.insert(rack, x);
    }

    let phase_x = rack_x[&RackId::R1] + rack_x[&RackId::R2];

    // voltages and currents
    let v_phase = config.constants.nominal_voltage_kv * 1000.0 / 3f64.sqrt();
    let i_phase = v_phase / phase_x;

    let mut rack_v = BTreeMap::new();
    for (&rack, &x) in rack_x.iter() {
        rack_v.insert(rack, i_phase * x);
    }

    let mut leg_i = BTreeMap::new();
    for leg in LegId::ALL {
        leg_i.insert(leg, rack_v[&leg.rack()] / leg_x[&leg]);
    }

    let unbalance = unbalance_current(&leg_i);

    log::debug!("C branches (uF): {}", format_f64_map(&branch_c));
    log::debug!("Xc legs (ohm): {}", format_f64_map(&leg_x));
    log::debug!("I legs (A): {}", format_f64_map(&leg_i));

    Ok(NetworkParams {
        branch_capacitance_uf: branch_c,
        leg_capacitance_uf: leg_c,
        rack_capacitance_uf: rack_c,
        phase_capacitance_uf: phase_c,
        branch_reactance_ohm: branch_x,
        leg_reactance_ohm: leg_x,
        rack_reactance_ohm: rack_x,
        phase_reactance_ohm: phase_x,
        phase_voltage_v: v_phase,
        phase_current_a: i_phase,
        rack_voltage_v: rack_v,
        leg_current_a: leg_i,
        unbalance_current_a: unbalance,
    })
}

/// Branches summed into the capacitance of `leg`.
fn leg_capacitance_branches(leg: LegId, wiring: LegWiring) -> [BranchId; 2] {
    match (leg, wiring) {
        (LegId::P3, LegWiring::LegacyP3) => {
            log::warn!("leg P3 capacitance computed from A3 + B4 (legacy wiring)");
            [BranchId::A3, BranchId::B4]
        }
        _ => leg.branches(),
    }
}

/// Unbalance between the racks: legs P1/P3 and P2/P4 are the electrically
/// symmetric counterparts.
fn unbalance_current(leg_i: &BTreeMap<LegId, f64>) -> f64 {
    let d_42 = (leg_i[&LegId::P4] - leg_i[&LegId::P2]).abs();
    let d_31 = (leg_i[&LegId::P3] - leg_i[&LegId::P1]).abs();
    d_42.max(d_31)
}
