use crate::config::BankConfig;
use crate::error::{BankError, BankResult};
use crate::network::{compute_parameters, NetworkParams};
use crate::results::{BalanceResults, Permutation, SearchStatus};
use crate::topology::{BranchId, LegId, RackId};
use crate::unit::{Bank, CapacitorUnit};

use std::collections::HashSet;

pub trait ProgressMonitor {
    fn update(&self, swap: &Permutation);
}

/// Reports every accepted swap through `log`.
pub struct LogProgress {}

impl ProgressMonitor for LogProgress {
    fn update(&self, swap: &Permutation) {
        log::info!(
            "swap {}: unit {} (branch {}) <-> unit {} (branch {}), unbalance {:.6} A",
            swap.index,
            swap.source_position,
            swap.source_branch,
            swap.target_position,
            swap.target_branch,
            swap.unbalance_current_a
        );
    }
}

/// Options of a balancing run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOpt {
    /// Rack whose two legs exchange units.
    pub rack: RackId,

    /// Upper bound on accepted swaps. Must be positive.
    pub max_swaps: usize,

    /// When false only the initial state is evaluated.
    pub run_optimization: bool,
}

impl OptimizeOpt {
    /// Parses the rack identifier, rejecting anything outside the topology.
    pub fn new(rack: &str, max_swaps: usize) -> BankResult<Self> {
        let opt = Self {
            rack: rack.parse()?,
            max_swaps,
            run_optimization: true,
        };
        opt.validate()?;
        Ok(opt)
    }

    /// Same options, but stop after the initial balance check.
    pub fn report_only(mut self) -> Self {
        self.run_optimization = false;
        self
    }

    fn validate(&self) -> BankResult<()> {
        if self.max_swaps == 0 {
            return Err(BankError::Config(
                "maximum number of swaps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builds the bank from prepared units, balances it and hands the units back
/// with their final placements.
pub fn run_balance(
    units: Vec<CapacitorUnit>,
    config: &BankConfig,
    opt: &OptimizeOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> BankResult<(BalanceResults, Vec<CapacitorUnit>)> {
    let mut bank = Bank::new(units)?;
    let results = optimize(&mut bank, config, opt, progress)?;
    Ok((results, bank.into_units()))
}

/// Greedy swap search over the two legs of `opt.rack`.
///
/// The bank is left untouched when the initial unbalance is below the alarm
/// threshold or when `opt.run_optimization` is false. Otherwise each
/// iteration pairs the lowest-capacitance unswapped unit of a branch of the
/// first leg with the highest-capacitance unswapped unit of a branch of the
/// second leg, keeps the exchange if the unbalance current strictly drops
/// and undoes it otherwise. The scan restarts from the first branch after
/// every accepted swap.
pub fn optimize(
    bank: &mut Bank,
    config: &BankConfig,
    opt: &OptimizeOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> BankResult<BalanceResults> {
    config.validate()?;
    opt.validate()?;

    let initial = compute_parameters(bank, config)?;
    let initial_unbalance = initial.unbalance_current_a;

    if initial_unbalance < config.constraints.alarm_a {
        log::info!(
            "bank already balanced: unbalance {:.6} A below alarm {} A",
            initial_unbalance,
            config.constraints.alarm_a
        );
        return Ok(BalanceResults::assemble(
            initial,
            initial_unbalance,
            Vec::new(),
            SearchStatus::AlreadyBalanced,
            config,
        ));
    }
    log::info!(
        "bank not balanced: unbalance {:.6} A, optimization required",
        initial_unbalance
    );

    if !opt.run_optimization {
        return Ok(BalanceResults::assemble(
            initial,
            initial_unbalance,
            Vec::new(),
            SearchStatus::NotRequested,
            config,
        ));
    }

    let (params, swaps, status) = search(bank, config, opt, initial, progress)?;

    log::info!("optimization finished after {} swaps", swaps.len());
    match status {
        SearchStatus::WithinTolerance => log::info!("bank balanced after optimization"),
        _ => log::warn!(
            "could not reach tolerance {} A: unbalance {:.6} A ({:?})",
            config.constraints.tolerance_a,
            params.unbalance_current_a,
            status
        ),
    }

    Ok(BalanceResults::assemble(
        params,
        initial_unbalance,
        swaps,
        status,
        config,
    ))
}

fn search(
    bank: &mut Bank,
    config: &BankConfig,
    opt: &OptimizeOpt,
    initial: NetworkParams,
    progress: Option<&dyn ProgressMonitor>,
) -> BankResult<(NetworkParams, Vec<Permutation>, SearchStatus)> {
    let tolerance = config.constraints.tolerance_a;
    let [leg1, leg2] = opt.rack.legs();

    let mut current = initial;
    let mut swaps: Vec<Permutation> = Vec::new();
    // positions of units that have already been moved
    let mut swapped = HashSet::new();

    loop {
        if current.unbalance_current_a <= tolerance {
            return Ok((current, swaps, SearchStatus::WithinTolerance));
        }
        if swaps.len() >= opt.max_swaps {
            return Ok((current, swaps, SearchStatus::SwapLimitReached));
        }

        let index = swaps.len() + 1;
        match scan(bank, config, leg1, leg2, &mut swapped, &current, index)? {
            Some((params, swap)) => {
                if let Some(progress) = progress {
                    progress.update(&swap);
                }
                swaps.push(swap);
                current = params;
            }
            None => {
                log::info!("no further swap reduces the unbalance current");
                return Ok((current, swaps, SearchStatus::NoImprovingSwap));
            }
        }
    }
}

/// One pass over all branch pairs of the two legs. Returns the first
/// improving swap, already applied to `bank`.
fn scan(
    bank: &mut Bank,
    config: &BankConfig,
    leg1: LegId,
    leg2: LegId,
    swapped: &mut HashSet<usize>,
    current: &NetworkParams,
    index: usize,
) -> BankResult<Option<(NetworkParams, Permutation)>> {
    let before = current.unbalance_current_a;

    for b1 in leg1.branches() {
        let i = match pick(bank, b1, swapped, Extreme::Min) {
            Some(i) => i,
            None => continue,
        };
        for b2 in leg2.branches() {
            let j = match pick(bank, b2, swapped, Extreme::Max) {
                Some(j) => j,
                None => continue,
            };

            let saved = [(i, bank.placement(i)), (j, bank.placement(j))];
            bank.swap_placements(i, j);

            let trial = match compute_parameters(bank, config) {
                Ok(trial) => trial,
                Err(err) => {
                    bank.restore(&saved);
                    return Err(err);
                }
            };

            let (p1, p2) = (saved[0].1.position, saved[1].1.position);
            if trial.unbalance_current_a < before {
                swapped.insert(p1);
                swapped.insert(p2);
                let swap = Permutation {
                    source_branch: b1,
                    source_position: p1,
                    target_branch: b2,
                    target_position: p2,
                    unbalance_current_a: trial.unbalance_current_a,
                    index,
                };
                return Ok(Some((trial, swap)));
            }

            log::trace!(
                "rejected {} ({}) <-> {} ({}): {:.6} A >= {:.6} A",
                p1,
                b1,
                p2,
                b2,
                trial.unbalance_current_a,
                before
            );
            bank.restore(&saved);
        }
    }
    Ok(None)
}

#[derive(Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

/// Index of the unswapped unit of `branch` with the extreme adjusted
/// capacitance. Ties go to the unit that comes first in the dataset.
fn pick(bank: &Bank, branch: BranchId, swapped: &HashSet<usize>, extreme: Extreme) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, u) in bank.in_branch(branch) {
        if swapped.contains(&u.position) {
            continue;
        }
        let c = u.adjusted_capacitance_uf;
        let better = match best {
            None => true,
            Some((_, b)) => match extreme {
                Extreme::Min => c < b,
                Extreme::Max => c > b,
            },
        };
        if better {
            best = Some((i, c));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{biased_bank, config, scattered_bank, uniform_bank};
    use crate::unit::Placement;
    use anyhow::{format_err, Result};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        swaps: RefCell<Vec<Permutation>>,
    }

    impl ProgressMonitor for Recorder {
        fn update(&self, swap: &Permutation) {
            self.swaps.borrow_mut().push(swap.clone());
        }
    }

    fn placements(bank: &Bank) -> Vec<Placement> {
        bank.units().iter().map(|u| u.placement()).collect()
    }

    #[test]
    fn test_symmetric_bank_skips_search() -> Result<()> {
        let mut bank = uniform_bank(2, 800.0)?;
        let before = placements(&bank);
        let opt = OptimizeOpt::new("R1", 10)?;

        let results = optimize(&mut bank, &config(), &opt, None)?;

        assert_eq!(results.params.unbalance_current_a, 0.0);
        assert!(results.is_balanced);
        assert_eq!(results.status, SearchStatus::AlreadyBalanced);
        assert!(results.permutations.is_empty());
        assert_eq!(placements(&bank), before);
        Ok(())
    }

    #[test]
    fn test_biased_branch_improves() -> Result<()> {
        let mut bank = biased_bank(BranchId::A1, 1.05)?;
        let opt = OptimizeOpt::new("R1", 10)?;
        let recorder = Recorder::default();

        let results = optimize(&mut bank, &config(), &opt, Some(&recorder))?;

        assert!(!results.permutations.is_empty());
        assert!(results.params.unbalance_current_a < results.initial_unbalance_current_a);
        assert_eq!(*recorder.swaps.borrow(), results.permutations);

        // the reported state matches the final placements
        let recomputed = compute_parameters(&bank, &config())?;
        assert_eq!(recomputed, results.params);
        Ok(())
    }

    #[test]
    fn test_monotonic_and_bounded() -> Result<()> {
        for (rack, max_swaps) in [("R1", 1), ("R1", 3), ("R2", 2), ("R2", 50)] {
            let mut bank = scattered_bank()?;
            let opt = OptimizeOpt::new(rack, max_swaps)?;
            let results = optimize(&mut bank, &config(), &opt, None)?;

            if results.permutations.len() > max_swaps {
                return Err(format_err!(
                    "{} swaps exceed the limit of {}",
                    results.permutations.len(),
                    max_swaps
                ));
            }
            let mut prev = results.initial_unbalance_current_a;
            for (k, swap) in results.permutations.iter().enumerate() {
                assert_eq!(swap.index, k + 1);
                if !(swap.unbalance_current_a < prev) {
                    return Err(format_err!("swap {} did not improve: {:?}", k + 1, swap));
                }
                prev = swap.unbalance_current_a;
            }
            if let Some(last) = results.permutations.last() {
                assert_eq!(last.unbalance_current_a, results.params.unbalance_current_a);
            }
        }
        Ok(())
    }

    #[test]
    fn test_swaps_stay_in_target_rack() -> Result<()> {
        let mut bank = scattered_bank()?;
        let before = bank.clone();
        let opt = OptimizeOpt::new("R2", 10)?;
        optimize(&mut bank, &config(), &opt, None)?;

        let mut positions = HashSet::new();
        for (u0, u1) in before.units().iter().zip(bank.units()) {
            // measured attributes never move
            assert_eq!(u0.adjusted_capacitance_uf, u1.adjusted_capacitance_uf);
            assert_eq!(u0.rack, u1.rack);
            if u0.rack == RackId::R1 {
                assert_eq!(u0.placement(), u1.placement());
            }
            assert_eq!(u1.branch.leg(), u1.leg);
            assert!(positions.insert(u1.position));
        }
        Ok(())
    }

    #[test]
    fn test_swapped_units_are_not_reused() -> Result<()> {
        let mut bank = scattered_bank()?;
        let opt = OptimizeOpt::new("R1", 50)?;
        let results = optimize(&mut bank, &config(), &opt, None)?;

        let mut used = HashSet::new();
        for swap in results.permutations.iter() {
            assert!(used.insert(swap.source_position));
            assert!(used.insert(swap.target_position));
        }
        Ok(())
    }

    #[test]
    fn test_terminates_without_improving_swap() -> Result<()> {
        // rack R1 holds identical units, so exchanging them between its legs
        // never changes the unbalance caused by rack R2
        let mut bank = biased_bank(BranchId::A3, 1.05)?;
        let before = placements(&bank);
        let opt = OptimizeOpt::new("R1", 10)?;

        let results = optimize(&mut bank, &config(), &opt, None)?;

        assert_eq!(results.status, SearchStatus::NoImprovingSwap);
        assert!(results.permutations.is_empty());
        assert!(!results.is_balanced);
        // rejected trials leave placements bit-identical
        assert_eq!(placements(&bank), before);
        Ok(())
    }

    #[test]
    fn test_termination_status() -> Result<()> {
        let cases = [
            ("R1", 3, SearchStatus::SwapLimitReached, 3),
            ("R1", 50, SearchStatus::NoImprovingSwap, 3),
            ("R2", 50, SearchStatus::NoImprovingSwap, 3),
        ];
        for (rack, max_swaps, status, count) in cases {
            let mut bank = scattered_bank()?;
            let opt = OptimizeOpt::new(rack, max_swaps)?;
            let results = optimize(&mut bank, &config(), &opt, None)?;
            assert_eq!(results.status, status, "rack {} limit {}", rack, max_swaps);
            assert_eq!(results.permutations.len(), count);
        }

        let mut bank = biased_bank(BranchId::A1, 1.05)?;
        let results = optimize(&mut bank, &config(), &OptimizeOpt::new("R1", 10)?, None)?;
        assert_eq!(results.status, SearchStatus::WithinTolerance);
        assert!(results.is_balanced);
        Ok(())
    }

    #[test]
    fn test_report_only() -> Result<()> {
        let mut bank = biased_bank(BranchId::B1, 1.05)?;
        let before = placements(&bank);
        let opt = OptimizeOpt::new("R1", 10)?.report_only();

        let results = optimize(&mut bank, &config(), &opt, None)?;

        assert_eq!(results.status, SearchStatus::NotRequested);
        assert!(!results.is_balanced);
        assert_eq!(results.params.unbalance_current_a, results.initial_unbalance_current_a);
        assert_eq!(placements(&bank), before);
        Ok(())
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            OptimizeOpt::new("R9", 10),
            Err(BankError::InvalidRack(_))
        ));
        assert!(matches!(
            OptimizeOpt::new("R1", 0),
            Err(BankError::Config(_))
        ));
    }

    #[test]
    fn test_pick_extremes() -> Result<()> {
        let bank = Bank::new(vec![
            CapacitorUnit::new(BranchId::A1, 1, 401.0),
            CapacitorUnit::new(BranchId::A1, 2, 399.0),
            CapacitorUnit::new(BranchId::A1, 3, 399.0),
            CapacitorUnit::new(BranchId::A1, 4, 405.0),
            CapacitorUnit::new(BranchId::A1, 5, 405.0),
        ])?;
        let mut swapped = HashSet::new();

        assert_eq!(pick(&bank, BranchId::A1, &swapped, Extreme::Min), Some(1));
        assert_eq!(pick(&bank, BranchId::A1, &swapped, Extreme::Max), Some(3));

        swapped.insert(2);
        swapped.insert(4);
        assert_eq!(pick(&bank, BranchId::A1, &swapped, Extreme::Min), Some(2));
        assert_eq!(pick(&bank, BranchId::A1, &swapped, Extreme::Max), Some(4));

        swapped.extend([1, 3, 5]);
        assert_eq!(pick(&bank, BranchId::A1, &swapped, Extreme::Min), None);
        assert_eq!(pick(&bank, BranchId::A2, &HashSet::new(), Extreme::Max), None);
        Ok(())
    }

    #[test]
    fn test_run_balance_returns_units() -> Result<()> {
        let units = biased_bank(BranchId::A1, 1.05)?.into_units();
        let n = units.len();
        let opt = OptimizeOpt::new("R1", 10)?;

        let (results, units) = run_balance(units, &config(), &opt, Some(&LogProgress {}))?;

        assert_eq!(units.len(), n);
        let moved = units
            .iter()
            .filter(|u| u.branch == BranchId::A1 && u.adjusted_capacitance_uf < 1600.0 * 1.05)
            .count();
        assert_eq!(moved, results.permutations.len().min(4));
        Ok(())
    }
}
