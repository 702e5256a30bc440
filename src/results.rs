use crate::config::BankConfig;
use crate::network::NetworkParams;
use crate::topology::BranchId;
use serde::Serialize;

/// Why the swap search stopped, or why it never started.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize)]
pub enum SearchStatus {
    /// Initial unbalance below the alarm threshold.
    AlreadyBalanced,
    /// Unbalanced, but the search was not requested.
    NotRequested,
    /// Unbalance at or below the tolerance.
    WithinTolerance,
    SwapLimitReached,
    /// A full scan found no swap that lowers the unbalance.
    NoImprovingSwap,
}

/// An accepted exchange of two units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Permutation {
    /// Branch of the first leg the low-capacitance unit came from.
    pub source_branch: BranchId,
    pub source_position: usize,
    /// Branch of the second leg the high-capacitance unit came from.
    pub target_branch: BranchId,
    pub target_position: usize,
    /// Unbalance current right after this swap (A).
    pub unbalance_current_a: f64,
    /// 1-based order of the swap.
    pub index: usize,
}

/// Outcome of a balancing run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceResults {
    pub is_balanced: bool,
    pub status: SearchStatus,
    /// Unbalance current before any swap (A).
    pub initial_unbalance_current_a: f64,
    pub permutations: Vec<Permutation>,
    /// Network state for the final placements.
    #[serde(flatten)]
    pub params: NetworkParams,
}

impl BalanceResults {
    pub(crate) fn assemble(
        params: NetworkParams,
        initial_unbalance_current_a: f64,
        permutations: Vec<Permutation>,
        status: SearchStatus,
        config: &BankConfig,
    ) -> Self {
        let is_balanced = status == SearchStatus::AlreadyBalanced
            || params.unbalance_current_a <= config.constraints.tolerance_a;
        Self {
            is_balanced,
            status,
            initial_unbalance_current_a,
            permutations,
            params,
        }
    }

    pub fn unbalance_current_a(&self) -> f64 {
        self.params.unbalance_current_a
    }

    pub fn swap_count(&self) -> usize {
        self.permutations.len()
    }
}
