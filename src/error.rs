use crate::topology::{BranchId, Node};
use thiserror::Error;

/// Errors raised while building a bank or evaluating its network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BankError {
    /// Missing or inconsistent configuration values.
    #[error("configuration error: {0}")]
    Config(String),

    /// Rack identifier outside the fixed topology.
    #[error("invalid rack {0:?}: expected one of R1, R2")]
    InvalidRack(String),

    /// Branch with no capacitor units placed in it.
    #[error("branch {0} has no capacitor units")]
    EmptyBranch(BranchId),

    /// Series combination whose operands sum to zero.
    #[error("degenerate network at {node}: {reason}")]
    Degenerate { node: Node, reason: String },

    /// Adjusted capacitance that is zero, negative or not finite.
    #[error("unit at position {position} has invalid adjusted capacitance {value} uF")]
    InvalidCapacitance { position: usize, value: f64 },

    #[error("position {0} is assigned to more than one unit")]
    DuplicatePosition(usize),

    /// Placement fields that disagree with the topology table.
    #[error("unit at position {position}: {reason}")]
    PlacementMismatch { position: usize, reason: String },
}

pub type BankResult<T> = Result<T, BankError>;
