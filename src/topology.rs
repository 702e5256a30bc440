use crate::error::BankError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rack of the phase. The two racks are connected in series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RackId {
    R1,
    R2,
}

/// Leg of a rack. Each rack holds two legs in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LegId {
    P1,
    P2,
    P3,
    P4,
}

/// Branch of a leg. Each leg holds two branches in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BranchId {
    A1,
    A2,
    B1,
    B2,
    A3,
    A4,
    B3,
    B4,
}

struct RackEntry {
    rack: RackId,
    legs: [LegId; 2],
}

struct LegEntry {
    leg: LegId,
    rack: RackId,
    branches: [BranchId; 2],
}

// Physical wiring of one phase of the bank.
const RACKS: [RackEntry; 2] = [
    RackEntry {
        rack: RackId::R1,
        legs: [LegId::P1, LegId::P2],
    },
    RackEntry {
        rack: RackId::R2,
        legs: [LegId::P3, LegId::P4],
    },
];

const LEGS: [LegEntry; 4] = [
    LegEntry {
        leg: LegId::P1,
        rack: RackId::R1,
        branches: [BranchId::A1, BranchId::A2],
    },
    LegEntry {
        leg: LegId::P2,
        rack: RackId::R1,
        branches: [BranchId::B1, BranchId::B2],
    },
    LegEntry {
        leg: LegId::P3,
        rack: RackId::R2,
        branches: [BranchId::A3, BranchId::A4],
    },
    LegEntry {
        leg: LegId::P4,
        rack: RackId::R2,
        branches: [BranchId::B3, BranchId::B4],
    },
];

impl RackId {
    pub const ALL: [RackId; 2] = [RackId::R1, RackId::R2];

    fn entry(self) -> &'static RackEntry {
        &RACKS[self as usize]
    }

    /// The two legs of the rack, first leg first.
    pub fn legs(self) -> [LegId; 2] {
        self.entry().legs
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RackId::R1 => "R1",
            RackId::R2 => "R2",
        }
    }
}

impl LegId {
    pub const ALL: [LegId; 4] = [LegId::P1, LegId::P2, LegId::P3, LegId::P4];

    fn entry(self) -> &'static LegEntry {
        &LEGS[self as usize]
    }

    pub fn rack(self) -> RackId {
        self.entry().rack
    }

    pub fn branches(self) -> [BranchId; 2] {
        self.entry().branches
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LegId::P1 => "P1",
            LegId::P2 => "P2",
            LegId::P3 => "P3",
            LegId::P4 => "P4",
        }
    }
}

impl BranchId {
    pub const ALL: [BranchId; 8] = [
        BranchId::A1,
        BranchId::A2,
        BranchId::B1,
        BranchId::B2,
        BranchId::A3,
        BranchId::A4,
        BranchId::B3,
        BranchId::B4,
    ];

    /// Parent leg, looked up in the wiring table.
    pub fn leg(self) -> LegId {
        LEGS.iter()
            .find(|l| l.branches.contains(&self))
            .map(|l| l.leg)
            .unwrap_or_else(|| unreachable!("branch {} missing from wiring table", self))
    }

    pub fn rack(self) -> RackId {
        self.leg().rack()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BranchId::A1 => "A1",
            BranchId::A2 => "A2",
            BranchId::B1 => "B1",
            BranchId::B2 => "B2",
            BranchId::A3 => "A3",
            BranchId::A4 => "A4",
            BranchId::B3 => "B3",
            BranchId::B4 => "B4",
        }
    }
}

impl fmt::Display for RackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RackId {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RackId::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BankError::InvalidRack(s.to_string()))
    }
}

impl FromStr for LegId {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LegId::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BankError::Config(format!("unknown leg {:?}", s)))
    }
}

impl FromStr for BranchId {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BranchId::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BankError::Config(format!("unknown branch {:?}", s)))
    }
}

/// Any node of the network, used to locate numeric failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Branch(BranchId),
    Leg(LegId),
    Rack(RackId),
    Phase,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Branch(b) => write!(f, "branch {}", b),
            Node::Leg(l) => write!(f, "leg {}", l),
            Node::Rack(r) => write!(f, "rack {}", r),
            Node::Phase => f.write_str("phase"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{format_err, Result};

    #[test]
    fn test_wiring_table() -> Result<()> {
        assert_eq!(RackId::R1.legs(), [LegId::P1, LegId::P2]);
        assert_eq!(RackId::R2.legs(), [LegId::P3, LegId::P4]);
        assert_eq!(LegId::P3.branches(), [BranchId::A3, BranchId::A4]);
        assert_eq!(LegId::P4.branches(), [BranchId::B3, BranchId::B4]);

        for rack in RackId::ALL {
            for leg in rack.legs() {
                if leg.rack() != rack {
                    return Err(format_err!("leg {} must belong to rack {}", leg, rack));
                }
                for br in leg.branches() {
                    if br.leg() != leg || br.rack() != rack {
                        return Err(format_err!("branch {} must belong to leg {}", br, leg));
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_parse_ids() -> Result<()> {
        assert_eq!("R2".parse::<RackId>()?, RackId::R2);
        assert_eq!(" p4 ".parse::<LegId>()?, LegId::P4);
        assert_eq!("B3".parse::<BranchId>()?, BranchId::B3);

        match "R3".parse::<RackId>() {
            Err(BankError::InvalidRack(s)) => assert_eq!(s, "R3"),
            other => return Err(format_err!("expected invalid rack, got {:?}", other)),
        }
        assert!("C1".parse::<BranchId>().is_err());
        Ok(())
    }
}
