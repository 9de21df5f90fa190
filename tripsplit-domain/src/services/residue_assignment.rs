//! Placement of the rounding residue left after scaling shares.
//!
//! Scaling each share independently and rounding to the cent rarely lands on
//! the exactly-scaled total. The difference (a few cents, either sign) has to
//! go somewhere; [`ResidueAssignment`] names where.

use crate::model::{Money, Share};
use std::{cmp::Reverse, fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResidueAssignment {
    /// The last participant in input order absorbs the whole residue.
    #[default]
    LastInOrder,
    /// The first participant in input order absorbs the whole residue.
    FirstInOrder,
    /// The participant with the largest share absorbs it; earlier entries win ties.
    LargestShare,
    /// One cent per participant, cycling in input order.
    RoundRobin,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown residue assignment '{0}' (expected last, first, largest or round-robin)")]
pub struct UnknownResidueAssignment(pub String);

impl ResidueAssignment {
    /// Adds `residue_cents` to `shares` and returns whatever could not be placed.
    ///
    /// A negative residue never pushes a share below zero; when the preferred
    /// participant cannot absorb all of it the rest is taken from the next
    /// candidate in this policy's ordering. The return value is only non-zero
    /// when the shares together hold less than the negative residue.
    pub fn assign(self, shares: &mut [Share], residue_cents: i64) -> i64 {
        if residue_cents == 0 || shares.is_empty() {
            return residue_cents;
        }

        match self {
            Self::RoundRobin => assign_round_robin(shares, residue_cents),
            Self::LastInOrder | Self::FirstInOrder | Self::LargestShare => {
                let order = self.candidate_order(shares);
                assign_lump(shares, &order, residue_cents)
            }
        }
    }

    fn candidate_order(self, shares: &[Share]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..shares.len()).collect();
        match self {
            Self::LastInOrder => order.reverse(),
            Self::FirstInOrder | Self::RoundRobin => {}
            Self::LargestShare => {
                // sort_by_key is stable, so equal shares keep input order
                order.sort_by_key(|&idx| Reverse(shares[idx].amount));
            }
        }
        order
    }
}

fn assign_lump(shares: &mut [Share], order: &[usize], residue_cents: i64) -> i64 {
    if residue_cents > 0 {
        if let Some(share) = order.first().and_then(|&idx| shares.get_mut(idx)) {
            share.amount += Money::from_cents(residue_cents);
            return 0;
        }
        return residue_cents;
    }

    let mut remaining = -residue_cents;
    for &idx in order {
        if remaining == 0 {
            break;
        }
        let Some(share) = shares.get_mut(idx) else {
            continue;
        };
        let taken = remaining.min(share.amount.cents().max(0));
        share.amount -= Money::from_cents(taken);
        remaining -= taken;
    }
    -remaining
}

fn assign_round_robin(shares: &mut [Share], residue_cents: i64) -> i64 {
    let step = residue_cents.signum();
    let mut remaining = residue_cents.abs();

    while remaining > 0 {
        let mut progressed = false;
        for share in shares.iter_mut() {
            if remaining == 0 {
                break;
            }
            if step < 0 && !share.amount.is_positive() {
                continue;
            }
            share.amount += Money::from_cents(step);
            remaining -= 1;
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    remaining * step
}

impl fmt::Display for ResidueAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LastInOrder => "last",
            Self::FirstInOrder => "first",
            Self::LargestShare => "largest",
            Self::RoundRobin => "round-robin",
        };
        f.write_str(name)
    }
}

impl FromStr for ResidueAssignment {
    type Err = UnknownResidueAssignment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" | "last-in-order" => Ok(Self::LastInOrder),
            "first" | "first-in-order" => Ok(Self::FirstInOrder),
            "largest" | "largest-share" => Ok(Self::LargestShare),
            "round-robin" | "roundrobin" => Ok(Self::RoundRobin),
            _ => Err(UnknownResidueAssignment(s.to_string())),
        }
    }
}
