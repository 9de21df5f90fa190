use crate::{
    model::{AllocationResult, Money, ParticipantId, Share},
    services::ResidueAssignment,
};
use fxhash::FxHashSet;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Reasons an allocation request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("Cannot split {0} across an empty participant list")]
    EmptyParticipants(Money),
    #[error("Amount must not be negative (got {0})")]
    NegativeAmount(Money),
    #[error("Share for participant {participant} must not be negative (got {amount})")]
    NegativeShare {
        participant: ParticipantId,
        amount: Money,
    },
    #[error("Custom shares must add up to more than zero (got {0})")]
    NonPositiveTotal(Money),
    #[error("Tax rate must not be negative (got {0}%)")]
    NegativeTaxRate(Decimal),
    #[error("Tax rate '{0}' is not a number")]
    NonNumericTaxRate(String),
    #[error("Participant {0} appears more than once")]
    DuplicateParticipant(ParticipantId),
    #[error("Amount is too large to allocate")]
    AmountOutOfRange,
    #[error("Rounding residue of {0} could not be assigned to any share")]
    UnassignableResidue(Money),
}

/// Tax rate as a non-negative percentage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn from_percent(percent: Decimal) -> Result<Self, AllocationError> {
        if percent < Decimal::ZERO {
            return Err(AllocationError::NegativeTaxRate(percent));
        }
        Ok(Self(percent.normalize()))
    }

    pub fn percent(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Scales an amount in minor units by `1 + rate / 100`, rounding half away
    /// from zero to the nearest unit.
    pub fn apply(self, cents: i64) -> Result<i64, AllocationError> {
        if self.is_zero() {
            return Ok(cents);
        }
        let factor = Decimal::ONE + self.0 / Decimal::ONE_HUNDRED;
        Decimal::from(cents)
            .checked_mul(factor)
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|scaled| scaled.to_i64())
            .ok_or(AllocationError::AmountOutOfRange)
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for TaxRate {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
        let percent = Decimal::from_str(number)
            .map_err(|_| AllocationError::NonNumericTaxRate(s.to_string()))?;
        Self::from_percent(percent)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitMode {
    /// Divide `total` evenly; earlier participants absorb the remainder cents.
    Equal {
        total: Money,
        participants: Vec<ParticipantId>,
    },
    /// Caller-supplied base shares; their sum is the base total.
    Custom { shares: Vec<Share> },
}

impl SplitMode {
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        let (equal, custom) = match self {
            Self::Equal { participants, .. } => (participants.as_slice(), [].as_slice()),
            Self::Custom { shares } => ([].as_slice(), shares.as_slice()),
        };
        equal
            .iter()
            .copied()
            .chain(custom.iter().map(|share| share.participant))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationRequest {
    pub mode: SplitMode,
    pub tax_rate: TaxRate,
}

impl AllocationRequest {
    pub fn equal(total: Money, participants: Vec<ParticipantId>) -> Self {
        Self {
            mode: SplitMode::Equal {
                total,
                participants,
            },
            tax_rate: TaxRate::ZERO,
        }
    }

    pub fn custom(shares: Vec<Share>) -> Self {
        Self {
            mode: SplitMode::Custom { shares },
            tax_rate: TaxRate::ZERO,
        }
    }

    pub fn with_tax(mut self, tax_rate: TaxRate) -> Self {
        self.tax_rate = tax_rate;
        self
    }
}

/// Splits expense amounts into per-participant shares that add up exactly.
#[derive(Clone, Copy, Debug, Default)]
pub struct Allocator {
    residue: ResidueAssignment,
}

impl Allocator {
    pub fn new(residue: ResidueAssignment) -> Self {
        Self { residue }
    }

    pub fn residue_assignment(&self) -> ResidueAssignment {
        self.residue
    }

    pub fn allocate(&self, request: &AllocationRequest) -> Result<AllocationResult, AllocationError> {
        match &request.mode {
            SplitMode::Equal {
                total,
                participants,
            } => self.split_equal(*total, participants, request.tax_rate),
            SplitMode::Custom { shares } => self.split_custom(shares, request.tax_rate),
        }
    }

    pub fn split_equal(
        &self,
        total: Money,
        participants: &[ParticipantId],
        tax_rate: TaxRate,
    ) -> Result<AllocationResult, AllocationError> {
        if total.is_negative() {
            return Err(AllocationError::NegativeAmount(total));
        }
        ensure_distinct(participants.iter().copied())?;

        if participants.is_empty() {
            if total.is_zero() {
                return Ok(AllocationResult::empty());
            }
            return Err(AllocationError::EmptyParticipants(total));
        }

        let count =
            i64::try_from(participants.len()).map_err(|_| AllocationError::AmountOutOfRange)?;
        let cents = total.cents();
        let base = cents / count;
        let remainder = usize::try_from(cents % count).unwrap_or_default();

        let shares = participants
            .iter()
            .enumerate()
            .map(|(idx, &participant)| {
                let extra = i64::from(idx < remainder);
                Share::new(participant, Money::from_cents(base + extra))
            })
            .collect();

        self.apply_tax(shares, total, tax_rate)
    }

    pub fn split_custom(
        &self,
        shares: &[Share],
        tax_rate: TaxRate,
    ) -> Result<AllocationResult, AllocationError> {
        if let Some(share) = shares.iter().find(|share| share.amount.is_negative()) {
            return Err(AllocationError::NegativeShare {
                participant: share.participant,
                amount: share.amount,
            });
        }
        ensure_distinct(shares.iter().map(|share| share.participant))?;

        let base_total = Money::checked_sum(shares.iter().map(|share| share.amount))
            .ok_or(AllocationError::AmountOutOfRange)?;
        if !base_total.is_positive() {
            return Err(AllocationError::NonPositiveTotal(base_total));
        }

        self.apply_tax(shares.to_vec(), base_total, tax_rate)
    }

    fn apply_tax(
        &self,
        mut shares: Vec<Share>,
        base_total: Money,
        tax_rate: TaxRate,
    ) -> Result<AllocationResult, AllocationError> {
        if tax_rate.is_zero() {
            return Ok(AllocationResult::new(shares, base_total));
        }

        let target = tax_rate.apply(base_total.cents())?;
        let mut scaled_sum = 0_i64;
        for share in &mut shares {
            let scaled = tax_rate.apply(share.amount.cents())?;
            share.amount = Money::from_cents(scaled);
            scaled_sum = scaled_sum
                .checked_add(scaled)
                .ok_or(AllocationError::AmountOutOfRange)?;
        }

        let residue = target
            .checked_sub(scaled_sum)
            .ok_or(AllocationError::AmountOutOfRange)?;
        let unassigned = self.residue.assign(&mut shares, residue);

        tracing::debug!(
            base_total = %base_total,
            tax_rate = %tax_rate,
            target = target,
            scaled_sum = scaled_sum,
            residue = residue,
            residue_assignment = %self.residue,
            participant_count = shares.len(),
            "Tax applied to allocation"
        );

        if unassigned != 0 {
            tracing::error!(
                unassigned = unassigned,
                residue = residue,
                residue_assignment = %self.residue,
                "Allocation residue could not be placed"
            );
            return Err(AllocationError::UnassignableResidue(Money::from_cents(
                unassigned,
            )));
        }

        Ok(AllocationResult::new(shares, Money::from_cents(target)))
    }
}

fn ensure_distinct(
    participants: impl Iterator<Item = ParticipantId>,
) -> Result<(), AllocationError> {
    let mut seen = FxHashSet::default();
    for participant in participants {
        if !seen.insert(participant) {
            return Err(AllocationError::DuplicateParticipant(participant));
        }
    }
    Ok(())
}
