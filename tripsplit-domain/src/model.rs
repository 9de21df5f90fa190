use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),
    #[error("running total is out of range")]
    Overflow,
}

/// Monetary amount held as integer minor units (cents).
///
/// Decimal values only appear at the boundary: [`Money::from_decimal`] rounds
/// half away from zero to two fraction digits, [`Money::as_decimal`] and
/// `Display` always render exactly two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);
    pub const SCALE: u32 = 2;

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        value
            .round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|units| units.to_i64())
            .map(Self)
            .ok_or(MoneyError::OutOfRange(value))
    }

    pub fn as_decimal(self) -> Decimal {
        Decimal::new(self.0, Self::SCALE)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn signum(self) -> i64 {
        self.0.signum()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Sums `amounts`, or `None` if any partial sum leaves the `i64` range.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_| MoneyError::Invalid(s.to_string()))?;
        Self::from_decimal(value)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// A participant's portion of a single expense.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Share {
    pub participant: ParticipantId,
    pub amount: Money,
}

impl Share {
    pub fn new(participant: ParticipantId, amount: Money) -> Self {
        Self {
            participant,
            amount,
        }
    }
}

/// Shares produced by the allocator. The shares always add up to `total`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationResult {
    shares: Vec<Share>,
    total: Money,
}

impl AllocationResult {
    pub(crate) fn new(shares: Vec<Share>, total: Money) -> Self {
        debug_assert_eq!(shares.iter().map(|share| share.amount).sum::<Money>(), total);
        Self { shares, total }
    }

    pub fn empty() -> Self {
        Self {
            shares: Vec::new(),
            total: Money::ZERO,
        }
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn share_of(&self, participant: ParticipantId) -> Option<Money> {
        self.shares
            .iter()
            .find(|share| share.participant == participant)
            .map(|share| share.amount)
    }

    pub fn into_shares(self) -> Vec<Share> {
        self.shares
    }
}

/// Net position of a participant: positive means the group owes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Balance {
    pub participant: ParticipantId,
    pub net: Money,
}

impl Balance {
    pub fn new(participant: ParticipantId, net: Money) -> Self {
        Self { participant, net }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub transfers: Vec<Transfer>,
    /// Sum of every input balance. Zero for a closed ledger.
    pub residual: Money,
    /// Participants left with a non-zero balance after applying `transfers`.
    pub unsettled: Vec<Balance>,
}

impl Settlement {
    pub fn is_balanced(&self) -> bool {
        self.residual.is_zero() && self.unsettled.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpenseId(pub u64);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: ExpenseId,
    pub title: String,
    pub payer: ParticipantId,
    pub amount: Money,
    pub splits: Vec<Share>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersonBalance {
    pub participant: ParticipantId,
    pub paid: Money,
    pub owed: Money,
}

impl PersonBalance {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            paid: Money::ZERO,
            owed: Money::ZERO,
        }
    }

    pub fn net(&self) -> Money {
        self.paid - self.owed
    }

    pub fn balance(&self) -> Balance {
        Balance::new(self.participant, self.net())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub expense: ExpenseId,
    pub title: String,
    pub expense_amount: Money,
    pub payer: ParticipantId,
    pub share: Money,
}

/// Folds expenses into paid/owed totals per participant.
///
/// Roster members keep their roster position even if they never appear in an
/// expense; anyone else is appended the first time they are seen.
pub struct BalanceAccumulator {
    balances: IndexMap<ParticipantId, PersonBalance>,
    line_items: IndexMap<ParticipantId, Vec<LineItem>>,
    total_spend: Money,
}

impl BalanceAccumulator {
    pub fn new(roster: &[ParticipantId]) -> Self {
        let balances = roster
            .iter()
            .map(|&participant| (participant, PersonBalance::new(participant)))
            .collect();
        let line_items = roster
            .iter()
            .map(|&participant| (participant, Vec::new()))
            .collect();

        Self {
            balances,
            line_items,
            total_spend: Money::ZERO,
        }
    }

    /// Adds one expense. On overflow the accumulator is left untouched.
    pub fn apply(&mut self, expense: &Expense) -> Result<(), MoneyError> {
        let total_spend = self
            .total_spend
            .checked_add(expense.amount)
            .ok_or(MoneyError::Overflow)?;

        let mut staged: IndexMap<ParticipantId, PersonBalance> = IndexMap::new();
        let payer = self.stage(&mut staged, expense.payer);
        payer.paid = payer
            .paid
            .checked_add(expense.amount)
            .ok_or(MoneyError::Overflow)?;
        for split in &expense.splits {
            let person = self.stage(&mut staged, split.participant);
            person.owed = person
                .owed
                .checked_add(split.amount)
                .ok_or(MoneyError::Overflow)?;
        }
        if staged
            .values()
            .any(|person| person.paid.checked_sub(person.owed).is_none())
        {
            return Err(MoneyError::Overflow);
        }

        self.total_spend = total_spend;
        for (participant, person) in staged {
            self.line_items.entry(participant).or_default();
            self.balances.insert(participant, person);
        }
        for split in &expense.splits {
            self.line_items
                .entry(split.participant)
                .or_default()
                .push(LineItem {
                    expense: expense.id,
                    title: expense.title.clone(),
                    expense_amount: expense.amount,
                    payer: expense.payer,
                    share: split.amount,
                });
        }
        Ok(())
    }

    pub fn apply_all<'a>(
        &mut self,
        expenses: impl IntoIterator<Item = &'a Expense>,
    ) -> Result<(), MoneyError> {
        expenses
            .into_iter()
            .try_for_each(|expense| self.apply(expense))
    }

    fn stage<'s>(
        &self,
        staged: &'s mut IndexMap<ParticipantId, PersonBalance>,
        participant: ParticipantId,
    ) -> &'s mut PersonBalance {
        staged.entry(participant).or_insert_with(|| {
            self.balances
                .get(&participant)
                .copied()
                .unwrap_or_else(|| PersonBalance::new(participant))
        })
    }

    pub fn total_spend(&self) -> Money {
        self.total_spend
    }

    pub fn person_balances(&self) -> Vec<PersonBalance> {
        self.balances.values().copied().collect()
    }

    pub fn balances(&self) -> Vec<Balance> {
        self.balances.values().map(PersonBalance::balance).collect()
    }

    pub fn line_items(&self, participant: ParticipantId) -> &[LineItem] {
        self.line_items
            .get(&participant)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn into_line_items(self) -> Vec<(ParticipantId, Vec<LineItem>)> {
        self.line_items.into_iter().collect()
    }
}
