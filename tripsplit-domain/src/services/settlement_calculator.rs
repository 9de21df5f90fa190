use crate::model::{Balance, Money, ParticipantId, Settlement, Transfer};
use indexmap::IndexMap;
use std::cmp::Reverse;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Sum of balances must be zero (found {0})")]
    ImbalancedTotal(Money),
    #[error("Balances are too large to settle")]
    AmountOutOfRange,
}

/// Produces transfers that move every balance toward zero.
pub trait SettlementStrategy: Send + Sync {
    fn transfers(&self, balances: &[Balance]) -> Vec<Transfer>;
}

/// Pairs the largest remaining creditor with the largest remaining debtor.
///
/// Equal amounts keep their input order, so the same balances always yield
/// the same plan. Not guaranteed to find the fewest transfers.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedySettlement;

impl SettlementStrategy for GreedySettlement {
    fn transfers(&self, balances: &[Balance]) -> Vec<Transfer> {
        let mut creditors: Vec<(ParticipantId, i64)> = balances
            .iter()
            .filter(|balance| balance.net.is_positive())
            .map(|balance| (balance.participant, balance.net.cents()))
            .collect();
        // Debts are stored as positive remaining amounts.
        let mut debtors: Vec<(ParticipantId, u64)> = balances
            .iter()
            .filter(|balance| balance.net.is_negative())
            .map(|balance| (balance.participant, balance.net.cents().unsigned_abs()))
            .collect();

        creditors.sort_by_key(|&(_, amount)| Reverse(amount));
        debtors.sort_by_key(|&(_, amount)| Reverse(amount));

        let mut transfers = Vec::with_capacity(creditors.len().max(debtors.len()));
        let mut debtor_idx = 0;
        let mut creditor_idx = 0;

        while let (Some(debtor), Some(creditor)) =
            (debtors.get_mut(debtor_idx), creditors.get_mut(creditor_idx))
        {
            let amount = i64::try_from(debtor.1).map_or(creditor.1, |debt| debt.min(creditor.1));
            if amount > 0 {
                transfers.push(Transfer {
                    from: debtor.0,
                    to: creditor.0,
                    amount: Money::from_cents(amount),
                });
            }

            debtor.1 -= amount.unsigned_abs();
            creditor.1 -= amount;

            if debtor.1 == 0 {
                debtor_idx += 1;
            }
            if creditor.1 == 0 {
                creditor_idx += 1;
            }
        }

        transfers
    }
}

/// Settlement service
pub struct SettlementCalculator<S = GreedySettlement> {
    strategy: S,
}

impl SettlementCalculator<GreedySettlement> {
    pub fn greedy() -> Self {
        Self::new(GreedySettlement)
    }
}

impl Default for SettlementCalculator<GreedySettlement> {
    fn default() -> Self {
        Self::greedy()
    }
}

impl<S: SettlementStrategy> SettlementCalculator<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    /// Calculate the transfers that settle `balances`.
    ///
    /// Repeated entries for one participant are merged first. Whatever the
    /// strategy leaves open (only possible when the balances do not sum to
    /// zero) is reported through `residual` and `unsettled` instead of being
    /// dropped.
    pub fn settle(&self, balances: &[Balance]) -> Result<Settlement, SettlementError> {
        let merged = merge_balances(balances)?;
        let residual =
            Money::checked_sum(merged.values().copied()).ok_or(SettlementError::AmountOutOfRange)?;

        if !residual.is_zero() {
            tracing::warn!(
                residual = %residual,
                participant_count = merged.len(),
                "Settlement input does not sum to zero; residual left unsettled"
            );
        }

        let merged_balances: Vec<Balance> = merged
            .iter()
            .map(|(&participant, &net)| Balance::new(participant, net))
            .collect();
        let transfers = self.strategy.transfers(&merged_balances);

        let mut remaining = merged;
        for transfer in &transfers {
            if let Some(balance) = remaining.get_mut(&transfer.from) {
                *balance = balance
                    .checked_add(transfer.amount)
                    .ok_or(SettlementError::AmountOutOfRange)?;
            }
            if let Some(balance) = remaining.get_mut(&transfer.to) {
                *balance = balance
                    .checked_sub(transfer.amount)
                    .ok_or(SettlementError::AmountOutOfRange)?;
            }
        }

        let unsettled: Vec<Balance> = remaining
            .into_iter()
            .filter(|(_, net)| !net.is_zero())
            .map(|(participant, net)| Balance::new(participant, net))
            .collect();

        tracing::debug!(
            participant_count = merged_balances.len(),
            transfer_count = transfers.len(),
            unsettled_count = unsettled.len(),
            residual = %residual,
            "Settlement calculated"
        );

        Ok(Settlement {
            transfers,
            residual,
            unsettled,
        })
    }

    /// Fails when the balances do not sum to zero.
    pub fn check_consistency(&self, balances: &[Balance]) -> Result<(), SettlementError> {
        let residual = Money::checked_sum(balances.iter().map(|balance| balance.net))
            .ok_or(SettlementError::AmountOutOfRange)?;
        if residual.is_zero() {
            Ok(())
        } else {
            Err(SettlementError::ImbalancedTotal(residual))
        }
    }
}

fn merge_balances(balances: &[Balance]) -> Result<IndexMap<ParticipantId, Money>, SettlementError> {
    let mut merged: IndexMap<ParticipantId, Money> = IndexMap::with_capacity(balances.len());
    for balance in balances {
        let net = merged.entry(balance.participant).or_insert(Money::ZERO);
        *net = net
            .checked_add(balance.net)
            .ok_or(SettlementError::AmountOutOfRange)?;
    }
    Ok(merged)
}
