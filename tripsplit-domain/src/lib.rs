#![warn(clippy::uninlined_format_args)]

pub mod model;
pub mod services;

pub use model::{
    AllocationResult, Balance, BalanceAccumulator, Expense, ExpenseId, LineItem, Money,
    MoneyError, Participant, ParticipantId, PersonBalance, Settlement, Share, Transfer,
};
pub use services::{
    AllocationError, AllocationRequest, Allocator, GreedySettlement, ResidueAssignment,
    SettlementCalculator, SettlementError, SettlementStrategy, SplitMode, TaxRate,
};
