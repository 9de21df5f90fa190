pub const MEMBER: &str = "Member";
pub const PAID: &str = "Paid";
pub const OWED: &str = "Owed";
pub const NET: &str = "Net";
pub const FROM: &str = "From";
pub const TO: &str = "To";
pub const AMOUNT: &str = "Amount";
pub const EXPENSE: &str = "Expense";
pub const PAID_BY: &str = "Paid by";
pub const TOTAL: &str = "Total";
pub const SHARE: &str = "Share";
pub const SPLIT_AMONG: &str = "Split among";
pub const ALL_SETTLED: &str = "All settled up.";
pub const NO_EXPENSES: &str = "No expenses recorded.";

pub fn total_spend(amount: impl std::fmt::Display) -> String {
    format!("Total spend: {amount}")
}

pub fn residual_warning(residual: impl std::fmt::Display) -> String {
    format!("Warning: balances do not sum to zero (off by {residual}); some debts remain unsettled")
}
