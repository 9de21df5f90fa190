use thiserror::Error;
use tripsplit_domain::{AllocationError, Money, MoneyError, ParticipantId, SettlementError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpenseError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Payer {0} is not a member of this trip")]
    UnknownPayer(ParticipantId),
    #[error("Participant {0} is not a member of this trip")]
    UnknownParticipant(ParticipantId),
    #[error("Participant {0} appears more than once in the split")]
    DuplicateParticipant(ParticipantId),
    #[error("Amount must be positive (got {0})")]
    NonPositiveAmount(Money),
    #[error("Share for participant {participant} must not be negative (got {amount})")]
    NegativeShare {
        participant: ParticipantId,
        amount: Money,
    },
    #[error("Splits must equal total amount (expected {expected}, got {actual})")]
    SplitMismatch { expected: Money, actual: Money },
    #[error("Trip total is too large")]
    TotalOutOfRange,
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("At least one member is required")]
    Empty,
    #[error("Member '{0}' is declared more than once")]
    DuplicateName(String),
}

/// Failures while parsing or running a ledger script. Every variant that
/// originates from a statement carries its 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("Script contains no statements")]
    EmptyScript,
    #[error("Line {line}: {detail}")]
    Syntax { line: usize, detail: String },
    #[error("Line {line}: MEMBERS must be declared before expenses and commands")]
    MissingMembersDeclaration { line: usize },
    #[error("Line {line}: MEMBERS is already declared")]
    RosterRedeclared { line: usize },
    #[error("Line {line}: {source}")]
    Roster { line: usize, source: RosterError },
    #[error("Line {line}: '{name}' is not a declared member")]
    UnknownMember { name: String, line: usize },
    #[error("Line {line}: {source}")]
    InvalidAmount { line: usize, source: MoneyError },
    #[error("Line {line}: {source}")]
    InvalidTaxRate { line: usize, source: AllocationError },
    #[error("Line {line}: {source}")]
    Expense { line: usize, source: ExpenseError },
    #[error("Line {line}: {source}")]
    Settlement {
        line: usize,
        source: SettlementError,
    },
}

impl ScriptError {
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::EmptyScript => None,
            Self::Syntax { line, .. }
            | Self::MissingMembersDeclaration { line }
            | Self::RosterRedeclared { line }
            | Self::Roster { line, .. }
            | Self::UnknownMember { line, .. }
            | Self::InvalidAmount { line, .. }
            | Self::InvalidTaxRate { line, .. }
            | Self::Expense { line, .. }
            | Self::Settlement { line, .. } => Some(*line),
        }
    }
}
