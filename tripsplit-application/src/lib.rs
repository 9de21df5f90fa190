#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod model;
pub mod ports;
pub mod trip_processor;

pub use error::{ExpenseError, RosterError, ScriptError};
pub use model::{
    Command, ExpenseDraft, Roster, Script, ScriptOutcome, ScriptReport, ScriptStatement,
    ScriptStatementWithLine, TripSummary,
};
pub use ports::{LedgerParser, MemberDirectory};
pub use trip_processor::TripProcessor;
