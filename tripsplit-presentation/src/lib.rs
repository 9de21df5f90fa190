#![warn(clippy::uninlined_format_args)]

pub mod currency;
pub mod error_presenter;
pub mod expense_presenter;
pub mod labels;
pub mod settlement_presenter;
pub mod text_table;

pub use currency::{format_currency, format_signed_currency};
pub use error_presenter::format_script_error;
pub use expense_presenter::ExpensePresenter;
pub use settlement_presenter::{SettlementPresenter, SettlementView};
pub use text_table::{Alignment, TextTableBuilder};
