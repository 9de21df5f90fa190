use crate::{
    currency::format_currency,
    labels,
    settlement_presenter::format_member_label,
    text_table::{Alignment, TextTableBuilder},
};
use std::{borrow::Cow, fmt::Write as _};
use tripsplit_application::MemberDirectory;
use tripsplit_domain::{Expense, LineItem, ParticipantId};

pub struct ExpensePresenter;

impl ExpensePresenter {
    pub fn render_expenses(expenses: &[Expense], member_directory: &dyn MemberDirectory) -> String {
        if expenses.is_empty() {
            return format!("{}\n", labels::NO_EXPENSES);
        }

        let headers = [
            Cow::Borrowed("#"),
            Cow::Borrowed(labels::EXPENSE),
            Cow::Borrowed(labels::PAID_BY),
            Cow::Borrowed(labels::AMOUNT),
            Cow::Borrowed(labels::SPLIT_AMONG),
        ];
        let mut builder = TextTableBuilder::new()
            .alignments(&[
                Alignment::Right,
                Alignment::Left,
                Alignment::Left,
                Alignment::Right,
                Alignment::Left,
            ])
            .headers(&headers);

        for expense in expenses {
            let split_among = expense
                .splits
                .iter()
                .map(|split| format_member_label(split.participant, member_directory))
                .collect::<Vec<_>>()
                .join(", ");
            builder = builder.row([
                Cow::Owned(expense.id.to_string()),
                Cow::Borrowed(expense.title.as_str()),
                format_member_label(expense.payer, member_directory),
                Cow::Owned(format_currency(expense.amount)),
                Cow::Owned(split_among),
            ]);
        }

        builder.build()
    }

    /// One block per participant listing what they owe for each expense.
    pub fn render_line_items(
        line_items: &[(ParticipantId, Vec<LineItem>)],
        member_directory: &dyn MemberDirectory,
    ) -> String {
        let mut reply = String::with_capacity(512);

        for (participant, items) in line_items {
            if items.is_empty() {
                continue;
            }
            if !reply.is_empty() {
                reply.push('\n');
            }
            let _ = writeln!(
                &mut reply,
                "{}:",
                format_member_label(*participant, member_directory)
            );
            reply.push_str(&Self::build_line_item_table(items, member_directory));
        }

        reply
    }

    fn build_line_item_table(items: &[LineItem], member_directory: &dyn MemberDirectory) -> String {
        let headers = [
            Cow::Borrowed(labels::EXPENSE),
            Cow::Borrowed(labels::PAID_BY),
            Cow::Borrowed(labels::TOTAL),
            Cow::Borrowed(labels::SHARE),
        ];
        let mut builder = TextTableBuilder::new()
            .alignments(&[
                Alignment::Left,
                Alignment::Left,
                Alignment::Right,
                Alignment::Right,
            ])
            .headers(&headers);

        for item in items {
            builder = builder.row([
                Cow::Borrowed(item.title.as_str()),
                format_member_label(item.payer, member_directory),
                Cow::Owned(format_currency(item.expense_amount)),
                Cow::Owned(format_currency(item.share)),
            ]);
        }

        builder.build()
    }
}
