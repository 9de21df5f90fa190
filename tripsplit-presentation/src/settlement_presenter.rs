use crate::{
    currency::{format_currency, format_signed_currency},
    labels,
    text_table::{Alignment, TextTableBuilder},
};
use std::borrow::Cow;
use tripsplit_application::{MemberDirectory, TripSummary};
use tripsplit_domain::{ParticipantId, PersonBalance, Settlement, Transfer};

pub struct SettlementPresenter;

pub struct SettlementView {
    pub total_spend: String,
    pub balance_table: String,
    /// `None` when nobody owes anything.
    pub transfer_table: Option<String>,
    pub residual_warning: Option<String>,
}

impl SettlementView {
    /// Balances section: total spend followed by the balance table.
    pub fn balances_text(&self) -> String {
        let mut text = format!("{}\n\n{}", self.total_spend, self.balance_table);
        if let Some(warning) = &self.residual_warning {
            text.push_str(warning);
            text.push('\n');
        }
        text
    }

    /// Settlement section: the transfer table, or a note that nothing is owed.
    pub fn transfers_text(&self) -> String {
        let mut text = match &self.transfer_table {
            Some(table) => table.clone(),
            None => format!("{}\n", labels::ALL_SETTLED),
        };
        if let Some(warning) = &self.residual_warning {
            text.push_str(warning);
            text.push('\n');
        }
        text
    }
}

impl SettlementPresenter {
    pub fn render(summary: &TripSummary) -> SettlementView {
        let empty_directory = EmptyMemberDirectory;
        Self::render_with_members(summary, &empty_directory)
    }

    pub fn render_with_members(
        summary: &TripSummary,
        member_directory: &dyn MemberDirectory,
    ) -> SettlementView {
        let balance_table = Self::build_balance_table(&summary.balances, member_directory);
        let transfer_table = if summary.settlement.transfers.is_empty() {
            None
        } else {
            Some(Self::build_transfer_table(
                &summary.settlement.transfers,
                member_directory,
            ))
        };

        SettlementView {
            total_spend: labels::total_spend(format_currency(summary.total_spend)),
            balance_table,
            transfer_table,
            residual_warning: Self::residual_warning(&summary.settlement),
        }
    }

    pub fn build_balance_table(
        person_balances: &[PersonBalance],
        member_directory: &dyn MemberDirectory,
    ) -> String {
        let headers = [
            Cow::Borrowed(labels::MEMBER),
            Cow::Borrowed(labels::PAID),
            Cow::Borrowed(labels::OWED),
            Cow::Borrowed(labels::NET),
        ];
        let mut builder = TextTableBuilder::new()
            .alignments(&[
                Alignment::Left,
                Alignment::Right,
                Alignment::Right,
                Alignment::Right,
            ])
            .headers(&headers);

        for person in person_balances {
            builder = builder.row([
                format_member_label(person.participant, member_directory),
                Cow::Owned(format_currency(person.paid)),
                Cow::Owned(format_currency(person.owed)),
                Cow::Owned(format_signed_currency(person.net())),
            ]);
        }

        builder.build()
    }

    pub fn build_transfer_table(
        transfers: &[Transfer],
        member_directory: &dyn MemberDirectory,
    ) -> String {
        let headers = [
            Cow::Borrowed(labels::FROM),
            Cow::Borrowed(labels::TO),
            Cow::Borrowed(labels::AMOUNT),
        ];
        let mut builder = TextTableBuilder::new()
            .alignments(&[Alignment::Left, Alignment::Left, Alignment::Right])
            .headers(&headers);

        for transfer in transfers {
            builder = builder.row([
                format_member_label(transfer.from, member_directory),
                format_member_label(transfer.to, member_directory),
                Cow::Owned(format_currency(transfer.amount)),
            ]);
        }

        builder.build()
    }

    fn residual_warning(settlement: &Settlement) -> Option<String> {
        (!settlement.is_balanced())
            .then(|| labels::residual_warning(format_signed_currency(settlement.residual)))
    }
}

struct EmptyMemberDirectory;

impl MemberDirectory for EmptyMemberDirectory {
    fn display_name(&self, _member_id: ParticipantId) -> Option<&str> {
        None
    }
}

pub(crate) fn format_member_label<'a>(
    member_id: ParticipantId,
    member_directory: &'a dyn MemberDirectory,
) -> Cow<'a, str> {
    match member_directory.display_name(member_id) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Owned(member_id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tripsplit_domain::{Balance, Money};

    fn cents(value: i64) -> Money {
        Money::from_cents(value)
    }

    fn person(id: u64, paid: i64, owed: i64) -> PersonBalance {
        PersonBalance {
            participant: ParticipantId(id),
            paid: cents(paid),
            owed: cents(owed),
        }
    }

    fn sample_summary() -> TripSummary {
        TripSummary {
            total_spend: cents(4320),
            balances: vec![person(1, 3000, 1440), person(2, 1320, 1880), person(3, 0, 1000)],
            line_items: Vec::new(),
            settlement: Settlement {
                transfers: vec![
                    Transfer {
                        from: ParticipantId(3),
                        to: ParticipantId(1),
                        amount: cents(1000),
                    },
                    Transfer {
                        from: ParticipantId(2),
                        to: ParticipantId(1),
                        amount: cents(560),
                    },
                ],
                residual: Money::ZERO,
                unsettled: Vec::new(),
            },
        }
    }

    fn directory() -> HashMap<ParticipantId, String> {
        HashMap::from([
            (ParticipantId(1), "alice".to_string()),
            (ParticipantId(2), "bob".to_string()),
            (ParticipantId(3), "carol".to_string()),
        ])
    }

    #[test]
    fn renders_balance_and_transfer_tables() {
        let view = SettlementPresenter::render_with_members(&sample_summary(), &directory());

        assert_eq!(view.total_spend, "Total spend: $43.20");
        assert_eq!(
            view.balance_table,
            "Member    Paid    Owed      Net\n\
             ------  ------  ------  -------\n\
             alice   $30.00  $14.40  +$15.60\n\
             bob     $13.20  $18.80   -$5.60\n\
             carol    $0.00  $10.00  -$10.00\n"
        );
        assert_eq!(
            view.transfer_table.as_deref(),
            Some(
                "From   To     Amount\n\
                 -----  -----  ------\n\
                 carol  alice  $10.00\n\
                 bob    alice   $5.60\n"
            )
        );
        assert!(view.residual_warning.is_none());
        assert!(view.balances_text().starts_with("Total spend: $43.20\n\nMember"));
    }

    #[test]
    fn falls_back_to_participant_ids_when_names_missing() {
        let view = SettlementPresenter::render(&sample_summary());

        assert!(view.balance_table.contains("#1"));
        assert!(
            view.transfer_table
                .as_ref()
                .expect("transfer table")
                .contains("#3")
        );
    }

    #[test]
    fn settled_trip_says_so() {
        let mut summary = sample_summary();
        summary.settlement.transfers.clear();

        let view = SettlementPresenter::render_with_members(&summary, &directory());

        assert!(view.transfer_table.is_none());
        assert_eq!(view.transfers_text(), "All settled up.\n");
    }

    #[test]
    fn imbalanced_trip_carries_warning() {
        let mut summary = sample_summary();
        summary.settlement.residual = cents(100);
        summary.settlement.unsettled = vec![Balance::new(ParticipantId(1), cents(100))];

        let view = SettlementPresenter::render_with_members(&summary, &directory());

        let warning = view.residual_warning.as_deref().expect("warning");
        assert!(warning.contains("+$1.00"));
        assert!(view.transfers_text().ends_with(&format!("{warning}\n")));
    }
}
