use crate::{
    error::{ExpenseError, ScriptError},
    model::{
        ExpenseDraft, Roster, Script, ScriptOutcome, ScriptReport, ScriptStatement, TripSummary,
    },
};
use fxhash::FxHashSet;
use tripsplit_domain::{
    Allocator, BalanceAccumulator, Expense, ExpenseId, GreedySettlement, Money,
    SettlementCalculator, SettlementError, SettlementStrategy,
};

/// Records expenses against a roster and turns them into balances and
/// settlement plans.
pub struct TripProcessor<S = GreedySettlement> {
    allocator: Allocator,
    calculator: SettlementCalculator<S>,
    strict: bool,
}

impl TripProcessor<GreedySettlement> {
    pub fn new(allocator: Allocator) -> Self {
        Self::with_calculator(allocator, SettlementCalculator::greedy())
    }
}

impl Default for TripProcessor<GreedySettlement> {
    fn default() -> Self {
        Self::new(Allocator::default())
    }
}

impl<S: SettlementStrategy> TripProcessor<S> {
    pub fn with_calculator(allocator: Allocator, calculator: SettlementCalculator<S>) -> Self {
        Self {
            allocator,
            calculator,
            strict: false,
        }
    }

    /// When enabled, a ledger whose balances do not sum to zero is an error
    /// instead of a logged warning.
    pub fn with_strict_balance(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn record_expense(
        &self,
        roster: &Roster,
        id: ExpenseId,
        draft: &ExpenseDraft,
    ) -> Result<Expense, ExpenseError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ExpenseError::MissingTitle);
        }
        if !roster.contains(draft.payer) {
            return Err(ExpenseError::UnknownPayer(draft.payer));
        }
        if let Some(unknown) = draft
            .request
            .mode
            .participants()
            .find(|participant| !roster.contains(*participant))
        {
            return Err(ExpenseError::UnknownParticipant(unknown));
        }

        let allocation = self.allocator.allocate(&draft.request)?;
        if !allocation.total().is_positive() {
            return Err(ExpenseError::NonPositiveAmount(allocation.total()));
        }

        tracing::debug!(
            expense_id = %id,
            payer = %draft.payer,
            amount = %allocation.total(),
            share_count = allocation.shares().len(),
            "Expense recorded"
        );

        Ok(Expense {
            id,
            title: title.to_string(),
            payer: draft.payer,
            amount: allocation.total(),
            splits: allocation.into_shares(),
        })
    }

    /// Checks an already-built expense against the roster.
    pub fn validate_expense(&self, roster: &Roster, expense: &Expense) -> Result<(), ExpenseError> {
        if expense.title.trim().is_empty() {
            return Err(ExpenseError::MissingTitle);
        }
        if !expense.amount.is_positive() {
            return Err(ExpenseError::NonPositiveAmount(expense.amount));
        }
        if !roster.contains(expense.payer) {
            return Err(ExpenseError::UnknownPayer(expense.payer));
        }

        let mut seen = FxHashSet::default();
        for split in &expense.splits {
            if !roster.contains(split.participant) {
                return Err(ExpenseError::UnknownParticipant(split.participant));
            }
            if !seen.insert(split.participant) {
                return Err(ExpenseError::DuplicateParticipant(split.participant));
            }
            if split.amount.is_negative() {
                return Err(ExpenseError::NegativeShare {
                    participant: split.participant,
                    amount: split.amount,
                });
            }
        }

        let actual = Money::checked_sum(expense.splits.iter().map(|split| split.amount))
            .ok_or(ExpenseError::TotalOutOfRange)?;
        if actual != expense.amount {
            return Err(ExpenseError::SplitMismatch {
                expected: expense.amount,
                actual,
            });
        }

        Ok(())
    }

    pub fn summarize(
        &self,
        roster: &Roster,
        expenses: &[Expense],
    ) -> Result<TripSummary, SettlementError> {
        let mut accumulator = BalanceAccumulator::new(&roster.ids());
        accumulator
            .apply_all(expenses)
            .map_err(|_| SettlementError::AmountOutOfRange)?;

        let balances = accumulator.balances();
        if self.strict {
            self.calculator.check_consistency(&balances)?;
        }
        let settlement = self.calculator.settle(&balances)?;

        Ok(TripSummary {
            total_spend: accumulator.total_spend(),
            balances: accumulator.person_balances(),
            line_items: accumulator.into_line_items(),
            settlement,
        })
    }

    /// Records every expense of `script` and produces one report per
    /// command, each reflecting the ledger up to that line. A script without
    /// commands yields a single report for the whole ledger.
    pub fn run_script(&self, script: &Script) -> Result<ScriptOutcome, ScriptError> {
        let roster = script.roster();
        let mut expenses: Vec<Expense> = Vec::new();
        // Shares are non-negative, so every paid, owed and net figure stays
        // within the total spend.
        let mut total_spend = Money::ZERO;
        let mut reports = Vec::new();

        for stmt in script.statements() {
            match &stmt.statement {
                ScriptStatement::Expense(draft) => {
                    let id = ExpenseId(expenses.len() as u64 + 1);
                    let expense = self.record_expense(roster, id, draft).map_err(|source| {
                        ScriptError::Expense {
                            line: stmt.line,
                            source,
                        }
                    })?;
                    total_spend = total_spend.checked_add(expense.amount).ok_or(
                        ScriptError::Expense {
                            line: stmt.line,
                            source: ExpenseError::TotalOutOfRange,
                        },
                    )?;
                    expenses.push(expense);
                }
                ScriptStatement::Command(command) => {
                    let summary = self.summarize_at(roster, &expenses, stmt.line)?;
                    reports.push(ScriptReport {
                        line: stmt.line,
                        command: Some(*command),
                        summary,
                    });
                }
            }
        }

        if reports.is_empty() {
            let line = script.statements().last().map_or(0, |stmt| stmt.line);
            let summary = self.summarize_at(roster, &expenses, line)?;
            reports.push(ScriptReport {
                line,
                command: None,
                summary,
            });
        }

        tracing::debug!(
            member_count = roster.len(),
            expense_count = expenses.len(),
            report_count = reports.len(),
            "Script processed"
        );

        Ok(ScriptOutcome { expenses, reports })
    }

    fn summarize_at(
        &self,
        roster: &Roster,
        expenses: &[Expense],
        line: usize,
    ) -> Result<TripSummary, ScriptError> {
        self.summarize(roster, expenses)
            .map_err(|source| ScriptError::Settlement { line, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Command, ScriptStatementWithLine};
    use rstest::{fixture, rstest};
    use tripsplit_domain::{
        AllocationError, AllocationRequest, Balance, ParticipantId, ResidueAssignment, Share,
        TaxRate, Transfer,
    };

    const ALICE: ParticipantId = ParticipantId(1);
    const BOB: ParticipantId = ParticipantId(2);
    const CAROL: ParticipantId = ParticipantId(3);
    const STRANGER: ParticipantId = ParticipantId(99);

    #[fixture]
    fn roster() -> Roster {
        Roster::from_names(&["alice", "bob", "carol"]).expect("valid roster")
    }

    #[fixture]
    fn processor() -> TripProcessor {
        TripProcessor::default()
    }

    fn cents(value: i64) -> Money {
        Money::from_cents(value)
    }

    fn dinner() -> ExpenseDraft {
        ExpenseDraft {
            title: "Dinner".to_string(),
            payer: ALICE,
            request: AllocationRequest::equal(cents(3000), vec![ALICE, BOB, CAROL]),
        }
    }

    fn taxi() -> ExpenseDraft {
        ExpenseDraft {
            title: "Taxi".to_string(),
            payer: BOB,
            request: AllocationRequest::custom(vec![
                Share::new(ALICE, cents(400)),
                Share::new(BOB, cents(800)),
            ])
            .with_tax(TaxRate::from_percent(10.into()).expect("valid rate")),
        }
    }

    fn statement(line: usize, statement: ScriptStatement) -> ScriptStatementWithLine {
        ScriptStatementWithLine { line, statement }
    }

    #[rstest]
    fn records_equal_split(processor: TripProcessor, roster: Roster) {
        let expense = processor
            .record_expense(&roster, ExpenseId(1), &dinner())
            .expect("expense should record");

        assert_eq!(expense.title, "Dinner");
        assert_eq!(expense.amount, cents(3000));
        assert_eq!(
            expense.splits,
            vec![
                Share::new(ALICE, cents(1000)),
                Share::new(BOB, cents(1000)),
                Share::new(CAROL, cents(1000)),
            ]
        );
        assert_eq!(processor.validate_expense(&roster, &expense), Ok(()));
    }

    #[rstest]
    fn records_taxed_custom_split(processor: TripProcessor, roster: Roster) {
        let expense = processor
            .record_expense(&roster, ExpenseId(2), &taxi())
            .expect("expense should record");

        assert_eq!(expense.amount, cents(1320));
        assert_eq!(
            expense.splits,
            vec![Share::new(ALICE, cents(440)), Share::new(BOB, cents(880))]
        );
    }

    #[rstest]
    #[case::blank_title(
        ExpenseDraft { title: "   ".to_string(), ..dinner() },
        ExpenseError::MissingTitle
    )]
    #[case::unknown_payer(
        ExpenseDraft { payer: STRANGER, ..dinner() },
        ExpenseError::UnknownPayer(STRANGER)
    )]
    #[case::unknown_participant(
        ExpenseDraft {
            request: AllocationRequest::equal(cents(100), vec![ALICE, STRANGER]),
            ..dinner()
        },
        ExpenseError::UnknownParticipant(STRANGER)
    )]
    #[case::zero_amount(
        ExpenseDraft {
            request: AllocationRequest::equal(Money::ZERO, vec![ALICE, BOB]),
            ..dinner()
        },
        ExpenseError::NonPositiveAmount(Money::ZERO)
    )]
    #[case::allocation_rejected(
        ExpenseDraft {
            request: AllocationRequest::custom(vec![Share::new(ALICE, Money::ZERO)]),
            ..dinner()
        },
        ExpenseError::Allocation(AllocationError::NonPositiveTotal(Money::ZERO))
    )]
    fn rejects_invalid_drafts(
        processor: TripProcessor,
        roster: Roster,
        #[case] draft: ExpenseDraft,
        #[case] expected: ExpenseError,
    ) {
        assert_eq!(
            processor.record_expense(&roster, ExpenseId(1), &draft),
            Err(expected)
        );
    }

    #[rstest]
    #[case::mismatch(
        vec![Share::new(ALICE, cents(1000)), Share::new(BOB, cents(999))],
        ExpenseError::SplitMismatch { expected: cents(2000), actual: cents(1999) }
    )]
    #[case::duplicate(
        vec![Share::new(ALICE, cents(1000)), Share::new(ALICE, cents(1000))],
        ExpenseError::DuplicateParticipant(ALICE)
    )]
    #[case::negative(
        vec![Share::new(ALICE, cents(2100)), Share::new(BOB, cents(-100))],
        ExpenseError::NegativeShare { participant: BOB, amount: cents(-100) }
    )]
    #[case::stranger(
        vec![Share::new(STRANGER, cents(2000))],
        ExpenseError::UnknownParticipant(STRANGER)
    )]
    #[case::split_sum_overflow(
        vec![Share::new(ALICE, cents(i64::MAX)), Share::new(BOB, cents(1))],
        ExpenseError::TotalOutOfRange
    )]
    fn validation_catches_inconsistent_expense(
        processor: TripProcessor,
        roster: Roster,
        #[case] splits: Vec<Share>,
        #[case] expected: ExpenseError,
    ) {
        let expense = Expense {
            id: ExpenseId(1),
            title: "Groceries".to_string(),
            payer: ALICE,
            amount: cents(2000),
            splits,
        };

        assert_eq!(processor.validate_expense(&roster, &expense), Err(expected));
    }

    #[rstest]
    fn summarizes_trip(processor: TripProcessor, roster: Roster) {
        let expenses = vec![
            processor
                .record_expense(&roster, ExpenseId(1), &dinner())
                .expect("dinner"),
            processor
                .record_expense(&roster, ExpenseId(2), &taxi())
                .expect("taxi"),
        ];

        let summary = processor
            .summarize(&roster, &expenses)
            .expect("ledger balances");

        assert_eq!(summary.total_spend, cents(4320));
        let nets: Vec<Balance> = summary
            .balances
            .iter()
            .map(|person| person.balance())
            .collect();
        assert_eq!(
            nets,
            vec![
                Balance::new(ALICE, cents(1560)),
                Balance::new(BOB, cents(-560)),
                Balance::new(CAROL, cents(-1000)),
            ]
        );
        assert_eq!(
            summary.settlement.transfers,
            vec![
                Transfer {
                    from: CAROL,
                    to: ALICE,
                    amount: cents(1000)
                },
                Transfer {
                    from: BOB,
                    to: ALICE,
                    amount: cents(560)
                },
            ]
        );
        assert!(summary.settlement.is_balanced());

        let (participant, alice_items) = &summary.line_items[0];
        assert_eq!(*participant, ALICE);
        let shares: Vec<Money> = alice_items.iter().map(|item| item.share).collect();
        assert_eq!(shares, vec![cents(1000), cents(440)]);
    }

    #[rstest]
    fn strict_mode_rejects_imbalanced_ledger(roster: Roster) {
        let broken = Expense {
            id: ExpenseId(1),
            title: "Broken".to_string(),
            payer: ALICE,
            amount: cents(1000),
            splits: vec![Share::new(BOB, cents(900))],
        };

        let lenient = TripProcessor::default();
        let summary = lenient
            .summarize(&roster, std::slice::from_ref(&broken))
            .expect("lenient summary");
        assert_eq!(summary.settlement.residual, cents(100));
        assert!(!summary.settlement.is_balanced());

        let strict = TripProcessor::default().with_strict_balance(true);
        assert_eq!(
            strict.summarize(&roster, &[broken]),
            Err(SettlementError::ImbalancedTotal(cents(100)))
        );
    }

    #[rstest]
    fn summary_rejects_totals_out_of_range(processor: TripProcessor, roster: Roster) {
        let half = i64::MAX / 2 + 1;
        let expense = |id| Expense {
            id: ExpenseId(id),
            title: "Yacht".to_string(),
            payer: ALICE,
            amount: cents(half),
            splits: vec![Share::new(BOB, cents(half))],
        };

        assert_eq!(
            processor.summarize(&roster, &[expense(1), expense(2)]),
            Err(SettlementError::AmountOutOfRange)
        );
    }

    #[rstest]
    fn script_reports_state_at_each_command(processor: TripProcessor, roster: Roster) {
        let script = Script::new(
            roster,
            vec![
                statement(2, ScriptStatement::Expense(dinner())),
                statement(3, ScriptStatement::Command(Command::Balances)),
                statement(4, ScriptStatement::Expense(taxi())),
                statement(5, ScriptStatement::Command(Command::Settle)),
            ],
        );

        let outcome = processor.run_script(&script).expect("script runs");

        assert_eq!(outcome.expenses.len(), 2);
        assert_eq!(outcome.expenses[1].id, ExpenseId(2));
        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.reports[0].line, 3);
        assert_eq!(outcome.reports[0].command, Some(Command::Balances));
        assert_eq!(outcome.reports[0].summary.total_spend, cents(3000));
        assert_eq!(outcome.reports[1].line, 5);
        assert_eq!(outcome.reports[1].summary.total_spend, cents(4320));
    }

    #[rstest]
    fn script_without_commands_reports_once(processor: TripProcessor, roster: Roster) {
        let script = Script::new(
            roster,
            vec![statement(7, ScriptStatement::Expense(dinner()))],
        );

        let outcome = processor.run_script(&script).expect("script runs");

        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].line, 7);
        assert_eq!(outcome.reports[0].command, None);
    }

    #[rstest]
    fn script_error_carries_line(processor: TripProcessor, roster: Roster) {
        let script = Script::new(
            roster,
            vec![
                statement(1, ScriptStatement::Expense(dinner())),
                statement(
                    4,
                    ScriptStatement::Expense(ExpenseDraft {
                        payer: STRANGER,
                        ..dinner()
                    }),
                ),
            ],
        );

        let err = processor.run_script(&script).expect_err("unknown payer");
        assert_eq!(
            err,
            ScriptError::Expense {
                line: 4,
                source: ExpenseError::UnknownPayer(STRANGER),
            }
        );
        assert_eq!(err.line(), Some(4));
        assert_eq!(
            err.to_string(),
            "Line 4: Payer #99 is not a member of this trip"
        );
    }

    #[test]
    fn residue_policy_flows_through_processor() {
        let roster = Roster::from_names(&["a", "b", "c"]).expect("valid roster");
        let processor = TripProcessor::new(Allocator::new(ResidueAssignment::FirstInOrder));
        let draft = ExpenseDraft {
            title: "Lunch".to_string(),
            payer: ALICE,
            request: AllocationRequest::custom(vec![
                Share::new(ALICE, cents(333)),
                Share::new(BOB, cents(333)),
                Share::new(CAROL, cents(334)),
            ])
            .with_tax(TaxRate::from_percent("8.25".parse().expect("decimal")).expect("rate")),
        };

        let expense = processor
            .record_expense(&roster, ExpenseId(1), &draft)
            .expect("expense should record");

        assert_eq!(expense.splits[0].amount, cents(361));
        assert_eq!(expense.amount, cents(1083));
    }

    #[rstest]
    #[case::empty(&[], crate::RosterError::Empty)]
    #[case::duplicate(&["a", "b", "a"], crate::RosterError::DuplicateName("a".to_string()))]
    fn roster_rejects_bad_declarations(
        #[case] names: &[&str],
        #[case] expected: crate::RosterError,
    ) {
        assert_eq!(Roster::from_names(names), Err(expected));
    }
}
