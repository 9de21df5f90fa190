use tripsplit_application::{
    Command, ExpenseDraft, LedgerParser, Roster, Script, ScriptError, ScriptStatement,
    ScriptStatementWithLine,
};
use tripsplit_domain::{AllocationRequest, Money, ParticipantId, Share, TaxRate};
use tripsplit_parser::{
    Command as ParserCommand, ExpenseStatement, ParseError, Split, Statement as ParserStatement,
    parse_program,
};

const DEFAULT_TITLE: &str = "Expense";

/// Adapts the text ledger format to the application's [`Script`].
#[derive(Default)]
pub struct LedgerScriptParser;

impl LedgerParser for LedgerScriptParser {
    fn parse(&self, content: &str) -> Result<Script, ScriptError> {
        let program = parse_program(content).map_err(|err| match err {
            ParseError::SyntaxError { line, detail } => ScriptError::Syntax { line, detail },
        })?;

        let mut roster: Option<Roster> = None;
        let mut statements = Vec::with_capacity(program.statements.len());

        for stmt in program.statements {
            let tripsplit_parser::StatementWithLine { line, statement } = stmt;
            match statement {
                ParserStatement::Members(names) => {
                    if roster.is_some() {
                        return Err(ScriptError::RosterRedeclared { line });
                    }
                    let declared = Roster::from_names(&names)
                        .map_err(|source| ScriptError::Roster { line, source })?;
                    tracing::debug!(line, member_count = declared.len(), "Members declared");
                    roster = Some(declared);
                }
                ParserStatement::Expense(expense) => {
                    let Some(roster) = roster.as_ref() else {
                        return Err(ScriptError::MissingMembersDeclaration { line });
                    };
                    statements.push(ScriptStatementWithLine {
                        line,
                        statement: ScriptStatement::Expense(to_draft(roster, &expense, line)?),
                    });
                }
                ParserStatement::Command(command) => {
                    if roster.is_none() {
                        return Err(ScriptError::MissingMembersDeclaration { line });
                    }
                    let command = match command {
                        ParserCommand::Balances => Command::Balances,
                        ParserCommand::Settle => Command::Settle,
                    };
                    statements.push(ScriptStatementWithLine {
                        line,
                        statement: ScriptStatement::Command(command),
                    });
                }
            }
        }

        let roster = roster.ok_or(ScriptError::EmptyScript)?;
        Ok(Script::new(roster, statements))
    }
}

fn resolve(roster: &Roster, name: &str, line: usize) -> Result<ParticipantId, ScriptError> {
    roster
        .resolve(name)
        .ok_or_else(|| ScriptError::UnknownMember {
            name: name.to_string(),
            line,
        })
}

fn to_draft(
    roster: &Roster,
    expense: &ExpenseStatement<'_>,
    line: usize,
) -> Result<ExpenseDraft, ScriptError> {
    let payer = resolve(roster, expense.payer, line)?;
    let split = expense.split().map_err(|err| ScriptError::Syntax {
        line,
        detail: err.to_string(),
    })?;
    let to_money =
        |value| Money::from_decimal(value).map_err(|source| ScriptError::InvalidAmount { line, source });

    let request = match split {
        Split::Equal { amount, members } => {
            let participants = members
                .into_iter()
                .map(|name| resolve(roster, name, line))
                .collect::<Result<Vec<_>, _>>()?;
            AllocationRequest::equal(to_money(amount)?, participants)
        }
        Split::Custom { shares } => {
            let shares = shares
                .into_iter()
                .map(|(name, amount)| -> Result<Share, ScriptError> {
                    Ok(Share::new(resolve(roster, name, line)?, to_money(amount)?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllocationRequest::custom(shares)
        }
    };

    let request = match expense.tax_percent {
        Some(percent) => request.with_tax(
            TaxRate::from_percent(percent)
                .map_err(|source| ScriptError::InvalidTaxRate { line, source })?,
        ),
        None => request,
    };

    Ok(ExpenseDraft {
        title: expense.title.unwrap_or(DEFAULT_TITLE).to_string(),
        payer,
        request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALICE: ParticipantId = ParticipantId(1);
    const BOB: ParticipantId = ParticipantId(2);
    const CAROL: ParticipantId = ParticipantId(3);

    fn parse(content: &str) -> Result<Script, ScriptError> {
        LedgerScriptParser.parse(content)
    }

    fn draft_at(script: &Script, idx: usize) -> &ExpenseDraft {
        match &script.statements()[idx].statement {
            ScriptStatement::Expense(draft) => draft,
            ScriptStatement::Command(command) => panic!("expected expense, got {command:?}"),
        }
    }

    #[test]
    fn converts_script() {
        let script = parse(
            "MEMBERS := alice, bob, carol\n\
             alice paid 30.00 for alice, bob, carol \"Dinner\"\n\
             bob paid for alice 4.00, bob 8.00 tax 10% \"Taxi\"\n\
             !settle",
        )
        .expect("script should parse");

        assert_eq!(script.roster().ids(), vec![ALICE, BOB, CAROL]);
        assert_eq!(script.statements().len(), 3);

        let dinner = draft_at(&script, 0);
        assert_eq!(dinner.title, "Dinner");
        assert_eq!(dinner.payer, ALICE);
        assert_eq!(
            dinner.request,
            AllocationRequest::equal(Money::from_cents(3000), vec![ALICE, BOB, CAROL])
        );

        let taxi = draft_at(&script, 1);
        assert_eq!(taxi.payer, BOB);
        assert_eq!(
            taxi.request,
            AllocationRequest::custom(vec![
                Share::new(ALICE, Money::from_cents(400)),
                Share::new(BOB, Money::from_cents(800)),
            ])
            .with_tax("10".parse().expect("tax rate"))
        );

        assert_eq!(script.statements()[2].line, 4);
        assert_eq!(
            script.statements()[2].statement,
            ScriptStatement::Command(Command::Settle)
        );
    }

    #[test]
    fn untitled_expense_gets_default_title() {
        let script = parse("MEMBERS := a, b\na paid 5 for a, b").expect("script should parse");
        assert_eq!(draft_at(&script, 0).title, "Expense");
    }

    #[rstest]
    #[case::no_members("", ScriptError::EmptyScript)]
    #[case::expense_before_members(
        "alice paid 5 for alice\nMEMBERS := alice",
        ScriptError::MissingMembersDeclaration { line: 1 }
    )]
    #[case::command_before_members("!balances", ScriptError::MissingMembersDeclaration { line: 1 })]
    #[case::redeclared(
        "MEMBERS := a\nMEMBERS := b",
        ScriptError::RosterRedeclared { line: 2 }
    )]
    #[case::duplicate_member(
        "MEMBERS := a, a",
        ScriptError::Roster {
            line: 1,
            source: tripsplit_application::RosterError::DuplicateName("a".to_string()),
        }
    )]
    #[case::unknown_payer(
        "MEMBERS := a, b\n\nzed paid 5 for a",
        ScriptError::UnknownMember { name: "zed".to_string(), line: 3 }
    )]
    #[case::unknown_target(
        "MEMBERS := a, b\nb paid for a 1, zed 2",
        ScriptError::UnknownMember { name: "zed".to_string(), line: 2 }
    )]
    #[case::syntax(
        "MEMBERS := a\na paid five for a",
        ScriptError::Syntax { line: 2, detail: "unexpected input near 'five for a'".to_string() }
    )]
    fn reports_script_errors(#[case] content: &str, #[case] expected: ScriptError) {
        assert_eq!(parse(content).err(), Some(expected));
    }
}
