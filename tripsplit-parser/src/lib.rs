#![warn(clippy::uninlined_format_args)]

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till, take_until, take_while_m_n, take_while1},
    character::complete::{char, digit1, multispace1},
    combinator::{map_res, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded},
};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Target<'a> {
    pub name: &'a str,
    pub amount: Option<Decimal>,
}

/// `<payer> paid [<amount>] for <targets> [tax <rate>%] ["<title>"]`
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseStatement<'a> {
    pub payer: &'a str,
    pub amount: Option<Decimal>,
    pub targets: Vec<Target<'a>>,
    pub tax_percent: Option<Decimal>,
    pub title: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Split<'a> {
    Equal {
        amount: Decimal,
        members: Vec<&'a str>,
    },
    Custom {
        shares: Vec<(&'a str, Decimal)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SplitShapeError {
    #[error("amount given both after 'paid' and per participant")]
    AmountInBothPlaces,
    #[error("missing amount: give one after 'paid' or one per participant")]
    MissingAmount,
    #[error("every participant needs an amount when splitting by custom shares")]
    MixedTargets,
}

impl<'a> ExpenseStatement<'a> {
    /// Equal when the amount follows `paid`, custom when every target carries one.
    pub fn split(&self) -> Result<Split<'a>, SplitShapeError> {
        let with_amount = self
            .targets
            .iter()
            .filter(|target| target.amount.is_some())
            .count();

        match (self.amount, with_amount) {
            (Some(amount), 0) => Ok(Split::Equal {
                amount,
                members: self.targets.iter().map(|target| target.name).collect(),
            }),
            (Some(_), _) => Err(SplitShapeError::AmountInBothPlaces),
            (None, 0) => Err(SplitShapeError::MissingAmount),
            (None, n) if n == self.targets.len() => Ok(Split::Custom {
                shares: self
                    .targets
                    .iter()
                    .filter_map(|target| target.amount.map(|amount| (target.name, amount)))
                    .collect(),
            }),
            (None, _) => Err(SplitShapeError::MixedTargets),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Balances,
    Settle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    Members(Vec<&'a str>),
    Expense(ExpenseStatement<'a>),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementWithLine<'a> {
    pub line: usize,
    pub statement: Statement<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program<'a> {
    pub statements: Vec<StatementWithLine<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}: {detail}")]
    SyntaxError { line: usize, detail: String },
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-').parse(input)
}

fn sp(input: &str) -> IResult<&str, &str> {
    fn comment(input: &str) -> IResult<&str, &str> {
        delimited(tag("/*"), take_until("*/"), tag("*/")).parse(input)
    }

    fn line_comment(input: &str) -> IResult<&str, &str> {
        recognize((tag("//"), take_till(|c| c == '\n'))).parse(input)
    }

    recognize(many0(alt((multispace1, comment, line_comment)))).parse(input)
}

// 12, 12.5, 12.50, $12.50
fn amount(input: &str) -> IResult<&str, Decimal> {
    preceded(
        opt(char('$')),
        map_res(
            recognize((
                digit1,
                opt((
                    char('.'),
                    take_while_m_n(1, 2, |c: char| c.is_ascii_digit()),
                )),
            )),
            Decimal::from_str,
        ),
    )
    .parse(input)
}

fn percent(input: &str) -> IResult<&str, Decimal> {
    (
        map_res(recognize((digit1, opt((char('.'), digit1)))), Decimal::from_str),
        sp,
        opt(char('%')),
    )
        .map(|(rate, _, _)| rate)
        .parse(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(sp, char(','), sp).parse(input)
}

// name := a, b, c
fn members(input: &str) -> IResult<&str, Vec<&str>> {
    (
        tag_no_case("members"),
        sp,
        tag(":="),
        sp,
        separated_list1(comma, identifier),
    )
        .map(|(_, _, _, _, names)| names)
        .parse(input)
}

fn target(input: &str) -> IResult<&str, Target<'_>> {
    (identifier, opt(preceded(sp, amount)))
        .map(|(name, amount)| Target { name, amount })
        .parse(input)
}

fn tax(input: &str) -> IResult<&str, Decimal> {
    preceded((tag_no_case("tax"), sp), percent).parse(input)
}

fn title(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"')).parse(input)
}

fn expense(input: &str) -> IResult<&str, ExpenseStatement<'_>> {
    (
        identifier,
        sp,
        tag_no_case("paid"),
        opt(preceded(sp, amount)),
        sp,
        tag_no_case("for"),
        sp,
        separated_list1(comma, target),
        opt(preceded(sp, tax)),
        opt(preceded(sp, title)),
    )
        .map(
            |(payer, _, _, amount, _, _, _, targets, tax_percent, title)| ExpenseStatement {
                payer,
                amount,
                targets,
                tax_percent,
                title,
            },
        )
        .parse(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    alt((
        tag_no_case("!balances").map(|_| Command::Balances),
        tag_no_case("!settle").map(|_| Command::Settle),
    ))
    .parse(input)
}

fn statement(input: &str) -> IResult<&str, Statement<'_>> {
    alt((
        members.map(Statement::Members),
        command.map(Statement::Command),
        expense.map(Statement::Expense),
    ))
    .parse(input)
}

fn statement_with_sp(input: &str) -> IResult<&str, Statement<'_>> {
    (sp, statement, sp).map(|(_, stmt, _)| stmt).parse(input)
}

fn error_detail(err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Incomplete(_) => "unexpected end of line".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let near = e.input.trim();
            if near.is_empty() {
                "unexpected end of line".to_string()
            } else {
                format!("unexpected input near '{near}'")
            }
        }
    }
}

/// Parses a ledger script line by line. Expense lines are also checked for
/// a consistent split shape so later stages can rely on [`ExpenseStatement::split`].
pub fn parse_program(input: &str) -> Result<Program<'_>, ParseError> {
    let mut statements = Vec::new();
    // Line where a still-open `/*` started.
    let mut open_comment: Option<usize> = None;

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let mut line = raw_line;

        if open_comment.is_some() {
            let Some(end) = line.find("*/") else {
                continue;
            };
            line = &line[end + 2..];
            open_comment = None;
        }
        if let Some(start) = unclosed_block_comment(line) {
            line = &line[..start];
            open_comment = Some(line_no);
        }

        let (rest, _) = sp(line).map_err(|e| ParseError::SyntaxError {
            line: line_no,
            detail: error_detail(e),
        })?;
        if rest.trim().is_empty() {
            continue;
        }

        let (rest, stmt) = statement_with_sp(rest).map_err(|e| ParseError::SyntaxError {
            line: line_no,
            detail: error_detail(e),
        })?;
        if !rest.trim().is_empty() {
            return Err(ParseError::SyntaxError {
                line: line_no,
                detail: format!("unparsed input: {}", rest.trim()),
            });
        }
        if let Statement::Expense(expense) = &stmt {
            expense.split().map_err(|e| ParseError::SyntaxError {
                line: line_no,
                detail: e.to_string(),
            })?;
        }

        statements.push(StatementWithLine {
            line: line_no,
            statement: stmt,
        });
    }

    if let Some(line) = open_comment {
        return Err(ParseError::SyntaxError {
            line,
            detail: "unterminated block comment".to_string(),
        });
    }

    Ok(Program { statements })
}

/// Byte offset of a `/*` that is not closed on the same line, ignoring
/// quoted titles and `//` comments.
fn unclosed_block_comment(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut idx = 0;
    let mut in_quote = false;

    while idx < bytes.len() {
        match (bytes[idx], bytes.get(idx + 1)) {
            (b'"', _) => in_quote = !in_quote,
            (b'/', Some(b'/')) if !in_quote => return None,
            (b'/', Some(b'*')) if !in_quote => match line[idx + 2..].find("*/") {
                Some(end) => {
                    idx += end + 4;
                    continue;
                }
                None => return Some(idx),
            },
            _ => {}
        }
        idx += 1;
    }

    None
}
