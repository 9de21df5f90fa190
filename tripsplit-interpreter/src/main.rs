mod bootstrap;

use std::{borrow::Cow, env, fs, process};

use bootstrap::{AppConfig, init_logging};
use tripsplit_application::{
    Command, LedgerParser, Roster, ScriptOutcome, ScriptReport, TripProcessor,
};
use tripsplit_domain::Allocator;
use tripsplit_infrastructure::LedgerScriptParser;
use tripsplit_presentation::{ExpensePresenter, SettlementPresenter, format_script_error};

type CliResult<T> = Result<T, Cow<'static, str>>;

fn main() {
    init_logging();

    if let Err(err) = run() {
        tracing::error!(%err, "Interpreter failed");
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let Some(path) = env::args().nth(1) else {
        return Err("Usage: tripsplit-interpreter <file.trip>".into());
    };

    let config = AppConfig::from_env().map_err(|err| err.to_string())?;
    tracing::debug!(residue = %config.residue, strict = config.strict, "Configuration loaded");

    let source =
        fs::read_to_string(&path).map_err(|err| format!("Failed to read '{path}': {err}"))?;

    let script = LedgerScriptParser
        .parse(&source)
        .map_err(|err| format_script_error(&err, &source))?;

    let processor =
        TripProcessor::new(Allocator::new(config.residue)).with_strict_balance(config.strict);
    let outcome = processor
        .run_script(&script)
        .map_err(|err| format_script_error(&err, &source))?;

    print!("{}", render_outcome(script.roster(), &outcome));
    Ok(())
}

fn render_outcome(roster: &Roster, outcome: &ScriptOutcome) -> String {
    let sections: Vec<String> = outcome
        .reports
        .iter()
        .map(|report| render_report(roster, outcome, report))
        .collect();
    sections.join("\n")
}

fn render_report(roster: &Roster, outcome: &ScriptOutcome, report: &ScriptReport) -> String {
    let view = SettlementPresenter::render_with_members(&report.summary, roster);

    match report.command {
        Some(Command::Balances) => {
            let mut text = view.balances_text();
            let line_items = ExpensePresenter::render_line_items(&report.summary.line_items, roster);
            if !line_items.is_empty() {
                text.push('\n');
                text.push_str(&line_items);
            }
            text
        }
        Some(Command::Settle) => view.transfers_text(),
        None => format!(
            "{}\n{}\n{}",
            ExpensePresenter::render_expenses(&outcome.expenses, roster),
            view.balances_text(),
            view.transfers_text()
        ),
    }
}
