use crate::error::RosterError;
use fxhash::FxHashMap;
use tripsplit_domain::{
    AllocationRequest, Expense, LineItem, Money, Participant, ParticipantId, PersonBalance,
    Settlement,
};

/// Ordered list of trip members. Ids are assigned from 1 in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    by_name: FxHashMap<String, ParticipantId>,
}

impl Roster {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, RosterError> {
        if names.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut roster = Self::default();
        for (idx, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let id = ParticipantId(idx as u64 + 1);
            if roster.by_name.insert(name.to_string(), id).is_some() {
                return Err(RosterError::DuplicateName(name.to_string()));
            }
            roster.participants.push(Participant::new(id, name));
        }
        Ok(roster)
    }

    pub fn resolve(&self, name: &str) -> Option<ParticipantId> {
        self.by_name.get(name).copied()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|participant| participant.id == id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participant(id).is_some()
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|participant| participant.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// An expense before allocation: who paid, what it was, how to split it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub title: String,
    pub payer: ParticipantId,
    pub request: AllocationRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Balances,
    Settle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStatement {
    Expense(ExpenseDraft),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStatementWithLine {
    pub line: usize,
    pub statement: ScriptStatement,
}

pub struct Script {
    roster: Roster,
    statements: Vec<ScriptStatementWithLine>,
}

impl Script {
    pub fn new(roster: Roster, statements: Vec<ScriptStatementWithLine>) -> Self {
        Self { roster, statements }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn statements(&self) -> &[ScriptStatementWithLine] {
        &self.statements
    }
}

/// Trip state as of some point in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripSummary {
    pub total_spend: Money,
    pub balances: Vec<PersonBalance>,
    pub line_items: Vec<(ParticipantId, Vec<LineItem>)>,
    pub settlement: Settlement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    pub line: usize,
    /// `None` for the implicit report of a script without commands.
    pub command: Option<Command>,
    pub summary: TripSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub expenses: Vec<Expense>,
    pub reports: Vec<ScriptReport>,
}
