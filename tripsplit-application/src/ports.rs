use crate::{Script, error::ScriptError, model::Roster};
use std::collections::HashMap;
use tripsplit_domain::ParticipantId;

pub trait LedgerParser: Send + Sync {
    fn parse(&self, content: &str) -> Result<Script, ScriptError>;
}

pub trait MemberDirectory: Send + Sync {
    fn display_name(&self, member_id: ParticipantId) -> Option<&str>;
}

impl MemberDirectory for HashMap<ParticipantId, String> {
    fn display_name(&self, member_id: ParticipantId) -> Option<&str> {
        self.get(&member_id).map(String::as_str)
    }
}

impl MemberDirectory for Roster {
    fn display_name(&self, member_id: ParticipantId) -> Option<&str> {
        self.participant(member_id)
            .map(|participant| participant.name.as_str())
    }
}
