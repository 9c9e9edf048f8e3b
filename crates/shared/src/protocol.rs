use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, Identity, Phase, Proposal, ProposalId, Voter};

/// One call against the election. The caller identity travels out of band
/// (bearer token or CLI flag), never inside the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ElectionRequest {
    AdvancePhase {
        phase: Phase,
    },
    Reset,
    CurrentPhase,
    RegisterVoter {
        identity: Identity,
    },
    GetVoter {
        identity: Identity,
    },
    VotedProposalOf {
        identity: Identity,
    },
    SubmitProposal {
        description: String,
    },
    ListProposals,
    GetProposal {
        proposal_id: ProposalId,
    },
    Vote {
        proposal_id: ProposalId,
    },
    Winner,
    TransferAdministration {
        identity: Identity,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ElectionResponse {
    Committed {
        event: ElectionEvent,
    },
    Phase {
        phase: Phase,
    },
    Voter {
        identity: Identity,
        voter: Voter,
    },
    Proposal {
        proposal_id: ProposalId,
        proposal: Proposal,
    },
    Proposals {
        proposals: Vec<Proposal>,
    },
    Winner {
        proposal_id: ProposalId,
        proposal: Proposal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ElectionEvent {
    PhaseChanged {
        previous: Phase,
        current: Phase,
    },
    SessionReset {
        previous: Phase,
    },
    VoterRegistered {
        identity: Identity,
    },
    ProposalRegistered {
        proposal_id: ProposalId,
    },
    VoteCast {
        voter: Identity,
        proposal_id: ProposalId,
    },
    AdministrationTransferred {
        previous: Identity,
        current: Identity,
    },
}

impl ElectionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ElectionEvent::PhaseChanged { .. } => "phase_changed",
            ElectionEvent::SessionReset { .. } => "session_reset",
            ElectionEvent::VoterRegistered { .. } => "voter_registered",
            ElectionEvent::ProposalRegistered { .. } => "proposal_registered",
            ElectionEvent::VoteCast { .. } => "vote_cast",
            ElectionEvent::AdministrationTransferred { .. } => "administration_transferred",
        }
    }
}

/// An event as kept in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: EventId,
    pub event: ElectionEvent,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
