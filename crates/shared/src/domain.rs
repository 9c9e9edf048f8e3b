use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub $inner);
    };
}

id_newtype!(ProposalId, usize);
id_newtype!(EventId, i64);

/// Caller identity as supplied by the authentication layer. Compared byte-exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Workflow stages, declared in their legal order so the derived `Ord` is the
/// workflow order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    RegisteringVoters,
    ProposalsRegistrationOpen,
    ProposalsRegistrationClosed,
    VotingOpen,
    VotingClosed,
    ResultsTallied,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::RegisteringVoters,
        Phase::ProposalsRegistrationOpen,
        Phase::ProposalsRegistrationClosed,
        Phase::VotingOpen,
        Phase::VotingClosed,
        Phase::ResultsTallied,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::RegisteringVoters => "registering_voters",
            Phase::ProposalsRegistrationOpen => "proposals_registration_open",
            Phase::ProposalsRegistrationClosed => "proposals_registration_closed",
            Phase::VotingOpen => "voting_open",
            Phase::VotingClosed => "voting_closed",
            Phase::ResultsTallied => "results_tallied",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase '{0}'")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub is_registered: bool,
    pub has_voted: bool,
    pub voted_proposal_id: ProposalId,
}

impl Voter {
    pub fn registered() -> Self {
        Self {
            is_registered: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub description: String,
    pub vote_count: u64,
}

impl Proposal {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            vote_count: 0,
        }
    }
}
