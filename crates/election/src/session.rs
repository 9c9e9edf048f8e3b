use serde::{Deserialize, Serialize};
use shared::{
    domain::{Identity, Phase, Proposal, ProposalId, Voter},
    protocol::ElectionEvent,
};

use crate::{
    access::AccessGuard,
    catalog::ProposalCatalog,
    error::{ElectionError, ElectionResult},
    registry::VoterRegistry,
    tally::TallyEngine,
    workflow::WorkflowController,
};

/// The whole election: one workflow, one registry, one catalog and one
/// tally, gated by the access guard.
///
/// Every operation checks its phase precondition and the caller before it
/// touches any component, so an `Err` always leaves the session as it was.
/// Mutating operations return the event describing what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    workflow: WorkflowController,
    guard: AccessGuard,
    registry: VoterRegistry,
    catalog: ProposalCatalog,
    tally: TallyEngine,
}

impl Session {
    /// Opens a session in the first phase with `administrator` registered as
    /// a voter.
    pub fn new(administrator: Identity) -> ElectionResult<Self> {
        if administrator.is_blank() {
            return Err(ElectionError::validation(
                "administrator identity must not be empty",
            ));
        }
        let mut registry = VoterRegistry::default();
        registry.admit(administrator.clone());
        Ok(Self {
            workflow: WorkflowController::default(),
            guard: AccessGuard::new(administrator),
            registry,
            catalog: ProposalCatalog::default(),
            tally: TallyEngine::default(),
        })
    }

    pub fn administrator(&self) -> &Identity {
        self.guard.administrator()
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    pub fn registry(&self) -> &VoterRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &ProposalCatalog {
        &self.catalog
    }

    pub fn leader(&self) -> ProposalId {
        self.tally.leader()
    }

    pub fn phase(&self) -> Phase {
        self.workflow.phase()
    }

    pub fn advance(&mut self, caller: &Identity, next: Phase) -> ElectionResult<ElectionEvent> {
        self.guard.ensure_administrator(caller)?;
        let previous = self.workflow.advance(next)?;
        Ok(ElectionEvent::PhaseChanged {
            previous,
            current: next,
        })
    }

    /// Back to the first phase with no proposals and every ballot cleared.
    /// Registrations are dropped too, except the administrator's, which is
    /// restored so the session never loses its operator as a voter.
    pub fn reset(&mut self, caller: &Identity) -> ElectionResult<ElectionEvent> {
        self.guard.ensure_administrator(caller)?;
        let previous = self.workflow.restart();
        self.catalog.clear();
        self.tally.reset();
        self.registry.clear();
        self.registry.admit(self.guard.administrator().clone());
        Ok(ElectionEvent::SessionReset { previous })
    }

    pub fn current_phase(&self, caller: &Identity) -> ElectionResult<Phase> {
        self.guard.ensure_administrator(caller)?;
        Ok(self.workflow.phase())
    }

    pub fn register_voter(
        &mut self,
        caller: &Identity,
        identity: &Identity,
    ) -> ElectionResult<ElectionEvent> {
        self.workflow
            .require(Phase::RegisteringVoters, "registering voters")?;
        self.guard.ensure_administrator(caller)?;
        self.registry.register(identity)?;
        Ok(ElectionEvent::VoterRegistered {
            identity: identity.clone(),
        })
    }

    pub fn voter(&self, caller: &Identity, identity: &Identity) -> ElectionResult<Voter> {
        self.guard.ensure_administrator(caller)?;
        Ok(self.registry.voter(identity))
    }

    /// Ballots are visible to every registered voter, not only their owner.
    pub fn voted_proposal_of(
        &self,
        caller: &Identity,
        identity: &Identity,
    ) -> ElectionResult<(ProposalId, Proposal)> {
        self.guard.ensure_participant(&self.registry, caller)?;
        let voter = self.registry.voter(identity);
        if !voter.has_voted {
            return Err(ElectionError::validation(format!(
                "{identity} has not voted"
            )));
        }
        let proposal = self.catalog.get(voter.voted_proposal_id)?.clone();
        Ok((voter.voted_proposal_id, proposal))
    }

    pub fn submit_proposal(
        &mut self,
        caller: &Identity,
        description: &str,
    ) -> ElectionResult<ElectionEvent> {
        self.workflow
            .require(Phase::ProposalsRegistrationOpen, "submitting proposals")?;
        self.guard.ensure_participant(&self.registry, caller)?;
        let proposal_id = self.catalog.submit(description)?;
        Ok(ElectionEvent::ProposalRegistered { proposal_id })
    }

    pub fn proposals(&self, caller: &Identity) -> ElectionResult<Vec<Proposal>> {
        self.guard.ensure_participant(&self.registry, caller)?;
        Ok(self.catalog.proposals().to_vec())
    }

    pub fn proposal(&self, caller: &Identity, proposal_id: ProposalId) -> ElectionResult<Proposal> {
        self.guard.ensure_participant(&self.registry, caller)?;
        Ok(self.catalog.get(proposal_id)?.clone())
    }

    /// The caller votes as itself.
    pub fn vote(
        &mut self,
        caller: &Identity,
        proposal_id: ProposalId,
    ) -> ElectionResult<ElectionEvent> {
        self.workflow.require(Phase::VotingOpen, "voting")?;
        self.guard.ensure_participant(&self.registry, caller)?;
        self.tally
            .cast(&mut self.registry, &mut self.catalog, caller, proposal_id)?;
        Ok(ElectionEvent::VoteCast {
            voter: caller.clone(),
            proposal_id,
        })
    }

    /// Public once results are tallied; no caller check.
    pub fn winner(&self) -> ElectionResult<(ProposalId, Proposal)> {
        self.workflow
            .require(Phase::ResultsTallied, "reading the winner")?;
        self.tally.winner(&self.catalog)
    }

    pub fn transfer_administration(
        &mut self,
        caller: &Identity,
        next: &Identity,
    ) -> ElectionResult<ElectionEvent> {
        self.guard.ensure_administrator(caller)?;
        if next.is_blank() {
            return Err(ElectionError::validation(
                "administrator identity must not be empty",
            ));
        }
        if self.guard.is_administrator(next) {
            return Err(ElectionError::validation(format!(
                "{next} is already the administrator"
            )));
        }
        let previous = self.guard.replace_administrator(next.clone());
        Ok(ElectionEvent::AdministrationTransferred {
            previous,
            current: next.clone(),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            administrator: self.guard.administrator().clone(),
            phase: self.workflow.phase(),
            leader: self.tally.leader(),
            proposals: self.catalog.proposals().to_vec(),
            voters: self
                .registry
                .entries()
                .map(|(identity, voter)| VoterEntry {
                    identity: identity.clone(),
                    voter,
                })
                .collect(),
        }
    }

    /// Rebuilds a session from persisted state, rejecting snapshots that
    /// break the tally invariants.
    pub fn restore(snapshot: SessionSnapshot) -> ElectionResult<Self> {
        let SessionSnapshot {
            administrator,
            phase,
            leader,
            proposals,
            voters,
        } = snapshot;

        if administrator.is_blank() {
            return Err(corrupt("administrator is empty"));
        }
        if proposals.is_empty() {
            if leader != ProposalId::default() {
                return Err(corrupt("leader set without proposals"));
            }
        } else if leader.0 >= proposals.len() {
            return Err(corrupt("leader out of range"));
        }

        let mut ballots = vec![0u64; proposals.len()];
        let mut registry = VoterRegistry::default();
        for VoterEntry { identity, voter } in voters {
            if voter.has_voted {
                let slot = ballots
                    .get_mut(voter.voted_proposal_id.0)
                    .ok_or_else(|| corrupt("ballot for a missing proposal"))?;
                *slot += 1;
            }
            registry.restore(identity, voter)?;
        }
        if ballots
            .iter()
            .zip(&proposals)
            .any(|(counted, proposal)| *counted != proposal.vote_count)
        {
            return Err(corrupt("vote counts do not match ballots"));
        }
        if let Some(top) = proposals.iter().map(|p| p.vote_count).max() {
            let first_top = proposals
                .iter()
                .position(|p| p.vote_count == top)
                .unwrap_or_default();
            if proposals[leader.0].vote_count != top {
                return Err(corrupt(format!(
                    "leader {} is behind proposal {first_top}",
                    leader.0
                )));
            }
        }

        Ok(Self {
            workflow: WorkflowController::at(phase),
            guard: AccessGuard::new(administrator),
            registry,
            catalog: ProposalCatalog::from_proposals(proposals),
            tally: TallyEngine::with_leader(leader),
        })
    }
}

fn corrupt(detail: impl std::fmt::Display) -> ElectionError {
    ElectionError::validation(format!("corrupt session snapshot: {detail}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterEntry {
    pub identity: Identity,
    pub voter: Voter,
}

/// Plain-data form of a [`Session`], as handed to a [`crate::SessionStore`].
/// Voters are listed in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub administrator: Identity,
    pub phase: Phase,
    pub leader: ProposalId,
    pub proposals: Vec<Proposal>,
    pub voters: Vec<VoterEntry>,
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
