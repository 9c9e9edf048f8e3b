use shared::domain::{Identity, Proposal, ProposalId};

use crate::{
    catalog::ProposalCatalog,
    error::{ElectionError, ElectionResult},
    registry::VoterRegistry,
};

/// Records ballots and keeps the leader pointer current as they arrive.
///
/// The leader only moves on a strict improvement, so among proposals tied
/// for the highest count the one that reached it first stays in front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyEngine {
    leader: ProposalId,
}

impl TallyEngine {
    pub(crate) fn with_leader(leader: ProposalId) -> Self {
        Self { leader }
    }

    pub fn leader(&self) -> ProposalId {
        self.leader
    }

    pub(crate) fn cast(
        &mut self,
        registry: &mut VoterRegistry,
        catalog: &mut ProposalCatalog,
        voter: &Identity,
        proposal_id: ProposalId,
    ) -> ElectionResult<()> {
        catalog.get(proposal_id)?;
        registry.ensure_can_vote(voter)?;

        let count = catalog.increment(proposal_id)?;
        registry.record_vote(voter, proposal_id);
        let leading = catalog.get(self.leader)?.vote_count;
        if count > leading {
            self.leader = proposal_id;
        }
        Ok(())
    }

    pub fn winner(&self, catalog: &ProposalCatalog) -> ElectionResult<(ProposalId, Proposal)> {
        if catalog.is_empty() {
            return Err(ElectionError::validation("no proposals were submitted"));
        }
        let proposal = catalog.get(self.leader)?.clone();
        Ok((self.leader, proposal))
    }

    pub(crate) fn reset(&mut self) {
        self.leader = ProposalId::default();
    }
}
