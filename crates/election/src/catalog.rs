use shared::domain::{Proposal, ProposalId};

use crate::error::{ElectionError, ElectionResult};

/// Submitted proposals in submission order; a proposal's id is its index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalCatalog {
    proposals: Vec<Proposal>,
}

impl ProposalCatalog {
    pub(crate) fn from_proposals(proposals: Vec<Proposal>) -> Self {
        Self { proposals }
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn get(&self, proposal_id: ProposalId) -> ElectionResult<&Proposal> {
        self.proposals.get(proposal_id.0).ok_or_else(|| {
            ElectionError::validation(format!(
                "proposal {} does not exist ({} submitted)",
                proposal_id.0,
                self.proposals.len()
            ))
        })
    }

    pub(crate) fn submit(&mut self, description: &str) -> ElectionResult<ProposalId> {
        if description.trim().is_empty() {
            return Err(ElectionError::validation("proposal description must not be empty"));
        }
        if self
            .proposals
            .iter()
            .any(|proposal| proposal.description == description)
        {
            return Err(ElectionError::validation(format!(
                "proposal '{description}' was already submitted"
            )));
        }
        self.proposals.push(Proposal::new(description));
        Ok(ProposalId(self.proposals.len() - 1))
    }

    /// Adds one vote and returns the new count.
    pub(crate) fn increment(&mut self, proposal_id: ProposalId) -> ElectionResult<u64> {
        let submitted = self.proposals.len();
        let proposal = self.proposals.get_mut(proposal_id.0).ok_or_else(|| {
            ElectionError::validation(format!(
                "proposal {} does not exist ({submitted} submitted)",
                proposal_id.0
            ))
        })?;
        proposal.vote_count += 1;
        Ok(proposal.vote_count)
    }

    pub(crate) fn clear(&mut self) {
        self.proposals.clear();
    }
}
