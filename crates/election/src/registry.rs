use std::collections::HashMap;

use shared::domain::{Identity, ProposalId, Voter};

use crate::error::{ElectionError, ElectionResult};

/// Registered participants and their ballot state.
///
/// `registered_identities` keeps every identity ever admitted, in admission
/// order and without duplicates, so a reset can walk all of them even after
/// their records were cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterRegistry {
    voters: HashMap<Identity, Voter>,
    registered_identities: Vec<Identity>,
}

impl VoterRegistry {
    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.voters
            .get(identity)
            .is_some_and(|voter| voter.is_registered)
    }

    /// The record for `identity`, or the default record if it was never seen.
    pub fn voter(&self, identity: &Identity) -> Voter {
        self.voters.get(identity).copied().unwrap_or_default()
    }

    pub fn registered_identities(&self) -> &[Identity] {
        &self.registered_identities
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Identity, Voter)> + '_ {
        self.registered_identities
            .iter()
            .map(|identity| (identity, self.voter(identity)))
    }

    pub(crate) fn register(&mut self, identity: &Identity) -> ElectionResult<()> {
        if identity.is_blank() {
            return Err(ElectionError::validation("voter identity must not be empty"));
        }
        if self.is_registered(identity) {
            return Err(ElectionError::validation(format!(
                "{identity} is already registered"
            )));
        }
        self.admit(identity.clone());
        Ok(())
    }

    /// Registers without the duplicate check; used for the administrator.
    pub(crate) fn admit(&mut self, identity: Identity) {
        if !self.registered_identities.contains(&identity) {
            self.registered_identities.push(identity.clone());
        }
        self.voters.insert(identity, Voter::registered());
    }

    pub(crate) fn restore(&mut self, identity: Identity, voter: Voter) -> ElectionResult<()> {
        if self.registered_identities.contains(&identity) {
            return Err(ElectionError::validation(format!(
                "voter {identity} appears twice"
            )));
        }
        self.registered_identities.push(identity.clone());
        self.voters.insert(identity, voter);
        Ok(())
    }

    pub(crate) fn ensure_can_vote(&self, identity: &Identity) -> ElectionResult<()> {
        if self.voter(identity).has_voted {
            return Err(ElectionError::validation(format!("{identity} has already voted")));
        }
        Ok(())
    }

    pub(crate) fn record_vote(&mut self, identity: &Identity, proposal_id: ProposalId) {
        let voter = self.voters.entry(identity.clone()).or_default();
        voter.has_voted = true;
        voter.voted_proposal_id = proposal_id;
    }

    /// Resets every known identity to the default record, registration
    /// included.
    pub(crate) fn clear(&mut self) {
        for identity in &self.registered_identities {
            self.voters.insert(identity.clone(), Voter::default());
        }
    }
}
