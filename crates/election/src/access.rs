use shared::domain::Identity;

use crate::{
    error::{ElectionError, ElectionResult},
    registry::VoterRegistry,
};

/// Identity predicates consulted before every gated operation. The
/// administrator is a single field so that a transfer replaces it in one
/// place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGuard {
    administrator: Identity,
}

impl AccessGuard {
    pub fn new(administrator: Identity) -> Self {
        Self { administrator }
    }

    pub fn administrator(&self) -> &Identity {
        &self.administrator
    }

    pub fn is_administrator(&self, caller: &Identity) -> bool {
        *caller == self.administrator
    }

    pub fn is_registered_participant(&self, registry: &VoterRegistry, caller: &Identity) -> bool {
        registry.is_registered(caller)
    }

    pub fn ensure_administrator(&self, caller: &Identity) -> ElectionResult<()> {
        if !self.is_administrator(caller) {
            return Err(ElectionError::authorization(format!(
                "{caller} is not the administrator"
            )));
        }
        Ok(())
    }

    pub fn ensure_participant(
        &self,
        registry: &VoterRegistry,
        caller: &Identity,
    ) -> ElectionResult<()> {
        if !self.is_registered_participant(registry, caller) {
            return Err(ElectionError::authorization(format!(
                "{caller} is not a registered voter"
            )));
        }
        Ok(())
    }

    pub(crate) fn replace_administrator(&mut self, next: Identity) -> Identity {
        std::mem::replace(&mut self.administrator, next)
    }
}
