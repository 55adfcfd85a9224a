//! Provider whitelist policy
//!
//! Schema validity and authorization are separate questions: a payload
//! naming `midjourney` is well-formed but still not authorized. The policy
//! only accepts a [`ValidatedEntity`], so raw payloads never reach it.

use serde::{Deserialize, Serialize};

use crate::types::{Provider, ValidatedEntity};

/// Providers authorized unless a scenario overrides the set
pub const AUTHORIZED_PROVIDERS: [Provider; 2] = [Provider::OpenAi, Provider::StabilityAi];

/// A fixed set of authorized providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationPolicy {
    authorized: Vec<Provider>,
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::new(AUTHORIZED_PROVIDERS)
    }
}

impl AuthorizationPolicy {
    pub fn new(authorized: impl IntoIterator<Item = Provider>) -> Self {
        let mut set: Vec<Provider> = Vec::new();
        for provider in authorized {
            if !set.contains(&provider) {
                set.push(provider);
            }
        }
        Self { authorized: set }
    }

    pub fn authorized(&self) -> &[Provider] {
        &self.authorized
    }

    /// Whether the entity's provider is in the authorized set
    pub fn is_authorized(&self, entity: &ValidatedEntity) -> bool {
        self.authorized.contains(&entity.provider())
    }
}

/// Check an entity against [`AUTHORIZED_PROVIDERS`]
pub fn is_authorized(entity: &ValidatedEntity) -> bool {
    AUTHORIZED_PROVIDERS.contains(&entity.provider())
}
