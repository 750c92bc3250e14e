//! Entitlement types: the content a plan (and therefore a provisioned
//! account or activated device) may access.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// The resolved set of content identifiers to grant for a plan.
///
/// Grants are copied onto the account at provisioning time; a later plan
/// edit does not retroactively change an existing account.
#[derive(Debug, Clone, Default)]
pub struct EntitlementGrant {
    pub channel_ids: Vec<DbId>,
    pub category_ids: Vec<DbId>,
    /// True when the plan had no explicit channel mapping and the resolver
    /// fell back to all active channels.
    pub channel_fallback: bool,
    /// Same, for categories.
    pub category_fallback: bool,
}

impl EntitlementGrant {
    pub fn is_empty(&self) -> bool {
        self.channel_ids.is_empty() && self.category_ids.is_empty()
    }
}

/// Content access view returned to an activated device on a status poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentAccess {
    pub channel_ids: Vec<DbId>,
    pub category_ids: Vec<DbId>,
    pub max_connections: i32,
}
