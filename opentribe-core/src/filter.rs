//! Query filters for aggregate reads
//!
//! Filters are plain data handed to the persistence collaborator. SQL
//! backends translate them into WHERE clauses; the in-memory store uses
//! `matches`. An empty status list means "any status".

use crate::{Bounty, BountyStatus, Grant, GrantStatus, Rfp, Visibility};
use serde::{Deserialize, Serialize};

/// Filter over bounties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyFilter {
    pub visibility: Option<Visibility>,
    pub statuses: Vec<BountyStatus>,
}

impl BountyFilter {
    /// Published bounties in any status.
    pub fn published() -> Self {
        Self {
            visibility: Some(Visibility::Published),
            statuses: Vec::new(),
        }
    }

    /// Restrict to the given statuses.
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = BountyStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn matches(&self, bounty: &Bounty) -> bool {
        self.visibility.map_or(true, |v| bounty.visibility == v)
            && (self.statuses.is_empty() || self.statuses.contains(&bounty.status))
    }
}

/// Filter over grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFilter {
    pub visibility: Option<Visibility>,
    pub statuses: Vec<GrantStatus>,
}

impl GrantFilter {
    /// Published grants in any status.
    pub fn published() -> Self {
        Self {
            visibility: Some(Visibility::Published),
            statuses: Vec::new(),
        }
    }

    /// Restrict to the given statuses.
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = GrantStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn matches(&self, grant: &Grant) -> bool {
        self.visibility.map_or(true, |v| grant.visibility == v)
            && (self.statuses.is_empty() || self.statuses.contains(&grant.status))
    }
}

/// Filter over RFPs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfpFilter {
    pub visibility: Option<Visibility>,
}

impl RfpFilter {
    pub fn published() -> Self {
        Self {
            visibility: Some(Visibility::Published),
        }
    }

    pub fn matches(&self, rfp: &Rfp) -> bool {
        self.visibility.map_or(true, |v| rfp.visibility == v)
    }
}
