//! Statistics store trait.
//!
//! The read-only query surface the statistics compute functions need from
//! the persistence layer: filtered counts and sums, author id lists for the
//! builder count, per-organization opportunity rollups, skill lists and the
//! recent activity feed.

use async_trait::async_trait;
use opentribe_core::{
    BountyFilter, EntityId, GrantFilter, Organization, RfpFilter, StorageResult, Timestamp, User,
};
use serde::{Deserialize, Serialize};

/// Opportunities one organization has open, with their combined USD value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationOpportunities {
    pub organization: Organization,
    pub count: u64,
    /// `None` when no row carried a value.
    pub value: Option<f64>,
}

/// A non-draft submission joined with its author and bounty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionActivity {
    pub submission_id: EntityId,
    pub user: User,
    pub bounty_id: EntityId,
    pub bounty_title: String,
    pub bounty_slug: String,
    /// Submission time, falling back to creation time.
    pub activity_at: Timestamp,
}

/// A non-draft grant application joined with its author and grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationActivity {
    pub application_id: EntityId,
    pub user: User,
    pub grant_id: EntityId,
    pub grant_title: String,
    pub grant_slug: String,
    /// Submission time, falling back to creation time.
    pub activity_at: Timestamp,
}

/// Read-only aggregate queries over marketplace records.
///
/// Every method is a single round-trip. Sums return `None` when no row
/// matches so callers decide how absence renders.
#[async_trait]
pub trait StatsStore: Send + Sync {
    // === Bounties ===

    async fn bounty_count(&self, filter: &BountyFilter) -> StorageResult<u64>;

    /// Sum of `amount_usd` over matching bounties.
    async fn bounty_sum_amount_usd(&self, filter: &BountyFilter) -> StorageResult<Option<f64>>;

    /// Skill lists of matching bounties, one entry per bounty.
    async fn bounty_skills(&self, filter: &BountyFilter) -> StorageResult<Vec<Vec<String>>>;

    /// Matching bounties grouped by organization.
    async fn bounty_opportunities_by_organization(
        &self,
        filter: &BountyFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>>;

    // === Grants ===

    async fn grant_count(&self, filter: &GrantFilter) -> StorageResult<u64>;

    /// Sum of `total_funds_usd` over matching grants.
    async fn grant_sum_total_funds_usd(&self, filter: &GrantFilter) -> StorageResult<Option<f64>>;

    /// Skill lists of matching grants, one entry per grant.
    async fn grant_skills(&self, filter: &GrantFilter) -> StorageResult<Vec<Vec<String>>>;

    /// Matching grants grouped by organization.
    async fn grant_opportunities_by_organization(
        &self,
        filter: &GrantFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>>;

    // === RFPs ===

    async fn rfp_count(&self, filter: &RfpFilter) -> StorageResult<u64>;

    // === Builders and activity ===

    /// Distinct author ids across non-draft submissions.
    async fn submission_author_ids(&self) -> StorageResult<Vec<EntityId>>;

    /// Distinct author ids across non-draft grant applications.
    async fn application_author_ids(&self) -> StorageResult<Vec<EntityId>>;

    /// Latest non-draft submissions, newest first.
    async fn recent_submissions(&self, limit: usize) -> StorageResult<Vec<SubmissionActivity>>;

    /// Latest non-draft grant applications, newest first.
    async fn recent_applications(&self, limit: usize) -> StorageResult<Vec<ApplicationActivity>>;

    /// Round-trip to the store for readiness checks.
    async fn ping(&self) -> StorageResult<()>;
}
