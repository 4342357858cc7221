//! In-memory statistics store.
//!
//! Holds marketplace records in plain vectors behind a tokio `RwLock` and
//! answers [`StatsStore`] queries by scanning them. Joins behave like SQL
//! inner joins: a row whose organization, author or parent record is
//! missing is left out of joined results.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use opentribe_core::{
    ApplicationStatus, Bounty, BountyFilter, EntityId, Grant, GrantApplication, GrantFilter,
    Organization, Rfp, RfpFilter, StorageResult, Submission, SubmissionStatus, User,
};
use tokio::sync::RwLock;

use crate::store::{
    ApplicationActivity, OrganizationOpportunities, StatsStore, SubmissionActivity,
};

#[derive(Debug, Default)]
struct Tables {
    organizations: Vec<Organization>,
    users: Vec<User>,
    bounties: Vec<Bounty>,
    grants: Vec<Grant>,
    rfps: Vec<Rfp>,
    submissions: Vec<Submission>,
    applications: Vec<GrantApplication>,
}

/// In-memory [`StatsStore`] for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryStatsStore {
    tables: RwLock<Tables>,
}

impl InMemoryStatsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_organization(&self, organization: Organization) {
        self.tables.write().await.organizations.push(organization);
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.push(user);
    }

    pub async fn insert_bounty(&self, bounty: Bounty) {
        self.tables.write().await.bounties.push(bounty);
    }

    pub async fn insert_grant(&self, grant: Grant) {
        self.tables.write().await.grants.push(grant);
    }

    pub async fn insert_rfp(&self, rfp: Rfp) {
        self.tables.write().await.rfps.push(rfp);
    }

    pub async fn insert_submission(&self, submission: Submission) {
        self.tables.write().await.submissions.push(submission);
    }

    pub async fn insert_application(&self, application: GrantApplication) {
        self.tables.write().await.applications.push(application);
    }

    /// Change a bounty's reward. Returns false if no such bounty exists.
    pub async fn set_bounty_amount(&self, bounty_id: EntityId, amount_usd: Option<f64>) -> bool {
        let mut tables = self.tables.write().await;
        match tables.bounties.iter_mut().find(|b| b.bounty_id == bounty_id) {
            Some(bounty) => {
                bounty.amount_usd = amount_usd;
                true
            }
            None => false,
        }
    }
}

/// SQL `SUM` semantics: `None` unless at least one value is present.
fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Group `(organization_id, value)` pairs by organization, keeping the
/// organizations' first-seen order.
fn group_by_organization(
    organizations: &[Organization],
    rows: impl Iterator<Item = (EntityId, Option<f64>)>,
) -> Vec<OrganizationOpportunities> {
    let mut order: Vec<EntityId> = Vec::new();
    let mut grouped: HashMap<EntityId, (u64, Option<f64>)> = HashMap::new();

    for (organization_id, value) in rows {
        let slot = grouped.entry(organization_id).or_insert_with(|| {
            order.push(organization_id);
            (0, None)
        });
        slot.0 += 1;
        if let Some(v) = value {
            slot.1 = Some(slot.1.unwrap_or(0.0) + v);
        }
    }

    order
        .into_iter()
        .filter_map(|organization_id| {
            let organization = organizations
                .iter()
                .find(|o| o.organization_id == organization_id)?;
            let (count, value) = grouped.get(&organization_id).copied()?;
            Some(OrganizationOpportunities {
                organization: organization.clone(),
                count,
                value,
            })
        })
        .collect()
}

/// `SELECT DISTINCT` over ids, keeping first-seen order.
fn distinct(ids: impl Iterator<Item = EntityId>) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

fn find_user(users: &[User], user_id: EntityId) -> Option<&User> {
    users.iter().find(|u| u.user_id == user_id)
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn bounty_count(&self, filter: &BountyFilter) -> StorageResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.bounties.iter().filter(|b| filter.matches(b)).count() as u64)
    }

    async fn bounty_sum_amount_usd(&self, filter: &BountyFilter) -> StorageResult<Option<f64>> {
        let tables = self.tables.read().await;
        Ok(sum_present(
            tables
                .bounties
                .iter()
                .filter(|b| filter.matches(b))
                .map(|b| b.amount_usd),
        ))
    }

    async fn bounty_skills(&self, filter: &BountyFilter) -> StorageResult<Vec<Vec<String>>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bounties
            .iter()
            .filter(|b| filter.matches(b))
            .map(|b| b.skills.clone())
            .collect())
    }

    async fn bounty_opportunities_by_organization(
        &self,
        filter: &BountyFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>> {
        let tables = self.tables.read().await;
        Ok(group_by_organization(
            &tables.organizations,
            tables
                .bounties
                .iter()
                .filter(|b| filter.matches(b))
                .map(|b| (b.organization_id, b.amount_usd)),
        ))
    }

    async fn grant_count(&self, filter: &GrantFilter) -> StorageResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.grants.iter().filter(|g| filter.matches(g)).count() as u64)
    }

    async fn grant_sum_total_funds_usd(&self, filter: &GrantFilter) -> StorageResult<Option<f64>> {
        let tables = self.tables.read().await;
        Ok(sum_present(
            tables
                .grants
                .iter()
                .filter(|g| filter.matches(g))
                .map(|g| g.total_funds_usd),
        ))
    }

    async fn grant_skills(&self, filter: &GrantFilter) -> StorageResult<Vec<Vec<String>>> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .filter(|g| filter.matches(g))
            .map(|g| g.skills.clone())
            .collect())
    }

    async fn grant_opportunities_by_organization(
        &self,
        filter: &GrantFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>> {
        let tables = self.tables.read().await;
        Ok(group_by_organization(
            &tables.organizations,
            tables
                .grants
                .iter()
                .filter(|g| filter.matches(g))
                .map(|g| (g.organization_id, g.total_funds_usd)),
        ))
    }

    async fn rfp_count(&self, filter: &RfpFilter) -> StorageResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.rfps.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn submission_author_ids(&self) -> StorageResult<Vec<EntityId>> {
        let tables = self.tables.read().await;
        Ok(distinct(
            tables
                .submissions
                .iter()
                .filter(|s| s.status != SubmissionStatus::Draft)
                .map(|s| s.user_id),
        ))
    }

    async fn application_author_ids(&self) -> StorageResult<Vec<EntityId>> {
        let tables = self.tables.read().await;
        Ok(distinct(
            tables
                .applications
                .iter()
                .filter(|a| a.status != ApplicationStatus::Draft)
                .map(|a| a.user_id),
        ))
    }

    async fn recent_submissions(&self, limit: usize) -> StorageResult<Vec<SubmissionActivity>> {
        let tables = self.tables.read().await;
        let mut activity: Vec<SubmissionActivity> = tables
            .submissions
            .iter()
            .filter(|s| s.status != SubmissionStatus::Draft)
            .filter_map(|s| {
                let user = find_user(&tables.users, s.user_id)?;
                let bounty = tables.bounties.iter().find(|b| b.bounty_id == s.bounty_id)?;
                Some(SubmissionActivity {
                    submission_id: s.submission_id,
                    user: user.clone(),
                    bounty_id: bounty.bounty_id,
                    bounty_title: bounty.title.clone(),
                    bounty_slug: bounty.slug.clone(),
                    activity_at: s.activity_at(),
                })
            })
            .collect();

        activity.sort_by(|a, b| {
            b.activity_at
                .cmp(&a.activity_at)
                .then_with(|| b.submission_id.cmp(&a.submission_id))
        });
        activity.truncate(limit);
        Ok(activity)
    }

    async fn recent_applications(&self, limit: usize) -> StorageResult<Vec<ApplicationActivity>> {
        let tables = self.tables.read().await;
        let mut activity: Vec<ApplicationActivity> = tables
            .applications
            .iter()
            .filter(|a| a.status != ApplicationStatus::Draft)
            .filter_map(|a| {
                let user = find_user(&tables.users, a.user_id)?;
                let grant = tables.grants.iter().find(|g| g.grant_id == a.grant_id)?;
                Some(ApplicationActivity {
                    application_id: a.application_id,
                    user: user.clone(),
                    grant_id: grant.grant_id,
                    grant_title: grant.title.clone(),
                    grant_slug: grant.slug.clone(),
                    activity_at: a.activity_at(),
                })
            })
            .collect();

        activity.sort_by(|a, b| {
            b.activity_at
                .cmp(&a.activity_at)
                .then_with(|| b.application_id.cmp(&a.application_id))
        });
        activity.truncate(limit);
        Ok(activity)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use opentribe_core::{BountyStatus, GrantStatus, RfpStatus, Visibility};
    use uuid::Uuid;

    fn organization(name: &str) -> Organization {
        Organization {
            organization_id: Uuid::now_v7(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            logo: None,
        }
    }

    fn user(username: &str) -> User {
        User {
            user_id: Uuid::now_v7(),
            username: username.to_string(),
            name: None,
            avatar_url: None,
        }
    }

    fn bounty(
        org: &Organization,
        visibility: Visibility,
        status: BountyStatus,
        amount_usd: Option<f64>,
    ) -> Bounty {
        Bounty {
            bounty_id: Uuid::now_v7(),
            organization_id: org.organization_id,
            title: "Build a parachain explorer".to_string(),
            slug: "parachain-explorer".to_string(),
            visibility,
            status,
            amount_usd,
            skills: vec!["Rust".to_string(), "Substrate".to_string()],
            created_at: Utc::now(),
        }
    }

    fn grant(org: &Organization, status: GrantStatus, total_funds_usd: Option<f64>) -> Grant {
        Grant {
            grant_id: Uuid::now_v7(),
            organization_id: org.organization_id,
            title: "Tooling grants".to_string(),
            slug: "tooling-grants".to_string(),
            visibility: Visibility::Published,
            status,
            total_funds_usd,
            skills: vec!["TypeScript".to_string()],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_counts_and_sums_follow_filters() {
        let store = InMemoryStatsStore::new();
        let org = organization("Parity");
        store.insert_organization(org.clone()).await;
        store
            .insert_bounty(bounty(&org, Visibility::Published, BountyStatus::Open, Some(1000.0)))
            .await;
        store
            .insert_bounty(bounty(&org, Visibility::Published, BountyStatus::Cancelled, Some(500.0)))
            .await;
        store
            .insert_bounty(bounty(&org, Visibility::Draft, BountyStatus::Open, Some(700.0)))
            .await;

        let published = BountyFilter::published();
        assert_eq!(store.bounty_count(&published).await.unwrap(), 2);

        let rewarded = BountyFilter::published().with_statuses(BountyStatus::REWARDED);
        assert_eq!(
            store.bounty_sum_amount_usd(&rewarded).await.unwrap(),
            Some(1000.0)
        );
    }

    #[tokio::test]
    async fn test_sum_is_none_without_values() {
        let store = InMemoryStatsStore::new();
        let filter = GrantFilter::published().with_statuses([GrantStatus::Open]);
        assert_eq!(store.grant_sum_total_funds_usd(&filter).await.unwrap(), None);

        let org = organization("Web3 Foundation");
        store.insert_grant(grant(&org, GrantStatus::Open, None)).await;
        assert_eq!(store.grant_count(&filter).await.unwrap(), 1);
        assert_eq!(store.grant_sum_total_funds_usd(&filter).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rfp_count_published_only() {
        let store = InMemoryStatsStore::new();
        let grant_id = Uuid::now_v7();
        for visibility in [Visibility::Published, Visibility::Published, Visibility::Archived] {
            store
                .insert_rfp(Rfp {
                    rfp_id: Uuid::now_v7(),
                    grant_id,
                    title: "Light client RFP".to_string(),
                    slug: "light-client".to_string(),
                    visibility,
                    status: RfpStatus::Open,
                    created_at: Utc::now(),
                })
                .await;
        }
        assert_eq!(store.rfp_count(&RfpFilter::published()).await.unwrap(), 2);
        assert_eq!(store.rfp_count(&RfpFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_opportunities_grouped_by_organization() {
        let store = InMemoryStatsStore::new();
        let parity = organization("Parity");
        let acala = organization("Acala");
        store.insert_organization(parity.clone()).await;
        store.insert_organization(acala.clone()).await;
        store
            .insert_bounty(bounty(&parity, Visibility::Published, BountyStatus::Open, Some(100.0)))
            .await;
        store
            .insert_bounty(bounty(&parity, Visibility::Published, BountyStatus::Open, None))
            .await;
        store
            .insert_bounty(bounty(&acala, Visibility::Published, BountyStatus::Open, None))
            .await;

        let filter = BountyFilter::published().with_statuses([BountyStatus::Open]);
        let grouped = store
            .bounty_opportunities_by_organization(&filter)
            .await
            .unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].organization.name, "Parity");
        assert_eq!(grouped[0].count, 2);
        assert_eq!(grouped[0].value, Some(100.0));
        assert_eq!(grouped[1].count, 1);
        assert_eq!(grouped[1].value, None);
    }

    #[tokio::test]
    async fn test_author_ids_are_distinct_and_exclude_drafts() {
        let store = InMemoryStatsStore::new();
        let alice = user("alice");
        let bob = user("bob");
        let bounty_id = Uuid::now_v7();
        for (author, status) in [
            (&alice, SubmissionStatus::Submitted),
            (&alice, SubmissionStatus::Approved),
            (&bob, SubmissionStatus::Draft),
        ] {
            store
                .insert_submission(Submission {
                    submission_id: Uuid::now_v7(),
                    bounty_id,
                    user_id: author.user_id,
                    status,
                    submitted_at: None,
                    created_at: Utc::now(),
                })
                .await;
        }

        let ids = store.submission_author_ids().await.unwrap();
        assert_eq!(ids, vec![alice.user_id]);
        assert!(store.application_author_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_submissions_newest_first_and_limited() {
        let store = InMemoryStatsStore::new();
        let org = organization("Parity");
        let builder = user("carol");
        let target = bounty(&org, Visibility::Published, BountyStatus::Open, None);
        store.insert_user(builder.clone()).await;
        store.insert_bounty(target.clone()).await;

        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        for offset in 0..5 {
            store
                .insert_submission(Submission {
                    submission_id: Uuid::now_v7(),
                    bounty_id: target.bounty_id,
                    user_id: builder.user_id,
                    status: SubmissionStatus::Submitted,
                    submitted_at: Some(base + Duration::hours(offset)),
                    created_at: base,
                })
                .await;
        }

        let recent = store.recent_submissions(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].activity_at, base + Duration::hours(4));
        assert_eq!(recent[2].activity_at, base + Duration::hours(2));
        assert_eq!(recent[0].bounty_slug, "parachain-explorer");
        assert_eq!(recent[0].user.username, "carol");
    }

    #[tokio::test]
    async fn test_recent_applications_skip_missing_grant() {
        let store = InMemoryStatsStore::new();
        let builder = user("dave");
        store.insert_user(builder.clone()).await;
        store
            .insert_application(GrantApplication {
                application_id: Uuid::now_v7(),
                grant_id: Uuid::now_v7(),
                user_id: builder.user_id,
                title: "Indexer proposal".to_string(),
                status: ApplicationStatus::Submitted,
                submitted_at: None,
                created_at: Utc::now(),
            })
            .await;

        assert!(store.recent_applications(10).await.unwrap().is_empty());
        assert_eq!(store.application_author_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_bounty_amount() {
        let store = InMemoryStatsStore::new();
        let org = organization("Parity");
        let b = bounty(&org, Visibility::Published, BountyStatus::Open, Some(10.0));
        store.insert_bounty(b.clone()).await;

        assert!(store.set_bounty_amount(b.bounty_id, Some(25.0)).await);
        assert!(!store.set_bounty_amount(Uuid::now_v7(), None).await);
        assert_eq!(
            store
                .bounty_sum_amount_usd(&BountyFilter::published())
                .await
                .unwrap(),
            Some(25.0)
        );
    }
}
