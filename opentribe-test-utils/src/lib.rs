//! Opentribe Test Utilities
//!
//! Shared test infrastructure for the Opentribe workspace:
//! - `StubStatsStore`: scripted statistics store with call recording
//! - `RecordingCacheBackend`: cache backend that records traffic and can
//!   be told to fail
//! - Fixtures for marketplace records and activity rows
//! - Proptest strategies for the homepage ranking inputs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

pub use opentribe_core::{
    BountyFilter, CacheError, EntityId, GrantFilter, RfpFilter, StorageError, StorageResult,
};
pub use opentribe_storage::{
    ApplicationActivity, CacheBackend, CacheStats, OrganizationOpportunities, StatsStore,
    SubmissionActivity,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// STUB STATS STORE
// ============================================================================

/// One query of the [`StatsStore`] trait, for scripting failures and
/// counting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubQuery {
    BountyCount,
    BountySum,
    BountySkills,
    BountyOpportunities,
    GrantCount,
    GrantSum,
    GrantSkills,
    GrantOpportunities,
    RfpCount,
    SubmissionAuthors,
    ApplicationAuthors,
    RecentSubmissions,
    RecentApplications,
    Ping,
}

#[derive(Debug, Clone, Default)]
struct StubData {
    bounty_count: u64,
    bounty_sum: Option<f64>,
    bounty_skills: Vec<Vec<String>>,
    bounty_opportunities: Vec<OrganizationOpportunities>,
    grant_count: u64,
    grant_sum: Option<f64>,
    grant_skills: Vec<Vec<String>>,
    grant_opportunities: Vec<OrganizationOpportunities>,
    rfp_count: u64,
    submission_authors: Vec<EntityId>,
    application_authors: Vec<EntityId>,
    recent_submissions: Vec<SubmissionActivity>,
    recent_applications: Vec<ApplicationActivity>,
    failures: HashMap<StubQuery, StorageError>,
}

/// Statistics store returning scripted values.
///
/// Every query returns the same value whatever filter it is given; filters
/// are recorded so tests can assert on them. Defaults are zero counts,
/// `None` sums and empty lists. Values can be changed after the store is
/// shared, which lets tests tell cached snapshots from fresh ones.
#[derive(Debug, Default)]
pub struct StubStatsStore {
    data: Mutex<StubData>,
    calls: Mutex<HashMap<StubQuery, usize>>,
    bounty_filters: Mutex<Vec<BountyFilter>>,
    grant_filters: Mutex<Vec<GrantFilter>>,
}

impl StubStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn data_mut(&mut self) -> &mut StubData {
        self.data
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_bounty_count(mut self, count: u64) -> Self {
        self.data_mut().bounty_count = count;
        self
    }

    pub fn with_bounty_sum(mut self, sum: Option<f64>) -> Self {
        self.data_mut().bounty_sum = sum;
        self
    }

    pub fn with_bounty_skills(mut self, skills: Vec<Vec<String>>) -> Self {
        self.data_mut().bounty_skills = skills;
        self
    }

    pub fn with_bounty_opportunities(mut self, rollups: Vec<OrganizationOpportunities>) -> Self {
        self.data_mut().bounty_opportunities = rollups;
        self
    }

    pub fn with_grant_count(mut self, count: u64) -> Self {
        self.data_mut().grant_count = count;
        self
    }

    pub fn with_grant_sum(mut self, sum: Option<f64>) -> Self {
        self.data_mut().grant_sum = sum;
        self
    }

    pub fn with_grant_skills(mut self, skills: Vec<Vec<String>>) -> Self {
        self.data_mut().grant_skills = skills;
        self
    }

    pub fn with_grant_opportunities(mut self, rollups: Vec<OrganizationOpportunities>) -> Self {
        self.data_mut().grant_opportunities = rollups;
        self
    }

    pub fn with_rfp_count(mut self, count: u64) -> Self {
        self.data_mut().rfp_count = count;
        self
    }

    pub fn with_author_ids(mut self, submissions: Vec<EntityId>, applications: Vec<EntityId>) -> Self {
        let data = self.data_mut();
        data.submission_authors = submissions;
        data.application_authors = applications;
        self
    }

    pub fn with_recent_submissions(mut self, rows: Vec<SubmissionActivity>) -> Self {
        self.data_mut().recent_submissions = rows;
        self
    }

    pub fn with_recent_applications(mut self, rows: Vec<ApplicationActivity>) -> Self {
        self.data_mut().recent_applications = rows;
        self
    }

    /// Make `query` fail with `error` until [`clear_failures`](Self::clear_failures).
    pub fn failing(mut self, query: StubQuery, error: StorageError) -> Self {
        self.data_mut().failures.insert(query, error);
        self
    }

    pub fn set_bounty_count(&self, count: u64) {
        lock(&self.data).bounty_count = count;
    }

    pub fn set_bounty_sum(&self, sum: Option<f64>) {
        lock(&self.data).bounty_sum = sum;
    }

    pub fn set_failure(&self, query: StubQuery, error: StorageError) {
        lock(&self.data).failures.insert(query, error);
    }

    pub fn clear_failures(&self) {
        lock(&self.data).failures.clear();
    }

    /// Number of times `query` ran.
    pub fn calls(&self, query: StubQuery) -> usize {
        lock(&self.calls).get(&query).copied().unwrap_or(0)
    }

    /// Total queries run, across all kinds.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Every bounty filter received, in call order.
    pub fn bounty_filters(&self) -> Vec<BountyFilter> {
        lock(&self.bounty_filters).clone()
    }

    /// Every grant filter received, in call order.
    pub fn grant_filters(&self) -> Vec<GrantFilter> {
        lock(&self.grant_filters).clone()
    }

    /// Count the call, then return the scripted failure or project the
    /// scripted value.
    fn answer<T>(&self, query: StubQuery, project: impl FnOnce(&StubData) -> T) -> StorageResult<T> {
        *lock(&self.calls).entry(query).or_default() += 1;
        let data = lock(&self.data);
        match data.failures.get(&query) {
            Some(error) => Err(error.clone()),
            None => Ok(project(&data)),
        }
    }

    fn record_bounty(&self, filter: &BountyFilter) {
        lock(&self.bounty_filters).push(filter.clone());
    }

    fn record_grant(&self, filter: &GrantFilter) {
        lock(&self.grant_filters).push(filter.clone());
    }
}

#[async_trait]
impl StatsStore for StubStatsStore {
    async fn bounty_count(&self, filter: &BountyFilter) -> StorageResult<u64> {
        self.record_bounty(filter);
        self.answer(StubQuery::BountyCount, |d| d.bounty_count)
    }

    async fn bounty_sum_amount_usd(&self, filter: &BountyFilter) -> StorageResult<Option<f64>> {
        self.record_bounty(filter);
        self.answer(StubQuery::BountySum, |d| d.bounty_sum)
    }

    async fn bounty_skills(&self, filter: &BountyFilter) -> StorageResult<Vec<Vec<String>>> {
        self.record_bounty(filter);
        self.answer(StubQuery::BountySkills, |d| d.bounty_skills.clone())
    }

    async fn bounty_opportunities_by_organization(
        &self,
        filter: &BountyFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>> {
        self.record_bounty(filter);
        self.answer(StubQuery::BountyOpportunities, |d| {
            d.bounty_opportunities.clone()
        })
    }

    async fn grant_count(&self, filter: &GrantFilter) -> StorageResult<u64> {
        self.record_grant(filter);
        self.answer(StubQuery::GrantCount, |d| d.grant_count)
    }

    async fn grant_sum_total_funds_usd(&self, filter: &GrantFilter) -> StorageResult<Option<f64>> {
        self.record_grant(filter);
        self.answer(StubQuery::GrantSum, |d| d.grant_sum)
    }

    async fn grant_skills(&self, filter: &GrantFilter) -> StorageResult<Vec<Vec<String>>> {
        self.record_grant(filter);
        self.answer(StubQuery::GrantSkills, |d| d.grant_skills.clone())
    }

    async fn grant_opportunities_by_organization(
        &self,
        filter: &GrantFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>> {
        self.record_grant(filter);
        self.answer(StubQuery::GrantOpportunities, |d| {
            d.grant_opportunities.clone()
        })
    }

    async fn rfp_count(&self, _filter: &RfpFilter) -> StorageResult<u64> {
        self.answer(StubQuery::RfpCount, |d| d.rfp_count)
    }

    async fn submission_author_ids(&self) -> StorageResult<Vec<EntityId>> {
        self.answer(StubQuery::SubmissionAuthors, |d| {
            d.submission_authors.clone()
        })
    }

    async fn application_author_ids(&self) -> StorageResult<Vec<EntityId>> {
        self.answer(StubQuery::ApplicationAuthors, |d| {
            d.application_authors.clone()
        })
    }

    async fn recent_submissions(&self, limit: usize) -> StorageResult<Vec<SubmissionActivity>> {
        self.answer(StubQuery::RecentSubmissions, |d| {
            d.recent_submissions.iter().take(limit).cloned().collect()
        })
    }

    async fn recent_applications(&self, limit: usize) -> StorageResult<Vec<ApplicationActivity>> {
        self.answer(StubQuery::RecentApplications, |d| {
            d.recent_applications.iter().take(limit).cloned().collect()
        })
    }

    async fn ping(&self) -> StorageResult<()> {
        self.answer(StubQuery::Ping, |_| ())
    }
}

// ============================================================================
// RECORDING CACHE BACKEND
// ============================================================================

/// A write seen by [`RecordingCacheBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub key: String,
    pub value: String,
    pub ttl_secs: u64,
}

/// Cache backend that keeps entries forever and records every call.
///
/// Reads and writes can be switched to fail independently to exercise the
/// non-fatal cache paths. A failing read also fails `ping`.
#[derive(Debug, Default)]
pub struct RecordingCacheBackend {
    entries: Mutex<HashMap<String, String>>,
    reads: Mutex<Vec<String>>,
    writes: Mutex<Vec<RecordedWrite>>,
    hits: AtomicU64,
    misses: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl RecordingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `key` without recording a write.
    pub fn seed(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), value.to_string());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current raw value under `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    /// Keys read, in call order.
    pub fn reads(&self) -> Vec<String> {
        lock(&self.reads).clone()
    }

    /// Writes attempted, in call order, including failed ones.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        lock(&self.writes).clone()
    }

    pub fn read_count(&self) -> usize {
        lock(&self.reads).len()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.writes).len()
    }
}

#[async_trait]
impl CacheBackend for RecordingCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        lock(&self.reads).push(key.to_string());
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Read {
                key: key.to_string(),
                reason: "injected read failure".to_string(),
            });
        }
        let value = lock(&self.entries).get(key).cloned();
        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        lock(&self.writes).push(RecordedWrite {
            key: key.to_string(),
            value: value.to_string(),
            ttl_secs,
        });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Write {
                key: key.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("injected ping failure".to_string()));
        }
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.write_count() as u64,
            entry_count: lock(&self.entries).len() as u64,
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made marketplace records. Every call mints fresh ids.

    use chrono::Utc;
    use opentribe_core::{
        new_entity_id, ApplicationStatus, Bounty, BountyStatus, Grant, GrantApplication,
        GrantStatus, Organization, Rfp, RfpStatus, Submission, SubmissionStatus, Timestamp, User,
        Visibility,
    };
    use opentribe_storage::{ApplicationActivity, SubmissionActivity};

    fn slugify(text: &str) -> String {
        text.to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn organization(name: &str) -> Organization {
        Organization {
            organization_id: new_entity_id(),
            name: name.to_string(),
            slug: slugify(name),
            logo: Some(format!("https://cdn.opentribe.io/logos/{}.png", slugify(name))),
        }
    }

    pub fn user(username: &str) -> User {
        User {
            user_id: new_entity_id(),
            username: username.to_string(),
            name: Some(format!("{} (test)", username)),
            avatar_url: None,
        }
    }

    /// Published bounty of `org`.
    pub fn bounty(org: &Organization, status: BountyStatus, amount_usd: Option<f64>) -> Bounty {
        let title = format!("{} bounty", org.name);
        Bounty {
            bounty_id: new_entity_id(),
            organization_id: org.organization_id,
            slug: slugify(&title),
            title,
            visibility: Visibility::Published,
            status,
            amount_usd,
            skills: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Published grant of `org`.
    pub fn grant(org: &Organization, status: GrantStatus, total_funds_usd: Option<f64>) -> Grant {
        let title = format!("{} grant", org.name);
        Grant {
            grant_id: new_entity_id(),
            organization_id: org.organization_id,
            slug: slugify(&title),
            title,
            visibility: Visibility::Published,
            status,
            total_funds_usd,
            skills: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Published RFP under `grant`.
    pub fn rfp(grant: &Grant, status: RfpStatus) -> Rfp {
        let title = format!("{} RFP", grant.title);
        Rfp {
            rfp_id: new_entity_id(),
            grant_id: grant.grant_id,
            slug: slugify(&title),
            title,
            visibility: Visibility::Published,
            status,
            created_at: Utc::now(),
        }
    }

    /// Submitted entry by `user` for `bounty`.
    pub fn submission(bounty: &Bounty, user: &User, submitted_at: Timestamp) -> Submission {
        Submission {
            submission_id: new_entity_id(),
            bounty_id: bounty.bounty_id,
            user_id: user.user_id,
            status: SubmissionStatus::Submitted,
            submitted_at: Some(submitted_at),
            created_at: submitted_at,
        }
    }

    /// Submitted application by `user` to `grant`.
    pub fn application(grant: &Grant, user: &User, submitted_at: Timestamp) -> GrantApplication {
        GrantApplication {
            application_id: new_entity_id(),
            grant_id: grant.grant_id,
            user_id: user.user_id,
            title: format!("{} proposal", user.username),
            status: ApplicationStatus::Submitted,
            submitted_at: Some(submitted_at),
            created_at: submitted_at,
        }
    }

    /// Joined submission row as the store returns it.
    pub fn submission_activity(user: &User, activity_at: Timestamp) -> SubmissionActivity {
        SubmissionActivity {
            submission_id: new_entity_id(),
            user: user.clone(),
            bounty_id: new_entity_id(),
            bounty_title: "Build a parachain indexer".to_string(),
            bounty_slug: "build-a-parachain-indexer".to_string(),
            activity_at,
        }
    }

    /// Joined application row as the store returns it.
    pub fn application_activity(user: &User, activity_at: Timestamp) -> ApplicationActivity {
        ApplicationActivity {
            application_id: new_entity_id(),
            user: user.clone(),
            grant_id: new_entity_id(),
            grant_title: "Ecosystem tooling grant".to_string(),
            grant_slug: "ecosystem-tooling-grant".to_string(),
            activity_at,
        }
    }
}

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

pub mod strategies {
    //! Proptest strategies for ranking and aggregation inputs.

    use opentribe_core::Organization;
    use opentribe_storage::OrganizationOpportunities;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Skill pool, padded with whitespace and blanks by [`skill_lists`].
    pub const SKILLS: &[&str] = &[
        "Rust",
        "Substrate",
        "ink!",
        "TypeScript",
        "React",
        "Solidity",
        "Design",
        "Content",
        "DevRel",
        "Research",
        "Polkadot SDK",
        "Go",
    ];

    pub fn arb_organization() -> impl Strategy<Value = Organization> {
        (any::<u128>(), "[A-Z][a-z]{2,8}").prop_map(|(id, name)| Organization {
            organization_id: Uuid::from_u128(id),
            slug: name.to_lowercase(),
            name,
            logo: None,
        })
    }

    /// One organization's rollup on one side: absent, or 1..5 open
    /// opportunities with an optional summed value.
    fn arb_side_entry() -> impl Strategy<Value = Option<(u64, Option<f64>)>> {
        prop::option::of((1u64..6, prop::option::of(0.0f64..1_000_000.0)))
    }

    /// Bounty-side and grant-side rollups over a shared organization pool,
    /// at most one row per organization per side.
    pub fn organization_rollups(
    ) -> impl Strategy<Value = (Vec<OrganizationOpportunities>, Vec<OrganizationOpportunities>)>
    {
        prop::collection::vec(arb_organization(), 0..8)
            .prop_flat_map(|orgs| {
                let n = orgs.len();
                (
                    Just(orgs),
                    prop::collection::vec(arb_side_entry(), n),
                    prop::collection::vec(arb_side_entry(), n),
                )
            })
            .prop_map(|(orgs, bounty_side, grant_side)| {
                let side = |entries: Vec<Option<(u64, Option<f64>)>>| {
                    orgs.iter()
                        .zip(entries)
                        .filter_map(|(org, entry)| {
                            entry.map(|(count, value)| OrganizationOpportunities {
                                organization: org.clone(),
                                count,
                                value,
                            })
                        })
                        .collect::<Vec<_>>()
                };
                (side(bounty_side), side(grant_side))
            })
    }

    fn arb_skill() -> impl Strategy<Value = String> {
        prop_oneof![
            4 => (prop::sample::select(SKILLS), any::<bool>()).prop_map(|(skill, pad)| {
                if pad {
                    format!("  {} ", skill)
                } else {
                    skill.to_string()
                }
            }),
            1 => Just(String::new()),
            1 => Just("   ".to_string()),
        ]
    }

    /// Per-opportunity skill lists.
    pub fn skill_lists() -> impl Strategy<Value = Vec<Vec<String>>> {
        prop::collection::vec(prop::collection::vec(arb_skill(), 0..6), 0..12)
    }
}
