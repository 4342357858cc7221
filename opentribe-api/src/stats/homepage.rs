//! Homepage composite statistics.
//!
//! Everything the landing page shows in one snapshot: headline counters,
//! the three organizations with the most valuable open opportunities, the
//! ten most requested skills and the ten latest submissions/applications.

use std::collections::{HashMap, HashSet};

use opentribe_core::{
    format_compact_usd, iso_timestamp, stats::non_negative_amount, ActivityActor, ActivityEvent,
    ActivityKind, ActivityTarget, BountyFilter, BountyStatus, EntityId, FeaturedOrganization,
    GrantFilter, GrantStatus, HomepageStats, HomepageTotals, OpportunityKind, SkillCount,
    StorageResult, User,
};
use opentribe_storage::{
    ApplicationActivity, OrganizationOpportunities, StatsStore, SubmissionActivity,
};

pub const FEATURED_ORGANIZATIONS_LIMIT: usize = 3;
pub const POPULAR_SKILLS_LIMIT: usize = 10;
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Compute the homepage snapshot.
///
/// "Active" means published with status `OPEN`, for bounties and grants
/// alike. All twelve queries run concurrently.
pub async fn compute_homepage_stats(store: &dyn StatsStore) -> StorageResult<HomepageStats> {
    let active_bounties = BountyFilter::published().with_statuses([BountyStatus::Open]);
    let active_grants = GrantFilter::published().with_statuses([GrantStatus::Open]);

    let (
        active_bounty_count,
        active_grant_count,
        submission_authors,
        application_authors,
        bounty_rewards,
        grant_funds,
        bounty_orgs,
        grant_orgs,
        bounty_skills,
        grant_skills,
        submissions,
        applications,
    ) = tokio::try_join!(
        store.bounty_count(&active_bounties),
        store.grant_count(&active_grants),
        store.submission_author_ids(),
        store.application_author_ids(),
        store.bounty_sum_amount_usd(&active_bounties),
        store.grant_sum_total_funds_usd(&active_grants),
        store.bounty_opportunities_by_organization(&active_bounties),
        store.grant_opportunities_by_organization(&active_grants),
        store.bounty_skills(&active_bounties),
        store.grant_skills(&active_grants),
        store.recent_submissions(RECENT_ACTIVITY_LIMIT),
        store.recent_applications(RECENT_ACTIVITY_LIMIT),
    )?;

    let total_rewards = non_negative_amount(bounty_rewards) + non_negative_amount(grant_funds);

    Ok(HomepageStats {
        stats: HomepageTotals {
            active_bounties: active_bounty_count,
            active_grants: active_grant_count,
            total_builders: count_builders(&submission_authors, &application_authors),
            total_rewards,
            total_rewards_formatted: format_compact_usd(total_rewards),
        },
        featured_organizations: rank_organizations(bounty_orgs, grant_orgs),
        popular_skills: rank_skills(bounty_skills.iter().chain(grant_skills.iter())),
        recent_activity: merge_activity(submissions, applications),
    })
}

/// Distinct authors across submissions and applications.
pub fn count_builders(submission_authors: &[EntityId], application_authors: &[EntityId]) -> u64 {
    submission_authors
        .iter()
        .chain(application_authors)
        .collect::<HashSet<_>>()
        .len() as u64
}

/// Merge bounty- and grant-side rollups per organization, drop those with
/// nothing open, rank by total value then by opportunity count, keep three.
///
/// Organizations that tie on both keep the order they were first seen in,
/// bounty rollups first.
pub fn rank_organizations(
    bounty_side: Vec<OrganizationOpportunities>,
    grant_side: Vec<OrganizationOpportunities>,
) -> Vec<FeaturedOrganization> {
    let mut order: Vec<EntityId> = Vec::new();
    let mut merged: HashMap<EntityId, FeaturedOrganization> = HashMap::new();

    let sides = bounty_side
        .into_iter()
        .map(|o| (OpportunityKind::Bounty, o))
        .chain(grant_side.into_iter().map(|o| (OpportunityKind::Grant, o)));

    for (kind, rollup) in sides {
        let id = rollup.organization.organization_id;
        let entry = merged.entry(id).or_insert_with(|| {
            order.push(id);
            FeaturedOrganization {
                id,
                name: rollup.organization.name.clone(),
                slug: rollup.organization.slug.clone(),
                logo: rollup.organization.logo.clone(),
                bounty_count: 0,
                grant_count: 0,
                total_opportunities: 0,
                total_value: 0.0,
                total_value_formatted: String::new(),
            }
        });

        match kind {
            OpportunityKind::Bounty => entry.bounty_count += rollup.count,
            OpportunityKind::Grant => entry.grant_count += rollup.count,
        }
        entry.total_opportunities += rollup.count;
        entry.total_value += non_negative_amount(rollup.value);
    }

    let mut ranked: Vec<FeaturedOrganization> = order
        .into_iter()
        .filter_map(|id| merged.remove(&id))
        .filter(|org| org.total_opportunities > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.total_value
            .total_cmp(&a.total_value)
            .then_with(|| b.total_opportunities.cmp(&a.total_opportunities))
    });
    ranked.truncate(FEATURED_ORGANIZATIONS_LIMIT);

    for org in &mut ranked {
        org.total_value_formatted = format_compact_usd(org.total_value);
    }
    ranked
}

/// Count trimmed, non-empty skills and keep the ten most frequent.
///
/// Equal counts are ordered by skill name so the result is deterministic.
/// Matching is case-sensitive.
pub fn rank_skills<'a>(skill_lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<SkillCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for skill in skill_lists.flatten() {
        let skill = skill.trim();
        if !skill.is_empty() {
            *counts.entry(skill).or_default() += 1;
        }
    }

    let mut ranked: Vec<SkillCount> = counts
        .into_iter()
        .map(|(skill, count)| SkillCount {
            skill: skill.to_string(),
            count,
        })
        .collect();

    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    ranked.truncate(POPULAR_SKILLS_LIMIT);
    ranked
}

fn actor(user: User) -> ActivityActor {
    ActivityActor {
        id: user.user_id,
        username: user.username,
        name: user.name,
        avatar_url: user.avatar_url,
    }
}

/// Feed entry for a bounty submission.
pub fn submission_event(activity: SubmissionActivity) -> ActivityEvent {
    ActivityEvent {
        id: activity.submission_id,
        kind: ActivityKind::Submission,
        timestamp: iso_timestamp(&activity.activity_at),
        actor: actor(activity.user),
        target: ActivityTarget {
            id: activity.bounty_id,
            title: activity.bounty_title,
            slug: activity.bounty_slug,
            kind: OpportunityKind::Bounty,
        },
    }
}

/// Feed entry for a grant application.
pub fn application_event(activity: ApplicationActivity) -> ActivityEvent {
    ActivityEvent {
        id: activity.application_id,
        kind: ActivityKind::Application,
        timestamp: iso_timestamp(&activity.activity_at),
        actor: actor(activity.user),
        target: ActivityTarget {
            id: activity.grant_id,
            title: activity.grant_title,
            slug: activity.grant_slug,
            kind: OpportunityKind::Grant,
        },
    }
}

/// Tag both feeds, merge, order newest first by timestamp string and keep
/// ten.
pub fn merge_activity(
    submissions: Vec<SubmissionActivity>,
    applications: Vec<ApplicationActivity>,
) -> Vec<ActivityEvent> {
    let mut events: Vec<ActivityEvent> = submissions
        .into_iter()
        .map(submission_event)
        .chain(applications.into_iter().map(application_event))
        .collect();

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events.truncate(RECENT_ACTIVITY_LIMIT);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use opentribe_core::Organization;
    use opentribe_test_utils::{fixtures, StubQuery, StubStatsStore};
    use uuid::Uuid;

    fn rollup(org: &Organization, count: u64, value: Option<f64>) -> OrganizationOpportunities {
        OrganizationOpportunities {
            organization: org.clone(),
            count,
            value,
        }
    }

    fn skills(lists: &[&[&str]]) -> Vec<Vec<String>> {
        lists
            .iter()
            .map(|l| l.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_count_builders_deduplicates() {
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        assert_eq!(count_builders(&[alice, alice, bob], &[bob]), 2);
        assert_eq!(count_builders(&[], &[]), 0);
    }

    #[test]
    fn test_rank_organizations_merges_and_ranks() {
        let parity = fixtures::organization("Parity");
        let acala = fixtures::organization("Acala");
        let moonbeam = fixtures::organization("Moonbeam");
        let astar = fixtures::organization("Astar");

        let ranked = rank_organizations(
            vec![
                rollup(&parity, 2, Some(10_000.0)),
                rollup(&acala, 1, Some(40_000.0)),
                rollup(&astar, 1, None),
            ],
            vec![
                rollup(&parity, 1, Some(45_000.0)),
                rollup(&moonbeam, 4, Some(5_000.0)),
            ],
        );

        let names: Vec<&str> = ranked.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Parity", "Acala", "Moonbeam"]);

        let top = &ranked[0];
        assert_eq!(top.bounty_count, 2);
        assert_eq!(top.grant_count, 1);
        assert_eq!(top.total_opportunities, 3);
        assert_eq!(top.total_value, 55_000.0);
        assert_eq!(top.total_value_formatted, "$55K");
    }

    #[test]
    fn test_rank_organizations_tie_breaks_on_count() {
        let a = fixtures::organization("A");
        let b = fixtures::organization("B");
        let ranked = rank_organizations(
            vec![rollup(&a, 1, Some(100.0)), rollup(&b, 5, Some(100.0))],
            Vec::new(),
        );
        assert_eq!(ranked[0].name, "B");
        assert_eq!(ranked[1].name, "A");
    }

    #[test]
    fn test_rank_organizations_drops_empty() {
        let a = fixtures::organization("A");
        let ranked = rank_organizations(vec![rollup(&a, 0, None)], Vec::new());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_skills_trims_and_counts() {
        let lists = skills(&[
            &["Rust", " Substrate ", ""],
            &["Rust", "  "],
            &["TypeScript", "Rust", "Substrate"],
        ]);
        let ranked = rank_skills(lists.iter());

        assert_eq!(
            ranked,
            vec![
                SkillCount {
                    skill: "Rust".to_string(),
                    count: 3
                },
                SkillCount {
                    skill: "Substrate".to_string(),
                    count: 2
                },
                SkillCount {
                    skill: "TypeScript".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_rank_skills_ties_by_name_and_limit() {
        let names: Vec<String> = (0..15).map(|i| format!("skill-{:02}", i)).collect();
        let lists = vec![names];
        let ranked = rank_skills(lists.iter());

        assert_eq!(ranked.len(), POPULAR_SKILLS_LIMIT);
        assert_eq!(ranked[0].skill, "skill-00");
        assert_eq!(ranked[9].skill, "skill-09");
    }

    #[test]
    fn test_merge_activity_orders_and_limits() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let user = fixtures::user("eve");
        let submissions: Vec<SubmissionActivity> = (0..10)
            .map(|i| fixtures::submission_activity(&user, base + Duration::minutes(i * 2)))
            .collect();
        let applications: Vec<ApplicationActivity> = (0..10)
            .map(|i| fixtures::application_activity(&user, base + Duration::minutes(i * 2 + 1)))
            .collect();

        let merged = merge_activity(submissions, applications);

        assert_eq!(merged.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(merged[0].kind, ActivityKind::Application);
        assert_eq!(merged[0].timestamp, "2025-03-01T00:19:00.000Z");
        assert_eq!(merged[1].kind, ActivityKind::Submission);
        assert_eq!(merged[9].timestamp, "2025-03-01T00:10:00.000Z");
        assert!(merged.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_activity_event_shape() {
        let user = fixtures::user("frank");
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let activity = fixtures::submission_activity(&user, at);
        let event = submission_event(activity.clone());

        assert_eq!(event.id, activity.submission_id);
        assert_eq!(event.actor.username, "frank");
        assert_eq!(event.target.kind, OpportunityKind::Bounty);
        assert_eq!(event.target.slug, activity.bounty_slug);
        assert_eq!(event.timestamp, "2026-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_homepage_totals() {
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let store = StubStatsStore::new()
            .with_bounty_count(12)
            .with_grant_count(4)
            .with_author_ids(vec![alice, bob, alice], vec![bob])
            .with_bounty_sum(Some(100_000.0))
            .with_grant_sum(Some(52_000.0));

        let stats = compute_homepage_stats(&store).await.unwrap();

        assert_eq!(stats.stats.active_bounties, 12);
        assert_eq!(stats.stats.active_grants, 4);
        assert_eq!(stats.stats.total_builders, 2);
        assert_eq!(stats.stats.total_rewards, 152_000.0);
        assert_eq!(stats.stats.total_rewards_formatted, "$152K");
        assert!(store
            .bounty_filters()
            .iter()
            .all(|f| *f == BountyFilter::published().with_statuses([BountyStatus::Open])));
    }

    #[tokio::test]
    async fn test_homepage_empty_store() {
        let stats = compute_homepage_stats(&StubStatsStore::new()).await.unwrap();

        assert_eq!(stats.stats.total_rewards, 0.0);
        assert_eq!(stats.stats.total_rewards_formatted, "$0");
        assert!(stats.featured_organizations.is_empty());
        assert!(stats.popular_skills.is_empty());
        assert!(stats.recent_activity.is_empty());
    }

    #[tokio::test]
    async fn test_homepage_any_failure_aborts() {
        let store = StubStatsStore::new()
            .failing(StubQuery::RecentApplications, opentribe_core::StorageError::Opaque);
        let err = compute_homepage_stats(&store).await.unwrap_err();
        assert_eq!(err, opentribe_core::StorageError::Opaque);
    }
}
