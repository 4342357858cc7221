//! Statistics compute functions.
//!
//! Each function derives one snapshot from a [`StatsStore`]. They are the
//! only code paths that touch persistence on behalf of the statistics
//! endpoints; caching happens around them, never inside. Queries belonging
//! to one snapshot run concurrently and the first failure aborts the whole
//! computation.

pub mod homepage;

use opentribe_core::{
    stats::non_negative_amount, BountyFilter, BountyStats, BountyStatus, GrantFilter, GrantStats,
    GrantStatus, RfpFilter, RfpStats, StorageResult,
};
use opentribe_storage::StatsStore;

pub use homepage::compute_homepage_stats;

/// Published bounties in any status, and the USD rewards of those that are
/// open, under review or completed.
pub async fn compute_bounty_stats(store: &dyn StatsStore) -> StorageResult<BountyStats> {
    let published = BountyFilter::published();
    let rewarded = BountyFilter::published().with_statuses(BountyStatus::REWARDED);

    let (total_bounties_count, total_rewards) = tokio::try_join!(
        store.bounty_count(&published),
        store.bounty_sum_amount_usd(&rewarded),
    )?;

    Ok(BountyStats {
        total_bounties_count,
        total_rewards: non_negative_amount(total_rewards),
    })
}

/// Published, open grants and their combined USD funds.
pub async fn compute_grant_stats(store: &dyn StatsStore) -> StorageResult<GrantStats> {
    let open = GrantFilter::published().with_statuses([GrantStatus::Open]);

    let (total_grants_count, total_funds) = tokio::try_join!(
        store.grant_count(&open),
        store.grant_sum_total_funds_usd(&open),
    )?;

    Ok(GrantStats {
        total_grants_count,
        total_funds: non_negative_amount(total_funds),
    })
}

/// Published RFPs and published grants, regardless of status.
pub async fn compute_rfp_stats(store: &dyn StatsStore) -> StorageResult<RfpStats> {
    let rfp_filter = RfpFilter::published();
    let grant_filter = GrantFilter::published();
    let (total_rfps_count, total_grants_count) = tokio::try_join!(
        store.rfp_count(&rfp_filter),
        store.grant_count(&grant_filter),
    )?;

    Ok(RfpStats {
        total_rfps_count,
        total_grants_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentribe_core::StorageError;
    use opentribe_test_utils::{StubQuery, StubStatsStore};

    #[tokio::test]
    async fn test_bounty_stats() {
        let store = StubStatsStore::new()
            .with_bounty_count(42)
            .with_bounty_sum(Some(150_000.0));

        let stats = compute_bounty_stats(&store).await.unwrap();
        assert_eq!(stats.total_bounties_count, 42);
        assert_eq!(stats.total_rewards, 150_000.0);
    }

    #[tokio::test]
    async fn test_bounty_stats_uses_published_and_rewarded_filters() {
        let store = StubStatsStore::new();
        compute_bounty_stats(&store).await.unwrap();

        let filters = store.bounty_filters();
        assert!(filters.contains(&BountyFilter::published()));
        assert!(filters
            .contains(&BountyFilter::published().with_statuses(BountyStatus::REWARDED)));
    }

    #[tokio::test]
    async fn test_null_sum_becomes_zero() {
        let store = StubStatsStore::new().with_grant_count(0).with_grant_sum(None);

        let stats = compute_grant_stats(&store).await.unwrap();
        assert_eq!(stats.total_grants_count, 0);
        assert_eq!(stats.total_funds, 0.0);
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            serde_json::json!({ "total_grants_count": 0, "total_funds": 0 })
        );
    }

    #[tokio::test]
    async fn test_rfp_stats() {
        let store = StubStatsStore::new().with_rfp_count(7).with_grant_count(12);

        let stats = compute_rfp_stats(&store).await.unwrap();
        assert_eq!(
            stats,
            RfpStats {
                total_rfps_count: 7,
                total_grants_count: 12,
            }
        );
        assert_eq!(store.grant_filters(), vec![GrantFilter::published()]);
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let store = StubStatsStore::new().failing(
            StubQuery::BountySum,
            StorageError::Connection("Database connection failed".to_string()),
        );

        let err = compute_bounty_stats(&store).await.unwrap_err();
        assert_eq!(
            err,
            StorageError::Connection("Database connection failed".to_string())
        );
    }
}
