//! Opentribe Core - Marketplace Types
//!
//! Pure data structures shared by every other crate: marketplace records,
//! query filters, statistics snapshots and the error taxonomy. The only
//! behavior living here is formatting and filter matching.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod currency;
pub mod entities;
pub mod enums;
pub mod error;
pub mod filter;
pub mod stats;

pub use currency::{format_compact_usd, group_thousands};
pub use entities::{Bounty, Grant, GrantApplication, Organization, Rfp, Submission, User};
pub use enums::{
    ActivityKind, ApplicationStatus, BountyStatus, EnumParseError, GrantStatus, OpportunityKind,
    RfpStatus, SubmissionStatus, Visibility,
};
pub use error::{
    CacheError, ConfigError, OpentribeError, OpentribeResult, PriceError, StorageError,
    StorageResult,
};
pub use filter::{BountyFilter, GrantFilter, RfpFilter};
pub use stats::{
    ActivityActor, ActivityEvent, ActivityTarget, BountyStats, FeaturedOrganization, GrantStats,
    HomepageStats, HomepageTotals, RfpStats, SkillCount,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier. UUIDv7 keeps ids sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId.
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Render a timestamp the way the web clients expect it: ISO-8601 with
/// millisecond precision and a `Z` suffix.
///
/// Fixed width matters: recent activity is ordered by comparing these
/// strings lexicographically.
pub fn iso_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_entity_ids_are_unique() {
        let a = new_entity_id();
        let b = new_entity_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_iso_timestamp_is_fixed_width() {
        let early = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 11, 12, 13, 14, 15).unwrap();

        assert_eq!(iso_timestamp(&early), "2025-01-02T03:04:05.000Z");
        assert_eq!(iso_timestamp(&early).len(), iso_timestamp(&late).len());
        assert!(iso_timestamp(&early) < iso_timestamp(&late));
    }
}
