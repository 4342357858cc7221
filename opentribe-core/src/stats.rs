//! Statistics snapshots
//!
//! Each snapshot is the immutable payload of one statistics domain. Numeric
//! fields are always finite and non-negative: absent aggregates become `0`.

use crate::{ActivityKind, EntityId, OpportunityKind};
use serde::{Deserialize, Serialize, Serializer};

/// Collapse an aggregate result into a finite, non-negative amount.
///
/// `None` is what a SUM over zero rows yields; NaN or negative values can
/// only come from corrupt rows and are treated the same way.
pub fn non_negative_amount(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Serialize whole-dollar amounts as JSON integers (`150000`, not
/// `150000.0`); fractional amounts stay floats.
fn serialize_amount<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && *value >= 0.0 && *value <= u64::MAX as f64 {
        serializer.serialize_u64(*value as u64)
    } else {
        serializer.serialize_f64(*value)
    }
}

// ============================================================================
// FLAT SNAPSHOTS
// ============================================================================

/// `GET /api/v1/bounties/stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BountyStats {
    /// Published bounties in any status.
    pub total_bounties_count: u64,
    /// USD rewards across published open, reviewing and completed bounties.
    #[serde(serialize_with = "serialize_amount")]
    pub total_rewards: f64,
}

/// `GET /api/v1/grants/stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GrantStats {
    /// Published, open grants.
    pub total_grants_count: u64,
    /// USD funds across published, open grants.
    #[serde(serialize_with = "serialize_amount")]
    pub total_funds: f64,
}

/// `GET /api/v1/rfps/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RfpStats {
    pub total_rfps_count: u64,
    pub total_grants_count: u64,
}

// ============================================================================
// HOMEPAGE COMPOSITE
// ============================================================================

/// `GET /api/v1/home/stats` (served inside a `{ "data": ... }` envelope).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HomepageStats {
    pub stats: HomepageTotals,
    pub featured_organizations: Vec<FeaturedOrganization>,
    pub popular_skills: Vec<SkillCount>,
    pub recent_activity: Vec<ActivityEvent>,
}

/// Headline counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HomepageTotals {
    pub active_bounties: u64,
    pub active_grants: u64,
    /// Distinct users with at least one non-draft submission or application.
    pub total_builders: u64,
    #[serde(serialize_with = "serialize_amount")]
    pub total_rewards: f64,
    pub total_rewards_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FeaturedOrganization {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub bounty_count: u64,
    pub grant_count: u64,
    pub total_opportunities: u64,
    #[serde(serialize_with = "serialize_amount")]
    pub total_value: f64,
    pub total_value_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SkillCount {
    pub skill: String,
    pub count: u64,
}

/// One row of the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityEvent {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub actor: ActivityActor,
    pub target: ActivityTarget,
    /// ISO-8601, millisecond precision, UTC.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityActor {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub id: EntityId,
    pub username: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityTarget {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub id: EntityId,
    pub title: String,
    pub slug: String,
    pub kind: OpportunityKind,
}
