//! Enum types for Opentribe records
//!
//! Database representations use the SCREAMING_SNAKE_CASE names of the
//! relational schema (`PUBLISHED`, `UNDER_REVIEW`, ...). Parsing is lenient
//! about case, `-`, `_` and whitespace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Implements `as_db_str`, `from_db_str`, `Display` and `FromStr` for a
/// fieldless enum. Each variant lists its database name and the normalized
/// tokens it accepts.
macro_rules! db_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $db:literal [$($token:literal),+]),+ $(,)? }) => {
        impl $name {
            /// Convert to database string representation.
            pub fn as_db_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $db,)+
                }
            }

            /// Parse from database string representation.
            pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
                match normalize_token(s).as_str() {
                    $($($token)|+ => Ok($name::$variant),)+
                    _ => Err(EnumParseError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_db_str())
            }
        }

        impl FromStr for $name {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_db_str(s)
            }
        }
    };
}

// ============================================================================
// VISIBILITY
// ============================================================================

/// Publication state shared by bounties, grants and RFPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Draft,
    Published,
    Archived,
}

db_enum!(Visibility, "visibility", {
    Draft => "DRAFT" ["draft"],
    Published => "PUBLISHED" ["published"],
    Archived => "ARCHIVED" ["archived"],
});

// ============================================================================
// OPPORTUNITY STATUSES
// ============================================================================

/// Lifecycle of a bounty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BountyStatus {
    #[default]
    Open,
    Reviewing,
    Completed,
    Closed,
    Cancelled,
}

db_enum!(BountyStatus, "bounty status", {
    Open => "OPEN" ["open"],
    Reviewing => "REVIEWING" ["reviewing", "inreview"],
    Completed => "COMPLETED" ["completed", "complete"],
    Closed => "CLOSED" ["closed"],
    Cancelled => "CANCELLED" ["cancelled", "canceled"],
});

impl BountyStatus {
    /// Statuses whose rewards count towards the platform reward total.
    pub const REWARDED: [BountyStatus; 3] = [
        BountyStatus::Completed,
        BountyStatus::Open,
        BountyStatus::Reviewing,
    ];
}

/// Lifecycle of a grant program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    #[default]
    Open,
    Paused,
    Closed,
}

db_enum!(GrantStatus, "grant status", {
    Open => "OPEN" ["open"],
    Paused => "PAUSED" ["paused"],
    Closed => "CLOSED" ["closed"],
});

/// Lifecycle of a request for proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RfpStatus {
    #[default]
    Open,
    Closed,
    Completed,
}

db_enum!(RfpStatus, "rfp status", {
    Open => "OPEN" ["open"],
    Closed => "CLOSED" ["closed"],
    Completed => "COMPLETED" ["completed", "complete"],
});

// ============================================================================
// BUILDER WORK STATUSES
// ============================================================================

/// Status of a bounty submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    #[default]
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Withdrawn,
}

db_enum!(SubmissionStatus, "submission status", {
    Draft => "DRAFT" ["draft"],
    Submitted => "SUBMITTED" ["submitted"],
    UnderReview => "UNDER_REVIEW" ["underreview"],
    Approved => "APPROVED" ["approved"],
    Rejected => "REJECTED" ["rejected"],
    Withdrawn => "WITHDRAWN" ["withdrawn"],
});

/// Status of a grant application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Withdrawn,
}

db_enum!(ApplicationStatus, "application status", {
    Draft => "DRAFT" ["draft"],
    Submitted => "SUBMITTED" ["submitted"],
    UnderReview => "UNDER_REVIEW" ["underreview"],
    Approved => "APPROVED" ["approved"],
    Rejected => "REJECTED" ["rejected"],
    Withdrawn => "WITHDRAWN" ["withdrawn"],
});

// ============================================================================
// ACTIVITY
// ============================================================================

/// Kind of event shown in the homepage activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Submission,
    Application,
}

/// Kind of opportunity an activity event points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Bounty,
    Grant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_db_roundtrip() {
        for v in [Visibility::Draft, Visibility::Published, Visibility::Archived] {
            assert_eq!(Visibility::from_db_str(v.as_db_str()), Ok(v));
        }
    }

    #[test]
    fn test_status_parsing_is_lenient() {
        assert_eq!("under_review".parse(), Ok(SubmissionStatus::UnderReview));
        assert_eq!("Under Review".parse(), Ok(ApplicationStatus::UnderReview));
        assert_eq!("canceled".parse(), Ok(BountyStatus::Cancelled));
        assert_eq!("OPEN".parse(), Ok(GrantStatus::Open));
    }

    #[test]
    fn test_parse_error_names_kind_and_value() {
        let err = "someday".parse::<RfpStatus>().unwrap_err();
        assert_eq!(err.kind, "rfp status");
        assert_eq!(err.to_string(), "Invalid rfp status: someday");
    }

    #[test]
    fn test_serde_uses_schema_names() {
        let json = serde_json::to_string(&SubmissionStatus::UnderReview).unwrap();
        assert_eq!(json, "\"UNDER_REVIEW\"");
        let json = serde_json::to_string(&ActivityKind::Application).unwrap();
        assert_eq!(json, "\"application\"");
    }

    #[test]
    fn test_rewarded_statuses() {
        assert!(BountyStatus::REWARDED.contains(&BountyStatus::Reviewing));
        assert!(!BountyStatus::REWARDED.contains(&BountyStatus::Cancelled));
        assert!(!BountyStatus::REWARDED.contains(&BountyStatus::Closed));
    }
}
