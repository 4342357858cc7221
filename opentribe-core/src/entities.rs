//! Marketplace records
//!
//! Only the columns the statistics layer reads are modelled. The full
//! relational schema belongs to the persistence layer.

use crate::{
    ApplicationStatus, BountyStatus, EntityId, GrantStatus, RfpStatus, SubmissionStatus,
    Timestamp, Visibility,
};
use serde::{Deserialize, Serialize};

/// Organization publishing opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: EntityId,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
}

/// Platform member. Builders author submissions and applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: EntityId,
    pub username: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Bounty - a fixed-reward task posted by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounty {
    pub bounty_id: EntityId,
    pub organization_id: EntityId,
    pub title: String,
    pub slug: String,
    pub visibility: Visibility,
    pub status: BountyStatus,
    /// Reward converted to USD at publish time.
    pub amount_usd: Option<f64>,
    pub skills: Vec<String>,
    pub created_at: Timestamp,
}

/// Grant program funded by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub grant_id: EntityId,
    pub organization_id: EntityId,
    pub title: String,
    pub slug: String,
    pub visibility: Visibility,
    pub status: GrantStatus,
    pub total_funds_usd: Option<f64>,
    pub skills: Vec<String>,
    pub created_at: Timestamp,
}

/// Request for proposals attached to a grant program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfp {
    pub rfp_id: EntityId,
    pub grant_id: EntityId,
    pub title: String,
    pub slug: String,
    pub visibility: Visibility,
    pub status: RfpStatus,
    pub created_at: Timestamp,
}

/// A builder's submission to a bounty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: EntityId,
    pub bounty_id: EntityId,
    pub user_id: EntityId,
    pub status: SubmissionStatus,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Submission {
    /// When the submission entered the activity feed.
    pub fn activity_at(&self) -> Timestamp {
        self.submitted_at.unwrap_or(self.created_at)
    }
}

/// A builder's application to a grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantApplication {
    pub application_id: EntityId,
    pub grant_id: EntityId,
    pub user_id: EntityId,
    pub title: String,
    pub status: ApplicationStatus,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl GrantApplication {
    /// When the application entered the activity feed.
    pub fn activity_at(&self) -> Timestamp {
        self.submitted_at.unwrap_or(self.created_at)
    }
}
