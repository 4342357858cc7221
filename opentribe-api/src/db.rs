//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`StatsStore`] implementation the statistics endpoints run against.
//!
//! Every query is a single aggregate or bounded read over the marketplace
//! tables. Enum columns hold the SCREAMING_SNAKE_CASE text produced by
//! `as_db_str`; filters are bound as parameters, never interpolated.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use opentribe_core::{
    BountyFilter, EntityId, GrantFilter, Organization, RfpFilter, StorageError, StorageResult,
    Timestamp, User,
};
use opentribe_storage::{
    ApplicationActivity, OrganizationOpportunities, StatsStore, SubmissionActivity,
};
use std::time::Duration;
use tokio_postgres::{types::ToSql, NoTls, Row};

use crate::error::{ApiError, ApiResult};

const SUBMISSION_AUTHORS_SQL: &str =
    "SELECT DISTINCT user_id FROM submissions WHERE status <> 'DRAFT'";
const APPLICATION_AUTHORS_SQL: &str =
    "SELECT DISTINCT user_id FROM grant_applications WHERE status <> 'DRAFT'";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection checkout timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "opentribe".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("OPENTRIBE_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("OPENTRIBE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("OPENTRIBE_DB_NAME").unwrap_or_else(|_| "opentribe".to_string()),
            user: std::env::var("OPENTRIBE_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("OPENTRIBE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("OPENTRIBE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("OPENTRIBE_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the first query.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

/// Pool checkout failures surface as a generic connection error; the cause
/// is logged.
fn pool_error(err: deadpool_postgres::PoolError) -> StorageError {
    tracing::error!("Connection pool error: {:?}", err);
    StorageError::Connection("Database connection failed".to_string())
}

/// Query failures surface as a generic query error; the cause is logged.
fn query_error(err: tokio_postgres::Error) -> StorageError {
    tracing::error!("Database error: {:?}", err);
    StorageError::Query("Database query failed".to_string())
}

fn count_from(row: &Row) -> StorageResult<u64> {
    let count: i64 = row.try_get(0).map_err(query_error)?;
    u64::try_from(count).map_err(|_| StorageError::InvalidRow {
        column: "count".to_string(),
        reason: format!("negative count {}", count),
    })
}

// ============================================================================
// SQL
// ============================================================================

// $1: visibility or NULL, $2: allowed statuses (empty = any).
const BOUNTY_WHERE: &str = "($1::text IS NULL OR b.visibility = $1) \
     AND (cardinality($2::text[]) = 0 OR b.status = ANY($2))";

const GRANT_WHERE: &str = "($1::text IS NULL OR g.visibility = $1) \
     AND (cardinality($2::text[]) = 0 OR g.status = ANY($2))";

/// Bind parameters shared by the bounty and grant filters.
struct FilterParams {
    visibility: Option<&'static str>,
    statuses: Vec<&'static str>,
}

impl FilterParams {
    fn bounty(filter: &BountyFilter) -> Self {
        Self {
            visibility: filter.visibility.map(|v| v.as_db_str()),
            statuses: filter.statuses.iter().map(|s| s.as_db_str()).collect(),
        }
    }

    fn grant(filter: &GrantFilter) -> Self {
        Self {
            visibility: filter.visibility.map(|v| v.as_db_str()),
            statuses: filter.statuses.iter().map(|s| s.as_db_str()).collect(),
        }
    }

    fn as_params(&self) -> [&(dyn ToSql + Sync); 2] {
        [&self.visibility, &self.statuses]
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> StorageResult<Row> {
        let conn = self.get_conn().await?;
        conn.query_one(sql, params).await.map_err(query_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> StorageResult<Vec<Row>> {
        let conn = self.get_conn().await?;
        conn.query(sql, params).await.map_err(query_error)
    }

    async fn opportunities(
        &self,
        sql: &str,
        params: &FilterParams,
    ) -> StorageResult<Vec<OrganizationOpportunities>> {
        let rows = self.query(sql, &params.as_params()).await?;
        rows.iter()
            .map(|row| {
                Ok(OrganizationOpportunities {
                    organization: Organization {
                        organization_id: row.try_get("id").map_err(query_error)?,
                        name: row.try_get("name").map_err(query_error)?,
                        slug: row.try_get("slug").map_err(query_error)?,
                        logo: row.try_get("logo").map_err(query_error)?,
                    },
                    count: count_from(row)?,
                    value: row.try_get("value").map_err(query_error)?,
                })
            })
            .collect()
    }

    fn user_from(row: &Row) -> StorageResult<User> {
        Ok(User {
            user_id: row.try_get("user_id").map_err(query_error)?,
            username: row.try_get("username").map_err(query_error)?,
            name: row.try_get("user_name").map_err(query_error)?,
            avatar_url: row.try_get("avatar_url").map_err(query_error)?,
        })
    }
}

#[async_trait]
impl StatsStore for DbClient {
    async fn bounty_count(&self, filter: &BountyFilter) -> StorageResult<u64> {
        let params = FilterParams::bounty(filter);
        let sql = format!("SELECT COUNT(*) FROM bounties b WHERE {}", BOUNTY_WHERE);
        let row = self.query_one(&sql, &params.as_params()).await?;
        count_from(&row)
    }

    async fn bounty_sum_amount_usd(&self, filter: &BountyFilter) -> StorageResult<Option<f64>> {
        let params = FilterParams::bounty(filter);
        let sql = format!(
            "SELECT SUM(b.amount_usd)::float8 FROM bounties b WHERE {}",
            BOUNTY_WHERE
        );
        let row = self.query_one(&sql, &params.as_params()).await?;
        row.try_get(0).map_err(query_error)
    }

    async fn bounty_skills(&self, filter: &BountyFilter) -> StorageResult<Vec<Vec<String>>> {
        let params = FilterParams::bounty(filter);
        let sql = format!("SELECT b.skills FROM bounties b WHERE {}", BOUNTY_WHERE);
        let rows = self.query(&sql, &params.as_params()).await?;
        rows.iter()
            .map(|row| {
                let skills: Option<Vec<String>> = row.try_get(0).map_err(query_error)?;
                Ok(skills.unwrap_or_default())
            })
            .collect()
    }

    async fn bounty_opportunities_by_organization(
        &self,
        filter: &BountyFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>> {
        let sql = format!(
            "SELECT COUNT(*) AS count, o.id, o.name, o.slug, o.logo, \
                    SUM(b.amount_usd)::float8 AS value \
             FROM bounties b JOIN organizations o ON o.id = b.organization_id \
             WHERE {} \
             GROUP BY o.id, o.name, o.slug, o.logo",
            BOUNTY_WHERE
        );
        self.opportunities(&sql, &FilterParams::bounty(filter)).await
    }

    async fn grant_count(&self, filter: &GrantFilter) -> StorageResult<u64> {
        let params = FilterParams::grant(filter);
        let sql = format!("SELECT COUNT(*) FROM grants g WHERE {}", GRANT_WHERE);
        let row = self.query_one(&sql, &params.as_params()).await?;
        count_from(&row)
    }

    async fn grant_sum_total_funds_usd(&self, filter: &GrantFilter) -> StorageResult<Option<f64>> {
        let params = FilterParams::grant(filter);
        let sql = format!(
            "SELECT SUM(g.total_funds_usd)::float8 FROM grants g WHERE {}",
            GRANT_WHERE
        );
        let row = self.query_one(&sql, &params.as_params()).await?;
        row.try_get(0).map_err(query_error)
    }

    async fn grant_skills(&self, filter: &GrantFilter) -> StorageResult<Vec<Vec<String>>> {
        let params = FilterParams::grant(filter);
        let sql = format!("SELECT g.skills FROM grants g WHERE {}", GRANT_WHERE);
        let rows = self.query(&sql, &params.as_params()).await?;
        rows.iter()
            .map(|row| {
                let skills: Option<Vec<String>> = row.try_get(0).map_err(query_error)?;
                Ok(skills.unwrap_or_default())
            })
            .collect()
    }

    async fn grant_opportunities_by_organization(
        &self,
        filter: &GrantFilter,
    ) -> StorageResult<Vec<OrganizationOpportunities>> {
        let sql = format!(
            "SELECT COUNT(*) AS count, o.id, o.name, o.slug, o.logo, \
                    SUM(g.total_funds_usd)::float8 AS value \
             FROM grants g JOIN organizations o ON o.id = g.organization_id \
             WHERE {} \
             GROUP BY o.id, o.name, o.slug, o.logo",
            GRANT_WHERE
        );
        self.opportunities(&sql, &FilterParams::grant(filter)).await
    }

    async fn rfp_count(&self, filter: &RfpFilter) -> StorageResult<u64> {
        let visibility = filter.visibility.map(|v| v.as_db_str());
        let row = self
            .query_one(
                "SELECT COUNT(*) FROM rfps r WHERE ($1::text IS NULL OR r.visibility = $1)",
                &[&visibility],
            )
            .await?;
        count_from(&row)
    }

    async fn submission_author_ids(&self) -> StorageResult<Vec<EntityId>> {
        let rows = self.query(SUBMISSION_AUTHORS_SQL, &[]).await?;
        rows.iter()
            .map(|row| row.try_get(0).map_err(query_error))
            .collect()
    }

    async fn application_author_ids(&self) -> StorageResult<Vec<EntityId>> {
        let rows = self.query(APPLICATION_AUTHORS_SQL, &[]).await?;
        rows.iter()
            .map(|row| row.try_get(0).map_err(query_error))
            .collect()
    }

    async fn recent_submissions(&self, limit: usize) -> StorageResult<Vec<SubmissionActivity>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .query(
                "SELECT s.id, COALESCE(s.submitted_at, s.created_at) AS activity_at, \
                        u.id AS user_id, u.username, u.name AS user_name, u.avatar_url, \
                        b.id AS target_id, b.title, b.slug \
                 FROM submissions s \
                 JOIN users u ON u.id = s.user_id \
                 JOIN bounties b ON b.id = s.bounty_id \
                 WHERE s.status <> 'DRAFT' \
                 ORDER BY activity_at DESC, s.id DESC \
                 LIMIT $1",
                &[&limit],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let activity_at: Timestamp = row.try_get("activity_at").map_err(query_error)?;
                Ok(SubmissionActivity {
                    submission_id: row.try_get("id").map_err(query_error)?,
                    user: Self::user_from(row)?,
                    bounty_id: row.try_get("target_id").map_err(query_error)?,
                    bounty_title: row.try_get("title").map_err(query_error)?,
                    bounty_slug: row.try_get("slug").map_err(query_error)?,
                    activity_at,
                })
            })
            .collect()
    }

    async fn recent_applications(&self, limit: usize) -> StorageResult<Vec<ApplicationActivity>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .query(
                "SELECT a.id, COALESCE(a.submitted_at, a.created_at) AS activity_at, \
                        u.id AS user_id, u.username, u.name AS user_name, u.avatar_url, \
                        g.id AS target_id, g.title, g.slug \
                 FROM grant_applications a \
                 JOIN users u ON u.id = a.user_id \
                 JOIN grants g ON g.id = a.grant_id \
                 WHERE a.status <> 'DRAFT' \
                 ORDER BY activity_at DESC, a.id DESC \
                 LIMIT $1",
                &[&limit],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let activity_at: Timestamp = row.try_get("activity_at").map_err(query_error)?;
                Ok(ApplicationActivity {
                    application_id: row.try_get("id").map_err(query_error)?,
                    user: Self::user_from(row)?,
                    grant_id: row.try_get("target_id").map_err(query_error)?,
                    grant_title: row.try_get("title").map_err(query_error)?,
                    grant_slug: row.try_get("slug").map_err(query_error)?,
                    activity_at,
                })
            })
            .collect()
    }

    async fn ping(&self) -> StorageResult<()> {
        self.query_one("SELECT 1", &[]).await?;
        Ok(())
    }
}
