//! Postgres-backed company records and rate-limit log.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use prospect_common::{CompanyIdentity, ResolutionResult};

use crate::traits::{CompanyStore, RateLimitLog};

/// Prefix of the note written when a careers page is found.
pub const CAREER_NOTE_PREFIX: &str = "Page carrières : ";

/// Apply embedded migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Notes with a careers-page line prepended. Unchanged when that exact line is already there.
pub fn notes_with_career_page(existing: Option<&str>, career_page_url: &str) -> String {
    let line = format!("{CAREER_NOTE_PREFIX}{career_page_url}");
    match existing.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) if notes.lines().any(|l| l.trim() == line) => notes.to_string(),
        Some(notes) => format!("{line}\n{notes}"),
        None => line,
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    city: Option<String>,
    registry_id: String,
    activity_code: Option<String>,
    activity_label: Option<String>,
    notes: Option<String>,
}

impl From<CompanyRow> for CompanyIdentity {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            city: row.city,
            registry_id: row.registry_id,
            activity_code: row.activity_code,
            activity_label: row.activity_label,
            notes: row.notes,
        }
    }
}

pub struct PgCompanyStore {
    pool: PgPool,
}

impl PgCompanyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyStore for PgCompanyStore {
    async fn pending_companies(&self, caller: &str, limit: usize) -> Result<Vec<CompanyIdentity>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, city, registry_id, activity_code, activity_label, notes
             FROM companies
             WHERE owner_id = $1
               AND selected_email IS NULL
               AND contact_searched_at IS NULL
             ORDER BY created_at, id
             LIMIT $2",
        )
        .bind(caller)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CompanyIdentity::from).collect())
    }

    async fn count_unresolved(&self, caller: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM companies
             WHERE owner_id = $1
               AND selected_email IS NULL
               AND contact_searched_at IS NULL",
        )
        .bind(caller)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn save_resolution(
        &self,
        company: &CompanyIdentity,
        result: &ResolutionResult,
    ) -> Result<()> {
        let notes = match &result.career_page_url {
            Some(url) => Some(notes_with_career_page(company.notes.as_deref(), url)),
            None => company.notes.clone(),
        };
        let emails = serde_json::to_value(&result.emails)?;

        sqlx::query(
            "UPDATE companies
             SET website = COALESCE($2, website),
                 emails = $3,
                 selected_email = $4,
                 contact_confidence = $5,
                 contact_source = $6,
                 notes = $7,
                 contact_searched_at = now()
             WHERE id = $1",
        )
        .bind(result.company_id)
        .bind(result.website.as_deref())
        .bind(emails)
        .bind(result.selected_email.as_deref())
        .bind(result.confidence.to_string())
        .bind(result.source.as_str())
        .bind(notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct PgRateLimitLog {
    pool: PgPool,
}

impl PgRateLimitLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitLog for PgRateLimitLog {
    async fn count_since(&self, caller: &str, action: &str, since: DateTime<Utc>) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(count), 0)::BIGINT FROM rate_limit_log
             WHERE caller_id = $1 AND action = $2 AND created_at > $3",
        )
        .bind(caller)
        .bind(action)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn record(&self, caller: &str, action: &str) -> Result<()> {
        sqlx::query("INSERT INTO rate_limit_log (caller_id, action, count) VALUES ($1, $2, 1)")
            .bind(caller)
            .bind(action)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
