//! Deduplicating persistence of harvested postings.
//!
//! The canonical URL is the natural key. Re-discovering a URL returns the
//! stored row untouched; only `fill_details` may write a description onto an
//! existing row.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::harvest::source::{CandidateJob, DetailUpdate};
use crate::models::job::JobPosting;

/// Carried in `AppState` as `Arc<dyn JobStore>`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts the candidate, or returns the existing row for its URL.
    async fn upsert(&self, candidate: &CandidateJob) -> Result<JobPosting>;

    async fn get(&self, id: Uuid) -> Result<Option<JobPosting>>;

    /// Writes a fetched description. Salary is only set when absent.
    async fn fill_details(&self, id: Uuid, update: &DetailUpdate) -> Result<JobPosting>;
}

/// Upserts every candidate of a batch, preserving order.
pub async fn persist_batch(
    store: &dyn JobStore,
    candidates: &[CandidateJob],
) -> Result<Vec<JobPosting>> {
    let mut stored = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        stored.push(store.upsert(candidate).await?);
    }
    Ok(stored)
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<JobPosting>> {
        Ok(
            sqlx::query_as::<_, JobPosting>("SELECT * FROM jobs WHERE url = $1")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn upsert(&self, candidate: &CandidateJob) -> Result<JobPosting> {
        // ON CONFLICT DO NOTHING returns no row when the URL already exists.
        let inserted = sqlx::query_as::<_, JobPosting>(
            r#"
            INSERT INTO jobs
                (id, title, company, location, job_type, salary_range,
                 description, url, platform, posted_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (url) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&candidate.title)
        .bind(&candidate.company)
        .bind(&candidate.location)
        .bind(candidate.employment_mode.as_column())
        .bind(&candidate.salary_range)
        .bind(&candidate.description)
        .bind(&candidate.url)
        .bind(candidate.platform.as_str())
        .bind(&candidate.posted_date)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            debug!("Stored new job {} ({})", row.id, row.url);
            return Ok(row);
        }

        self.find_by_url(&candidate.url)
            .await?
            .with_context(|| format!("job {} vanished after conflict", candidate.url))
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobPosting>> {
        Ok(
            sqlx::query_as::<_, JobPosting>("SELECT * FROM jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn fill_details(&self, id: Uuid, update: &DetailUpdate) -> Result<JobPosting> {
        sqlx::query_as::<_, JobPosting>(
            r#"
            UPDATE jobs
            SET description  = COALESCE($2, description),
                salary_range = COALESCE(salary_range, $3)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.description)
        .bind(&update.salary_range)
        .fetch_optional(&self.pool)
        .await?
        .with_context(|| format!("job {id} not found"))
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    /// In-memory store with the same key semantics as `PgJobStore`.
    #[derive(Default)]
    pub struct MemoryJobStore {
        rows: Mutex<HashMap<String, JobPosting>>,
        pub fail: bool,
    }

    impl MemoryJobStore {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl JobStore for MemoryJobStore {
        async fn upsert(&self, candidate: &CandidateJob) -> Result<JobPosting> {
            if self.fail {
                anyhow::bail!("store unavailable");
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .entry(candidate.url.clone())
                .or_insert_with(|| JobPosting {
                    id: Uuid::new_v4(),
                    title: candidate.title.clone(),
                    company: candidate.company.clone(),
                    location: candidate.location.clone(),
                    job_type: candidate.employment_mode.as_column().map(str::to_string),
                    salary_range: candidate.salary_range.clone(),
                    description: candidate.description.clone(),
                    url: candidate.url.clone(),
                    platform: candidate.platform.as_str().to_string(),
                    posted_date: candidate.posted_date.clone(),
                    created_at: Utc::now(),
                });
            Ok(row.clone())
        }

        async fn get(&self, id: Uuid) -> Result<Option<JobPosting>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.values().find(|row| row.id == id).cloned())
        }

        async fn fill_details(&self, id: Uuid, update: &DetailUpdate) -> Result<JobPosting> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .values_mut()
                .find(|row| row.id == id)
                .with_context(|| format!("job {id} not found"))?;
            if update.description.is_some() {
                row.description = update.description.clone();
            }
            if row.salary_range.is_none() {
                row.salary_range = update.salary_range.clone();
            }
            Ok(row.clone())
        }
    }
}
