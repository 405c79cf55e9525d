use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const CREATE_JOBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id           UUID PRIMARY KEY,
    title        TEXT NOT NULL,
    company      TEXT NOT NULL,
    location     TEXT,
    job_type     TEXT,
    salary_range TEXT,
    description  TEXT,
    url          TEXT NOT NULL UNIQUE,
    platform     TEXT NOT NULL,
    posted_date  TEXT,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_PLATFORM_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_jobs_platform ON jobs (platform)";

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the schema if it does not exist yet. Safe to run on every start.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    for statement in [CREATE_JOBS_TABLE, CREATE_PLATFORM_INDEX] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to apply schema")?;
    }
    info!("Schema ready");
    Ok(())
}
