//! Lazy description backfill.

use anyhow::Result;
use tracing::{info, warn};

use crate::harvest::harvester::Harvester;
use crate::jobs::store::JobStore;
use crate::models::job::{JobPosting, Platform};

/// Returns `job` with a description, fetching and persisting one from its
/// source if it has none yet. A failed fetch is logged and the job is
/// returned as it was.
pub async fn ensure_description(
    store: &dyn JobStore,
    harvester: &Harvester,
    job: JobPosting,
) -> Result<JobPosting> {
    if job.description.is_some() {
        return Ok(job);
    }

    let Some(platform) = Platform::parse(&job.platform) else {
        warn!("Job {} has unknown platform '{}'", job.id, job.platform);
        return Ok(job);
    };

    match harvester.fetch_details(platform, &job.url).await {
        Ok(update) if update.description.is_some() => {
            info!("Backfilled description for job {}", job.id);
            store.fill_details(job.id, &update).await
        }
        Ok(_) => {
            warn!("No description found at {}", job.url);
            Ok(job)
        }
        Err(err) => {
            warn!("Detail fetch for job {} failed: {err}", job.id);
            Ok(job)
        }
    }
}
