//! Search orchestration: harvest, dedup-persist, respond.

use std::pin::pin;
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::harvest::harvester::{BatchStatus, Harvester};
use crate::harvest::source::SearchQuery;
use crate::jobs::store::{persist_batch, JobStore};
use crate::models::job::{EmploymentFilter, JobPosting, Platform};

fn default_platforms() -> Vec<Platform> {
    Platform::ALL.to_vec()
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: EmploymentFilter,
    /// Accepted but not enforced; no source filters on salary.
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,
}

impl SearchRequest {
    /// Checks the request and splits it into the adapter query and the
    /// distinct platforms to run, in request order.
    pub fn validate(self) -> Result<(SearchQuery, Vec<Platform>), AppError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("query must not be empty".to_string()));
        }

        let mut platforms = Vec::with_capacity(self.platforms.len());
        for platform in self.platforms {
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        if platforms.is_empty() {
            return Err(AppError::Validation(
                "at least one platform is required".to_string(),
            ));
        }

        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Ok((
            SearchQuery {
                query: query.to_string(),
                location,
                job_type: self.job_type,
            },
            platforms,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub jobs: Vec<JobPosting>,
    pub total: usize,
}

/// One server-push event of a streaming search.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    Start {
        platforms: Vec<Platform>,
    },
    Jobs {
        platform: Platform,
        status: BatchStatus,
        jobs: Vec<JobPosting>,
        count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Done,
    Error {
        message: String,
    },
}

/// Harvests every platform, then persists everything that came back.
pub async fn run_search(
    store: &dyn JobStore,
    harvester: &Harvester,
    query: &SearchQuery,
    platforms: &[Platform],
) -> Result<SearchResponse> {
    let candidates = harvester.collect(query, platforms).await;
    let jobs = persist_batch(store, &candidates).await?;
    info!("Search '{}' returned {} jobs", query.query, jobs.len());

    Ok(SearchResponse {
        total: jobs.len(),
        jobs,
    })
}

/// Drives a streaming search, sending events until done or the receiver is
/// dropped. Each batch is persisted before its event goes out.
pub async fn stream_search(
    store: Arc<dyn JobStore>,
    harvester: Harvester,
    query: SearchQuery,
    platforms: Vec<Platform>,
    events: mpsc::Sender<SearchEvent>,
) {
    let start = SearchEvent::Start {
        platforms: platforms.clone(),
    };
    if events.send(start).await.is_err() {
        return;
    }

    let mut batches = pin!(harvester.stream(query, &platforms));
    while let Some(batch) = batches.next().await {
        let event = match persist_batch(store.as_ref(), &batch.jobs).await {
            Ok(jobs) => SearchEvent::Jobs {
                platform: batch.platform,
                status: batch.status,
                count: jobs.len(),
                jobs,
                error: batch.error,
            },
            Err(err) => {
                error!("Persisting {} batch failed: {err:#}", batch.platform);
                let _ = events
                    .send(SearchEvent::Error {
                        message: err.to_string(),
                    })
                    .await;
                return;
            }
        };

        if events.send(event).await.is_err() {
            debug!("Stream receiver dropped; abandoning remaining batches");
            return;
        }
    }

    let _ = events.send(SearchEvent::Done).await;
}
