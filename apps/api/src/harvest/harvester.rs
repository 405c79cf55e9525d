//! Fan-out / fan-in over the requested sources.
//!
//! Every source runs concurrently under its own timeout. A failing or slow
//! source only ever costs its own batch; it is never surfaced as a failure of
//! the harvest and never cancels its siblings.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, Stream};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::harvest::source::{
    CandidateJob, DetailUpdate, SearchQuery, SourceAdapter, SourceError, SourceListing,
};
use crate::models::job::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    /// The source answered but some of its cards were incomplete.
    Partial,
    Failed,
}

/// Result envelope of one source for one harvest.
#[derive(Debug, Clone)]
pub struct HarvestBatch {
    pub platform: Platform,
    pub jobs: Vec<CandidateJob>,
    pub status: BatchStatus,
    pub error: Option<String>,
}

impl HarvestBatch {
    fn from_listing(platform: Platform, listing: SourceListing) -> Self {
        let status = if listing.skipped > 0 {
            BatchStatus::Partial
        } else {
            BatchStatus::Success
        };
        Self {
            platform,
            jobs: listing.jobs,
            status,
            error: None,
        }
    }

    fn failed(platform: Platform, error: &SourceError) -> Self {
        Self {
            platform,
            jobs: Vec::new(),
            status: BatchStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct Harvester {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    source_timeout: Duration,
}

impl Harvester {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, source_timeout: Duration) -> Self {
        Self {
            adapters,
            source_timeout,
        }
    }

    pub fn adapter(&self, platform: Platform) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.platform() == platform)
            .cloned()
    }

    /// Waits for every source and concatenates what they found.
    pub async fn collect(&self, query: &SearchQuery, platforms: &[Platform]) -> Vec<CandidateJob> {
        let batches = join_all(
            platforms
                .iter()
                .map(|&platform| self.run_source(platform, query)),
        )
        .await;

        batches.into_iter().flat_map(|batch| batch.jobs).collect()
    }

    /// Yields one batch per platform, in completion order.
    pub fn stream(
        &self,
        query: SearchQuery,
        platforms: &[Platform],
    ) -> impl Stream<Item = HarvestBatch> + Send + 'static {
        platforms
            .iter()
            .map(|&platform| {
                let harvester = self.clone();
                let query = query.clone();
                async move { harvester.run_source(platform, &query).await }
            })
            .collect::<FuturesUnordered<_>>()
    }

    /// Detail fetch for one posting, under the same per-source bound.
    pub async fn fetch_details(
        &self,
        platform: Platform,
        url: &str,
    ) -> Result<DetailUpdate, SourceError> {
        let adapter = self
            .adapter(platform)
            .ok_or(SourceError::Unsupported(platform))?;

        timeout(self.source_timeout, adapter.fetch_details(url))
            .await
            .map_err(|_| SourceError::Timeout(self.source_timeout))?
    }

    async fn run_source(&self, platform: Platform, query: &SearchQuery) -> HarvestBatch {
        let Some(adapter) = self.adapter(platform) else {
            let err = SourceError::Unsupported(platform);
            warn!("{platform}: {err}");
            return HarvestBatch::failed(platform, &err);
        };

        match timeout(self.source_timeout, adapter.search(query)).await {
            Ok(Ok(listing)) => {
                info!("{platform}: harvested {} jobs", listing.jobs.len());
                HarvestBatch::from_listing(platform, listing)
            }
            Ok(Err(err)) => {
                warn!("{platform}: search failed: {err}");
                HarvestBatch::failed(platform, &err)
            }
            Err(_) => {
                let err = SourceError::Timeout(self.source_timeout);
                warn!("{platform}: {err}");
                HarvestBatch::failed(platform, &err)
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use async_trait::async_trait;

    use super::*;
    use crate::models::job::EmploymentMode;

    pub enum Outcome {
        Jobs(usize),
        Fail,
    }

    /// Adapter that answers after `delay` with generated candidates or an error.
    pub struct FakeAdapter {
        pub platform: Platform,
        pub delay: Duration,
        pub outcome: Outcome,
        pub skipped: usize,
        pub description: Option<String>,
    }

    impl FakeAdapter {
        pub fn returning(platform: Platform, count: usize, delay: Duration) -> Self {
            Self {
                platform,
                delay,
                outcome: Outcome::Jobs(count),
                skipped: 0,
                description: None,
            }
        }

        pub fn failing(platform: Platform) -> Self {
            Self {
                platform,
                delay: Duration::ZERO,
                outcome: Outcome::Fail,
                skipped: 0,
                description: None,
            }
        }
    }

    pub fn candidate(platform: Platform, n: usize) -> CandidateJob {
        CandidateJob {
            title: format!("Engineer {n}"),
            company: "Acme".to_string(),
            location: None,
            employment_mode: EmploymentMode::Unspecified,
            salary_range: None,
            description: None,
            url: format!("https://{platform}.example/jobs/{n}"),
            platform,
            posted_date: None,
        }
    }

    #[async_trait]
    impl SourceAdapter for FakeAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn search(&self, _query: &SearchQuery) -> Result<SourceListing, SourceError> {
            tokio::time::sleep(self.delay).await;
            match self.outcome {
                Outcome::Jobs(count) => Ok(SourceListing {
                    jobs: (0..count).map(|n| candidate(self.platform, n)).collect(),
                    skipped: self.skipped,
                }),
                Outcome::Fail => Err(SourceError::Status {
                    url: format!("https://{}.example", self.platform),
                    status: 503,
                }),
            }
        }

        async fn fetch_details(&self, _url: &str) -> Result<DetailUpdate, SourceError> {
            tokio::time::sleep(self.delay).await;
            match self.outcome {
                Outcome::Jobs(_) => Ok(DetailUpdate {
                    description: self.description.clone(),
                    salary_range: None,
                }),
                Outcome::Fail => Err(SourceError::Session("closed".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::testing::FakeAdapter;
    use super::*;
    use crate::models::job::EmploymentFilter;

    fn query() -> SearchQuery {
        SearchQuery {
            query: "backend engineer".to_string(),
            location: None,
            job_type: EmploymentFilter::All,
        }
    }

    fn harvester(adapters: Vec<FakeAdapter>) -> Harvester {
        Harvester::new(
            adapters
                .into_iter()
                .map(|a| Arc::new(a) as Arc<dyn SourceAdapter>)
                .collect(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_size_is_sum_of_sources() {
        let h = harvester(vec![
            FakeAdapter::returning(Platform::Linkedin, 7, Duration::from_millis(30)),
            FakeAdapter::returning(Platform::Glassdoor, 20, Duration::from_millis(10)),
        ]);
        let jobs = h.collect(&query(), &Platform::ALL).await;
        assert_eq!(jobs.len(), 27);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_absorbs_timeout_of_one_source() {
        let h = harvester(vec![
            FakeAdapter::returning(Platform::Linkedin, 3, Duration::from_millis(10)),
            FakeAdapter::returning(Platform::Glassdoor, 5, Duration::from_secs(600)),
        ]);
        let jobs = h.collect(&query(), &Platform::ALL).await;
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|j| j.platform == Platform::Linkedin));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_absorbs_source_error() {
        let h = harvester(vec![
            FakeAdapter::failing(Platform::Linkedin),
            FakeAdapter::returning(Platform::Glassdoor, 2, Duration::ZERO),
        ]);
        assert_eq!(h.collect(&query(), &Platform::ALL).await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_yields_in_completion_order() {
        let h = harvester(vec![
            FakeAdapter::returning(Platform::Linkedin, 1, Duration::from_millis(500)),
            FakeAdapter::returning(Platform::Glassdoor, 1, Duration::from_millis(50)),
        ]);
        let order: Vec<Platform> = h
            .stream(query(), &[Platform::Linkedin, Platform::Glassdoor])
            .map(|batch| batch.platform)
            .collect()
            .await;
        assert_eq!(order, vec![Platform::Glassdoor, Platform::Linkedin]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_emits_one_batch_per_platform_even_on_failure() {
        let h = harvester(vec![
            FakeAdapter::failing(Platform::Linkedin),
            FakeAdapter::returning(Platform::Glassdoor, 4, Duration::from_millis(5)),
        ]);
        let batches: Vec<HarvestBatch> = h.stream(query(), &Platform::ALL).collect().await;
        assert_eq!(batches.len(), 2);

        let failed = batches
            .iter()
            .find(|b| b.platform == Platform::Linkedin)
            .unwrap();
        assert_eq!(failed.status, BatchStatus::Failed);
        assert!(failed.jobs.is_empty());
        assert!(failed.error.as_deref().unwrap().contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_source_is_failed_batch() {
        let h = harvester(vec![FakeAdapter::returning(
            Platform::Glassdoor,
            3,
            Duration::from_secs(60),
        )]);
        let batches: Vec<HarvestBatch> = h.stream(query(), &[Platform::Glassdoor]).collect().await;
        assert_eq!(batches[0].status, BatchStatus::Failed);
        assert!(batches[0].error.as_deref().unwrap().contains("no response"));
    }

    #[tokio::test]
    async fn test_skipped_cards_mark_batch_partial() {
        let mut adapter = FakeAdapter::returning(Platform::Linkedin, 2, Duration::ZERO);
        adapter.skipped = 1;
        let h = harvester(vec![adapter]);
        let batches: Vec<HarvestBatch> = h.stream(query(), &[Platform::Linkedin]).collect().await;
        assert_eq!(batches[0].status, BatchStatus::Partial);
        assert_eq!(batches[0].jobs.len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_platform_is_failed_batch() {
        let h = harvester(vec![FakeAdapter::returning(Platform::Linkedin, 1, Duration::ZERO)]);
        let batches: Vec<HarvestBatch> = h.stream(query(), &Platform::ALL).collect().await;
        let glassdoor = batches
            .iter()
            .find(|b| b.platform == Platform::Glassdoor)
            .unwrap();
        assert_eq!(glassdoor.status, BatchStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_details_is_time_bounded() {
        let h = harvester(vec![FakeAdapter::returning(
            Platform::Linkedin,
            0,
            Duration::from_secs(60),
        )]);
        let err = h
            .fetch_details(Platform::Linkedin, "https://linkedin.example/jobs/1")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Timeout(_)));
    }
}
