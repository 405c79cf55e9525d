//! The SourceAdapter contract: what every job-site integration must provide.
//!
//! Adapters only ever *propose* candidates. They own no long-lived state, open
//! their own automation session per call and must be safe to retry.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::models::job::{EmploymentFilter, EmploymentMode, Platform};

/// Maximum candidates a single adapter search returns.
pub const MAX_RESULTS_PER_SOURCE: usize = 20;

/// Query parameters handed to every adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub location: Option<String>,
    pub job_type: EmploymentFilter,
}

/// A harvested, not-yet-deduplicated posting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateJob {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub employment_mode: EmploymentMode,
    pub salary_range: Option<String>,
    pub description: Option<String>,
    /// Canonical URL (query string stripped). Natural key of the store.
    pub url: String,
    pub platform: Platform,
    pub posted_date: Option<String>,
}

/// What one adapter search produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceListing {
    pub jobs: Vec<CandidateJob>,
    /// Cards found on the page but discarded for lacking a title or link.
    pub skipped: usize,
}

/// Partial update produced by a detail fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailUpdate {
    pub description: Option<String>,
    pub salary_range: Option<String>,
}

/// Transient failure of a single source. Never fatal to a harvest.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("browser session unavailable: {0}")]
    Session(String),

    #[error("no adapter registered for {0}")]
    Unsupported(Platform),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Zero results is `Ok` with an empty listing, never an error.
    async fn search(&self, query: &SearchQuery) -> Result<SourceListing, SourceError>;

    async fn fetch_details(&self, url: &str) -> Result<DetailUpdate, SourceError>;
}

/// Strips the query-string (and fragment) suffix from a posting link.
pub fn canonicalize_url(link: &str) -> String {
    let link = link.trim();
    let end = link.find(['?', '#']).unwrap_or(link.len());
    link[..end].to_string()
}

/// Ordered list of CSS selectors tried one after another.
///
/// Sites reshuffle their markup often; each field gets a chain so a stale
/// selector degrades to the next candidate instead of losing the field.
pub struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    pub fn new(patterns: &[&str]) -> Self {
        let selectors = patterns
            .iter()
            .filter_map(|pattern| Selector::parse(pattern).ok())
            .collect();
        Self { selectors }
    }

    /// Elements matched by the first selector that matches anything.
    pub fn select_all<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        self.selectors
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    /// First non-empty text under `scope`.
    pub fn text_in(&self, scope: ElementRef<'_>) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            scope
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
    }

    /// First non-empty text anywhere in the document.
    pub fn text_in_document(&self, document: &Html) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            document
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
    }

    /// First non-empty attribute value under `scope`.
    pub fn attr_in(&self, scope: ElementRef<'_>, attr: &str) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            scope
                .select(selector)
                .filter_map(|el| el.value().attr(attr))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        })
    }
}

/// Whitespace-normalized inner text.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Raw fields lifted off one result card.
#[derive(Debug, Default)]
pub struct CardFields {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    pub posted_date: Option<String>,
    pub salary_range: Option<String>,
}

impl CardFields {
    /// Builds a candidate, or `None` when the card has no title or no link.
    /// Relative links are resolved against `base`.
    pub fn into_candidate(
        self,
        platform: Platform,
        employment_mode: EmploymentMode,
        base: &Url,
    ) -> Option<CandidateJob> {
        let title = self.title.filter(|t| !t.is_empty())?;
        let link = self.link.filter(|l| !l.is_empty())?;
        let absolute = if link.starts_with("http") {
            link
        } else {
            base.join(&link).ok()?.to_string()
        };

        Some(CandidateJob {
            title,
            company: self.company.unwrap_or_default(),
            location: self.location,
            employment_mode,
            salary_range: self.salary_range,
            description: None,
            url: canonicalize_url(&absolute),
            platform,
            posted_date: self.posted_date,
        })
    }
}
