//! Glassdoor job search.
//!
//! Glassdoor has no URL filter for work arrangement; the requested filter is
//! only stamped onto the harvested candidates.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::Html;
use tracing::info;
use url::Url;

use crate::harvest::session::{Browser, Politeness};
use crate::harvest::source::{
    CardFields, DetailUpdate, SearchQuery, SelectorChain, SourceAdapter, SourceError,
    SourceListing, MAX_RESULTS_PER_SOURCE,
};
use crate::models::job::{EmploymentMode, Platform};

const SEARCH_URL: &str = "https://www.glassdoor.com/Job/jobs.htm";
const SITE_ROOT: &str = "https://www.glassdoor.com";

static CARDS: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&["[data-test='jobListing']", "[class*='JobCard_jobCard__']"])
});
static TITLE: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&["[data-test='job-title']", "[class*='JobCard_jobTitle__']"])
});
static COMPANY: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        "[data-test='employer-short-name']",
        "[class*='EmployerProfile_companyName__']",
    ])
});
static LOCATION: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&["[data-test='emp-location']", "[class*='JobCard_location__']"])
});
static SALARY: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&["[data-test='detailSalary']"]));
static LINK: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&["a[data-test='job-link']", "a[href]"])
});
static DESCRIPTION: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        "[data-test='jobDescriptionContent']",
        "[class*='JobDetails_jobDescription__']",
    ])
});

pub struct GlassdoorAdapter {
    browser: Arc<dyn Browser>,
    politeness: Politeness,
}

impl GlassdoorAdapter {
    pub fn new(browser: Arc<dyn Browser>, politeness: Politeness) -> Self {
        Self {
            browser,
            politeness,
        }
    }
}

#[async_trait]
impl SourceAdapter for GlassdoorAdapter {
    fn platform(&self) -> Platform {
        Platform::Glassdoor
    }

    async fn search(&self, query: &SearchQuery) -> Result<SourceListing, SourceError> {
        let url = build_search_url(query);
        let mut session = self.browser.new_session().await?;
        let html = session.open(&url).await?;
        self.politeness.pause().await;

        let listing = parse_search_results(&html, query.job_type.implied_mode());
        info!(
            "Glassdoor: {} candidates ({} incomplete cards skipped)",
            listing.jobs.len(),
            listing.skipped
        );
        Ok(listing)
    }

    async fn fetch_details(&self, url: &str) -> Result<DetailUpdate, SourceError> {
        let mut session = self.browser.new_session().await?;
        let html = session.open(url).await?;
        self.politeness.pause().await;
        Ok(parse_details(&html))
    }
}

pub fn build_search_url(query: &SearchQuery) -> String {
    let mut params = vec![("sc.keyword", query.query.clone())];
    if let Some(location) = query.location.as_deref().filter(|l| !l.trim().is_empty()) {
        params.push(("locT", "C".to_string()));
        params.push(("locKeyword", location.to_string()));
    }

    match Url::parse_with_params(SEARCH_URL, &params) {
        Ok(url) => url.to_string(),
        Err(_) => SEARCH_URL.to_string(),
    }
}

fn parse_search_results(html: &str, mode: EmploymentMode) -> SourceListing {
    let document = Html::parse_document(html);
    let Ok(base) = Url::parse(SITE_ROOT) else {
        return SourceListing::default();
    };

    let mut listing = SourceListing::default();
    for card in CARDS
        .select_all(&document)
        .into_iter()
        .take(MAX_RESULTS_PER_SOURCE)
    {
        let fields = CardFields {
            title: TITLE.text_in(card),
            company: COMPANY.text_in(card),
            location: LOCATION.text_in(card),
            link: LINK.attr_in(card, "href"),
            posted_date: None,
            salary_range: SALARY.text_in(card),
        };
        match fields.into_candidate(Platform::Glassdoor, mode, &base) {
            Some(job) => listing.jobs.push(job),
            None => listing.skipped += 1,
        }
    }
    listing
}

fn parse_details(html: &str) -> DetailUpdate {
    let document = Html::parse_document(html);
    DetailUpdate {
        description: DESCRIPTION.text_in_document(&document),
        salary_range: None,
    }
}
