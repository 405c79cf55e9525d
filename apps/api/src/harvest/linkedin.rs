//! LinkedIn public job search.

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
use crate::models::job::{EmploymentFilter, EmploymentMode, Platform};

const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search";
const SITE_ROOT: &str = "https://www.linkedin.com";

static CARDS: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&[".base-card", ".job-search-card"]));
static TITLE: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&[".base-search-card__title"]));
static COMPANY: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&[".base-search-card__subtitle"]));
static LOCATION: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&[".job-search-card__location"]));
static LINK: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&["a.base-card__full-link", "a"]));
static POSTED: LazyLock<SelectorChain> = LazyLock::new(|| SelectorChain::new(&["time"]));
static DESCRIPTION: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[".description__text", ".show-more-less-html__markup"])
});
static SALARY: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&[".salary", ".compensation__salary"]));

pub struct LinkedInAdapter {
    browser: Arc<dyn Browser>,
    politeness: Politeness,
}

impl LinkedInAdapter {
    pub fn new(browser: Arc<dyn Browser>, politeness: Politeness) -> Self {
        Self {
            browser,
            politeness,
        }
    }
}

#[async_trait]
impl SourceAdapter for LinkedInAdapter {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    async fn search(&self, query: &SearchQuery) -> Result<SourceListing, SourceError> {
        let url = build_search_url(query);
        let mut session = self.browser.new_session().await?;
        let html = session.open(&url).await?;
        self.politeness.pause().await;

        let listing = parse_search_results(&html, query.job_type.implied_mode());
        info!(
            "LinkedIn: {} candidates ({} incomplete cards skipped)",
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

fn work_type_code(filter: EmploymentFilter) -> Option<&'static str> {
    match filter {
        EmploymentFilter::All => None,
        EmploymentFilter::Onsite => Some("1"),
        EmploymentFilter::Remote => Some("2"),
        EmploymentFilter::Hybrid => Some("3"),
    }
}

pub fn build_search_url(query: &SearchQuery) -> String {
    let mut params = vec![
        ("keywords", query.query.clone()),
        ("trk", "public_jobs_jobs-search-bar_search-submit".to_string()),
        ("position", "1".to_string()),
        ("pageNum", "0".to_string()),
    ];
    if let Some(location) = query.location.as_deref().filter(|l| !l.trim().is_empty()) {
        params.push(("location", location.to_string()));
    }
    if let Some(code) = work_type_code(query.job_type) {
        params.push(("f_WT", code.to_string()));
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
            posted_date: POSTED.attr_in(card, "datetime"),
            salary_range: None,
        };
        match fields.into_candidate(Platform::Linkedin, mode, &base) {
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
        salary_range: SALARY.text_in_document(&document),
    }
}
