pub mod glassdoor;
pub mod harvester;
pub mod linkedin;
pub mod session;
pub mod source;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::harvest::glassdoor::GlassdoorAdapter;
use crate::harvest::harvester::Harvester;
use crate::harvest::linkedin::LinkedInAdapter;
use crate::harvest::session::{Browser, HttpBrowser, Politeness, SessionPool, NAVIGATION_TIMEOUT};
use crate::harvest::source::SourceAdapter;

/// Harvester over every supported site, sharing one bounded session pool.
pub fn build_harvester(config: &Config) -> Harvester {
    let pool = SessionPool::new(config.max_browser_sessions);
    let browser: Arc<dyn Browser> = Arc::new(HttpBrowser::new(pool, NAVIGATION_TIMEOUT));
    let politeness = Politeness::default();

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(LinkedInAdapter::new(browser.clone(), politeness)),
        Arc::new(GlassdoorAdapter::new(browser, politeness)),
    ];

    Harvester::new(
        adapters,
        Duration::from_secs(config.source_timeout_secs),
    )
}
