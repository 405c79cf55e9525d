//! Automation sessions used by adapters to load pages.
//!
//! Every adapter call opens its own session and drops it when done. Sessions
//! are never shared between concurrent calls. A `SessionPool` caps how many
//! sessions may be open at once; the permit travels inside the session, so it
//! is returned on every exit path, including errors and timeouts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::harvest::source::SourceError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Navigation bound for a single page load.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// One isolated browsing session.
#[async_trait]
pub trait PageSession: Send {
    /// Navigates to `url` and returns the page markup.
    async fn open(&mut self, url: &str) -> Result<String, SourceError>;
}

/// Factory for sessions. Held by adapters as `Arc<dyn Browser>`.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, SourceError>;
}

/// Bounds the number of concurrently open sessions.
#[derive(Clone)]
pub struct SessionPool {
    permits: Arc<Semaphore>,
}

impl SessionPool {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, SourceError> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SourceError::Session(e.to_string()))
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Loads pages over plain HTTP with desktop-browser headers.
/// Each session gets a fresh client, so cookies and connections are never
/// shared across calls.
pub struct HttpBrowser {
    pool: SessionPool,
    navigation_timeout: Duration,
}

impl HttpBrowser {
    pub fn new(pool: SessionPool, navigation_timeout: Duration) -> Self {
        Self {
            pool,
            navigation_timeout,
        }
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, SourceError> {
        let permit = self.pool.acquire().await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.navigation_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SourceError::Session(e.to_string()))?;

        debug!("Opened session ({} slots free)", self.pool.available());
        Ok(Box::new(HttpSession {
            client,
            _permit: permit,
        }))
    }
}

struct HttpSession {
    client: reqwest::Client,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl PageSession for HttpSession {
    async fn open(&mut self, url: &str) -> Result<String, SourceError> {
        debug!("Navigating to {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Navigation {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| SourceError::Navigation {
                url: url.to_string(),
                source,
            })
    }
}

/// Random pause between navigation actions.
#[derive(Debug, Clone, Copy)]
pub struct Politeness {
    min: Duration,
    max: Duration,
}

impl Politeness {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        if self.max.is_zero() || self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for Politeness {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}
