//! Résumé-to-posting scoring with provider routing.
//!
//! Routing is decided when a `MatchService` is built: a reachable local
//! server wins, otherwise the remote fallback list is used. Whatever goes
//! wrong downstream, `analyze_match` answers with a bounded `MatchResult`.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{probe, Attribution, LlmClient, LlmError};
use crate::matching::normalizer::{normalize, MatchResult};
use crate::matching::prompts::match_prompt;

pub const RESUME_CHAR_BUDGET: usize = 3500;
pub const DESCRIPTION_CHAR_BUDGET: usize = 2500;
const TRUNCATION_MARKER: &str = "\n... [truncated for length]";
const ERROR_PREVIEW_CHARS: usize = 150;
const APP_TITLE: &str = "Job Scout";

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub local_url: String,
    pub local_model: String,
    pub remote_base_url: String,
    pub remote_api_key: String,
    pub remote_models: Vec<String>,
    /// Sent as `HTTP-Referer` to the remote provider.
    pub referer: String,
    pub probe_timeout: Duration,
    pub local_timeout: Duration,
    pub remote_timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl MatchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            local_url: config.local_llm_url.trim_end_matches('/').to_string(),
            local_model: config.local_llm_model.clone(),
            remote_base_url: config.openrouter_base_url.clone(),
            remote_api_key: config.openrouter_api_key.clone(),
            remote_models: config.openrouter_models.clone(),
            referer: config.cors_origin.clone(),
            probe_timeout: Duration::from_secs(2),
            local_timeout: Duration::from_secs(120),
            remote_timeout: Duration::from_secs(60),
            max_attempts: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

/// One model to try, with the client that reaches it.
pub struct ModelCandidate {
    pub model: String,
    pub client: LlmClient,
}

/// Why no usable result came back. Each maps to a placeholder result.
#[derive(Debug, PartialEq)]
enum MatchFailure {
    Unparseable,
    Unauthorized,
    Exhausted,
    Provider(String),
    NoProvider,
}

impl MatchFailure {
    fn into_result(self) -> MatchResult {
        match self {
            MatchFailure::Unparseable => {
                MatchResult::placeholder(&["Unable to parse AI response. Please try again."])
            }
            MatchFailure::Unauthorized => MatchResult::placeholder(&[
                "API authentication failed. Check your OPENROUTER_API_KEY.",
            ]),
            MatchFailure::Exhausted => MatchResult::placeholder(&[
                "All AI models are currently rate-limited or unavailable.",
                "Please try again in a few minutes, or add credits at openrouter.ai/settings/credits",
            ]),
            MatchFailure::Provider(message) => {
                let preview: String = message.chars().take(ERROR_PREVIEW_CHARS).collect();
                let message = format!("API error: {preview}");
                MatchResult::placeholder(&[message.as_str()])
            }
            MatchFailure::NoProvider => MatchResult::placeholder(&[
                "No AI provider is available. Start a local model server or set OPENROUTER_API_KEY.",
            ]),
        }
    }
}

pub struct MatchService {
    candidates: Vec<ModelCandidate>,
}

impl MatchService {
    /// Probes the local server and builds the candidate list accordingly.
    pub async fn connect(config: &MatchConfig) -> Result<Self, LlmError> {
        let probe_url = format!("{}/api/tags", config.local_url);
        if probe(&probe_url, config.probe_timeout).await {
            info!("Using local model {} at {}", config.local_model, config.local_url);
            let client = LlmClient::new(
                &format!("{}/v1", config.local_url),
                None,
                config.local_timeout,
            )?
            .with_retries(config.max_attempts, config.backoff);
            return Ok(Self::from_candidates(vec![ModelCandidate {
                model: config.local_model.clone(),
                client,
            }]));
        }

        if config.remote_api_key.is_empty() {
            warn!("No local model server and no remote API key configured");
            return Ok(Self::from_candidates(Vec::new()));
        }

        info!(
            "Local model server unavailable, using remote fallback list ({} models)",
            config.remote_models.len()
        );
        let client = LlmClient::new(
            &config.remote_base_url,
            Some(config.remote_api_key.clone()),
            config.remote_timeout,
        )?
        .with_retries(config.max_attempts, config.backoff)
        .with_attribution(Attribution {
            referer: config.referer.clone(),
            title: APP_TITLE.to_string(),
        });

        Ok(Self::from_candidates(
            config
                .remote_models
                .iter()
                .map(|model| ModelCandidate {
                    model: model.clone(),
                    client: client.clone(),
                })
                .collect(),
        ))
    }

    pub fn from_candidates(candidates: Vec<ModelCandidate>) -> Self {
        Self { candidates }
    }

    pub fn models(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.model.as_str()).collect()
    }

    pub async fn analyze_match(
        &self,
        resume_text: &str,
        job_description: &str,
        job_title: &str,
    ) -> MatchResult {
        match self.try_candidates(resume_text, job_description, job_title).await {
            Ok(result) => result,
            Err(failure) => {
                warn!("Match analysis degraded: {failure:?}");
                failure.into_result()
            }
        }
    }

    async fn try_candidates(
        &self,
        resume_text: &str,
        job_description: &str,
        job_title: &str,
    ) -> Result<MatchResult, MatchFailure> {
        if self.candidates.is_empty() {
            return Err(MatchFailure::NoProvider);
        }

        let prompt = match_prompt(
            job_title,
            &truncate_text(job_description, DESCRIPTION_CHAR_BUDGET),
            &truncate_text(resume_text, RESUME_CHAR_BUDGET),
        );
        debug!("Match prompt length: {} chars", prompt.len());

        let mut failure = MatchFailure::Exhausted;
        for candidate in &self.candidates {
            info!("Trying model: {}", candidate.model);
            match candidate
                .client
                .complete(&candidate.model, JSON_ONLY_SYSTEM, &prompt)
                .await
            {
                Ok(text) => {
                    debug!(
                        "Response preview: {}",
                        text.chars().take(200).collect::<String>()
                    );
                    match normalize(&text) {
                        Ok(result) => {
                            info!("Match scored by {}", candidate.model);
                            return Ok(result);
                        }
                        Err(err) => {
                            warn!("{} returned unusable output: {err}", candidate.model);
                            failure = MatchFailure::Unparseable;
                        }
                    }
                }
                Err(LlmError::Unauthorized(message)) => {
                    warn!("Authentication failed: {message}");
                    return Err(MatchFailure::Unauthorized);
                }
                Err(LlmError::EmptyContent) => {
                    warn!("{} returned no content", candidate.model);
                    failure = MatchFailure::Unparseable;
                }
                Err(err) if err.is_transient() => {
                    warn!("{} unavailable, trying next: {err}", candidate.model);
                    failure = MatchFailure::Exhausted;
                }
                Err(LlmError::Api { message, .. }) => return Err(MatchFailure::Provider(message)),
                Err(err) => return Err(MatchFailure::Provider(err.to_string())),
            }
        }

        Err(failure)
    }
}

/// Caps `text` at `max_chars` characters, marking the cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}
