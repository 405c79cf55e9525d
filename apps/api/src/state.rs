use std::sync::Arc;

use crate::harvest::harvester::Harvester;
use crate::jobs::store::JobStore;
use crate::matching::service::MatchConfig;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Job persistence. Default: `PgJobStore`.
    pub store: Arc<dyn JobStore>,
    pub harvester: Harvester,
    /// Provider routing is probed from this on every match request.
    pub match_config: MatchConfig,
}
