use std::sync::Arc;

use crate::auth::SessionVerifier;
use crate::config::Config;
use crate::dispatch::RouteRules;
use crate::ocr::OcrProvider;

/// Shared, read-only state built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ocr: OcrProvider,
    pub sessions: SessionVerifier,
    /// Dispatcher rule table.
    pub routes: Arc<RouteRules>,
}

impl AppState {
    pub fn new(config: Config, ocr: OcrProvider, sessions: SessionVerifier) -> Self {
        Self {
            config: Arc::new(config),
            ocr,
            sessions,
            routes: Arc::new(RouteRules::default()),
        }
    }
}
