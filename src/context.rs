use std::sync::Arc;

use crate::config::ExtractorConfig;
use crate::services::{AnalysisService, ExtractionStrategy, PublisherService};

/// Wiring for one process: tuning, the ordered strategy chain, and the
/// collaborators the workflow publishes through.
#[derive(Clone)]
pub struct AppContext {
    pub config: ExtractorConfig,
    pub strategies: Vec<Arc<dyn ExtractionStrategy>>,
    pub publisher: Arc<dyn PublisherService>,
    pub analysis: Arc<dyn AnalysisService>,
}

impl AppContext {
    pub fn new(
        config: ExtractorConfig,
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
        publisher: Arc<dyn PublisherService>,
        analysis: Arc<dyn AnalysisService>,
    ) -> Self {
        Self {
            config,
            strategies,
            publisher,
            analysis,
        }
    }
}
