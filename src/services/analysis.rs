use async_trait::async_trait;

use crate::error::AppResult;

/// Downstream AI-analysis collaborator. One bounded request per call; when
/// `privacy_filter` is set, sensitive fragments are scrubbed from the prompt
/// before it leaves the process.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, prompt: &str, privacy_filter: bool) -> AppResult<String>;
}
