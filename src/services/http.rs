use async_trait::async_trait;

use crate::error::AppResult;

/// A fetched text body plus the response metadata the strategies inspect.
#[derive(Debug, Clone)]
pub struct TextResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
    pub final_url: String,
}

impl TextResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam for the fetch-based strategies. `get_text` reports
/// non-success statuses in the response rather than as errors so callers can
/// fall through to the next candidate URL; `get_json` treats them as errors.
#[async_trait]
pub trait HttpGateway: Send + Sync {
    async fn get_text(&self, url: &str, accept: &str) -> AppResult<TextResponse>;
    async fn get_json(&self, url: &str) -> AppResult<serde_json::Value>;
}
