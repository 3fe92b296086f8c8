use async_trait::async_trait;

use crate::domain::page::ListPage;
use crate::domain::payload::Extraction;
use crate::error::AppResult;

/// One self-contained extraction technique. Strategies are tried in priority
/// order by the orchestrator; an `Err` is recorded as that strategy's failure
/// reason and control passes to the next one.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, page: &ListPage) -> AppResult<Extraction>;
}
