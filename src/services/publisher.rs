use async_trait::async_trait;

use crate::domain::payload::ResultPayload;
use crate::error::AppResult;

/// Single exit point for extraction runs: persists the terminal payload under
/// the well-known keys and fans it out to any listener.
#[async_trait]
pub trait PublisherService: Send + Sync {
    async fn publish(&self, context_id: &str, payload: &ResultPayload) -> AppResult<()>;
}

/// Optional fan-out hook invoked after a payload is persisted. Failures here
/// must never fail the publish; the stored payload stays the source of truth.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, payload: &ResultPayload) -> AppResult<()>;
}
