//! Orchestration of one extraction run: try strategies in order, publish
//! exactly one payload.

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::config::VERSION;
use crate::context::AppContext;
use crate::domain::page::ListPage;
use crate::domain::payload::{PayloadMeta, ResultPayload};
use crate::error::AppResult;
use crate::infra::store::context_id;

/// Lifecycle of a single run. Running carries the index of the strategy
/// currently being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running(usize),
    Published,
    Failed,
}

/// Runs the strategy chain against one resolved list page and publishes the
/// outcome. Internal faults are converted into a critical-error payload so
/// that consumers always see a fresh result, even when the run itself broke.
pub async fn run_extraction(ctx: &AppContext, page: &ListPage) -> AppResult<ResultPayload> {
    let meta = run_meta();
    let payload = match execute(ctx, page, meta.clone()).await {
        Ok(payload) => payload,
        Err(err) => {
            error!(error = %err, "extraction run faulted");
            ResultPayload::critical(page, err.to_string(), meta)
        }
    };

    ctx.publisher
        .publish(&context_id(page.page_url().as_str()), &payload)
        .await?;
    Ok(payload)
}

async fn execute(
    ctx: &AppContext,
    page: &ListPage,
    meta: PayloadMeta,
) -> AppResult<ResultPayload> {
    let mut state = RunState::Idle;
    info!(?state, strategies = ctx.strategies.len(), "run starting");
    let mut errors: IndexMap<String, String> = IndexMap::new();

    for (index, strategy) in ctx.strategies.iter().enumerate() {
        state = RunState::Running(index);
        info!(?state, strategy = strategy.name(), "attempting extraction");
        match strategy.attempt(page).await {
            Ok(extraction) => {
                state = RunState::Published;
                info!(
                    ?state,
                    strategy = strategy.name(),
                    tickets = extraction.tickets.len(),
                    "extraction succeeded"
                );
                return Ok(ResultPayload::success(page, extraction, meta));
            }
            Err(err) => {
                warn!(strategy = strategy.name(), error = %err, "strategy failed");
                errors.insert(strategy.name().to_string(), err.to_string());
            }
        }
    }

    state = RunState::Failed;
    info!(?state, attempted = errors.len(), "all strategies exhausted");
    Ok(ResultPayload::failure(page, errors, meta))
}

fn run_meta() -> PayloadMeta {
    PayloadMeta {
        version: VERSION.to_string(),
        instance_id: instance_id(),
        via: None,
    }
}

/// Short id distinguishing concurrent runs in stored payloads.
fn instance_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or_default();
    let seed = format!("{}-{nanos}", std::process::id());
    blake3::hash(seed.as_bytes()).to_hex()[..5].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::config::ExtractorConfig;
    use crate::domain::payload::Extraction;
    use crate::domain::ticket::ExtractionMethod;
    use crate::error::AppError;
    use crate::services::{AnalysisService, ExtractionStrategy, PublisherService};

    struct FakeStrategy {
        name: &'static str,
        succeed: bool,
        calls: AtomicUsize,
    }

    impl FakeStrategy {
        fn new(name: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                succeed,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExtractionStrategy for FakeStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, _page: &ListPage) -> AppResult<Extraction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(Extraction {
                    method: ExtractionMethod::BulkExport,
                    tickets: vec![],
                    diagnostics: Value::Null,
                })
            } else {
                Err(AppError::Extraction(format!("{} broke", self.name)))
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: std::sync::Mutex<Vec<(String, ResultPayload)>>,
    }

    #[async_trait]
    impl PublisherService for RecordingPublisher {
        async fn publish(&self, context_id: &str, payload: &ResultPayload) -> AppResult<()> {
            self.published
                .lock()
                .unwrap()
                .push((context_id.to_string(), payload.clone()));
            Ok(())
        }
    }

    struct NoAnalysis;

    #[async_trait]
    impl AnalysisService for NoAnalysis {
        async fn analyze(&self, _prompt: &str, _privacy_filter: bool) -> AppResult<String> {
            Err(AppError::Analysis("not available in tests".to_string()))
        }
    }

    fn context(
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
        publisher: Arc<RecordingPublisher>,
    ) -> AppContext {
        AppContext::new(
            ExtractorConfig::default(),
            strategies,
            publisher,
            Arc::new(NoAnalysis),
        )
    }

    fn page() -> ListPage {
        ListPage::resolve("https://a.example/incident_list.do").unwrap()
    }

    #[tokio::test]
    async fn first_success_stops_the_chain() {
        let first = FakeStrategy::new("bulk_export", true);
        let second = FakeStrategy::new("query_api", true);
        let publisher = Arc::new(RecordingPublisher::default());
        let ctx = context(vec![first.clone(), second.clone()], publisher.clone());

        let payload = run_extraction(&ctx, &page()).await.unwrap();
        assert!(payload.is_success());
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn later_strategy_recovers_from_earlier_failures() {
        let first = FakeStrategy::new("bulk_export", false);
        let second = FakeStrategy::new("query_api", true);
        let publisher = Arc::new(RecordingPublisher::default());
        let ctx = context(vec![first.clone(), second.clone()], publisher.clone());

        let payload = run_extraction(&ctx, &page()).await.unwrap();
        assert!(payload.is_success());
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failures_publish_one_failure_payload_in_order() {
        let strategies: Vec<Arc<dyn ExtractionStrategy>> = vec![
            FakeStrategy::new("bulk_export", false),
            FakeStrategy::new("query_api", false),
            FakeStrategy::new("dom", false),
        ];
        let publisher = Arc::new(RecordingPublisher::default());
        let ctx = context(strategies, publisher.clone());

        let payload = run_extraction(&ctx, &page()).await.unwrap();
        assert!(!payload.is_success());

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        match &published[0].1 {
            ResultPayload::Failure(failure) => {
                let names: Vec<&str> = failure.errors.keys().map(String::as_str).collect();
                assert_eq!(names, vec!["bulk_export", "query_api", "dom"]);
                assert!(failure.critical_error.is_none());
            }
            ResultPayload::Success(_) => panic!("expected failure payload"),
        }
    }

    #[tokio::test]
    async fn empty_strategy_chain_is_a_plain_failure() {
        let publisher = Arc::new(RecordingPublisher::default());
        let ctx = context(vec![], publisher.clone());
        let payload = run_extraction(&ctx, &page()).await.unwrap();
        assert!(!payload.is_success());
        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn context_id_matches_page_url() {
        let publisher = Arc::new(RecordingPublisher::default());
        let ctx = context(vec![FakeStrategy::new("bulk_export", true)], publisher.clone());
        run_extraction(&ctx, &page()).await.unwrap();

        let published = publisher.published.lock().unwrap();
        assert_eq!(
            published[0].0,
            context_id(page().page_url().as_str())
        );
    }
}
