use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::page::ListPage;
use crate::domain::payload::Extraction;
use crate::domain::ticket::ExtractionMethod;
use crate::error::{AppError, AppResult};
use crate::parser::identifier::TicketIdMatcher;
use crate::parser::mapper::{FieldDictionary, FieldMapping, tickets_from_rows};
use crate::parser::tabular::parse_delimited;
use crate::services::http::HttpGateway;
use crate::services::strategy::ExtractionStrategy;

const EXPORT_ACCEPT: &str = "text/csv,application/csv,text/plain,*/*";

/// A response body starting out like one of these is a rendered page (login
/// form, error page), not an export.
const MARKUP_SIGNATURES: &[&str] = &["<!doctype", "<html", "<head", "<body", "<script", "<style"];

/// Primary strategy: fetch the list's bulk export. Tries every candidate URL
/// variant per round and retries whole rounds with exponential backoff.
pub struct BulkExportStrategy {
    http: Arc<dyn HttpGateway>,
    dictionary: FieldDictionary,
    matcher: TicketIdMatcher,
    retry_attempts: u32,
    base_delay: Duration,
}

impl BulkExportStrategy {
    pub fn new(
        http: Arc<dyn HttpGateway>,
        dictionary: FieldDictionary,
        matcher: TicketIdMatcher,
        retry_attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            http,
            dictionary,
            matcher,
            retry_attempts,
            base_delay,
        }
    }

    async fn try_candidate(&self, url: &str, round: u32, page: &ListPage) -> Option<Extraction> {
        let response = match self.http.get_text(url, EXPORT_ACCEPT).await {
            Ok(response) => response,
            Err(err) => {
                warn!(url, error = %err, "export fetch failed");
                return None;
            }
        };

        if !response.is_success() {
            debug!(url, status = response.status, "export candidate rejected: status");
            return None;
        }
        if looks_like_markup(&response.body) {
            debug!(url, "export candidate rejected: response looks like markup");
            return None;
        }
        if !has_delimiters(&response.body) {
            debug!(url, "export candidate rejected: no delimiters in body");
            return None;
        }

        let rows = parse_delimited(&response.body);
        let (header, data_rows) = rows.split_first()?;
        let mapping = match FieldMapping::resolve(header, &self.dictionary) {
            Some(mapping) => mapping,
            None => {
                debug!(url, ?header, "export candidate rejected: identifier column unmapped");
                return None;
            }
        };

        let tickets = tickets_from_rows(
            &mapping,
            data_rows,
            &self.matcher,
            ExtractionMethod::BulkExport,
            page,
        );
        Some(Extraction {
            method: ExtractionMethod::BulkExport,
            tickets,
            diagnostics: json!({
                "candidate_url": url,
                "fetch_url": response.final_url,
                "round": round + 1,
                "headers": header,
                "total_rows": data_rows.len(),
            }),
        })
    }
}

#[async_trait]
impl ExtractionStrategy for BulkExportStrategy {
    fn name(&self) -> &'static str {
        "bulk_export"
    }

    async fn attempt(&self, page: &ListPage) -> AppResult<Extraction> {
        let candidates = page.export_candidates();

        for round in 0..self.retry_attempts {
            for url in &candidates {
                debug!(round = round + 1, url, "trying export candidate");
                if let Some(extraction) = self.try_candidate(url, round, page).await {
                    return Ok(extraction);
                }
            }
            // No delay after the final round; failure is reported immediately.
            if round + 1 < self.retry_attempts {
                tokio::time::sleep(backoff_delay(self.base_delay, round)).await;
            }
        }

        Err(AppError::Extraction(format!(
            "bulk export failed after {} attempts",
            self.retry_attempts
        )))
    }
}

/// Delay before the round after `round` (0-based): base × 2^round.
pub(crate) fn backoff_delay(base: Duration, round: u32) -> Duration {
    base * 2u32.saturating_pow(round)
}

fn looks_like_markup(body: &str) -> bool {
    let head: String = body.chars().take(500).collect::<String>().to_lowercase();
    MARKUP_SIGNATURES
        .iter()
        .any(|signature| head.contains(signature))
}

fn has_delimiters(body: &str) -> bool {
    body.lines()
        .take(5)
        .any(|line| line.contains(',') || line.contains('\t'))
}
