use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::page::ListPage;
use crate::domain::ticket::{ExtractionMethod, Ticket};

/// What one strategy hands back on success, before it is wrapped into the
/// published payload.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub method: ExtractionMethod,
    pub tickets: Vec<Ticket>,
    pub diagnostics: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadMeta {
    pub version: String,
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

/// Terminal result of one extraction run. Constructed once by the
/// orchestrator, handed to the publisher, never mutated afterward.
///
/// Serialized untagged: consumers distinguish the variants by the `success`
/// flag and the fields present, matching the stored-payload shape other
/// tooling already reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultPayload {
    Success(SuccessPayload),
    Failure(FailurePayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessPayload {
    pub success: bool,
    pub method: ExtractionMethod,
    pub timestamp: DateTime<Utc>,
    pub page_url: String,
    pub resolved_list_url: String,
    pub count: usize,
    pub tickets: Vec<Ticket>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub diagnostics: serde_json::Value,
    pub meta: PayloadMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePayload {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub page_url: String,
    pub resolved_list_url: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub errors: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_error: Option<CriticalError>,
    pub meta: PayloadMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalError {
    pub message: String,
}

impl ResultPayload {
    pub fn success(page: &ListPage, extraction: Extraction, mut meta: PayloadMeta) -> Self {
        meta.via = Some(extraction.method.as_str().to_string());
        ResultPayload::Success(SuccessPayload {
            success: true,
            method: extraction.method,
            timestamp: Utc::now(),
            page_url: page.page_url().to_string(),
            resolved_list_url: page.list_url().to_string(),
            count: extraction.tickets.len(),
            tickets: extraction.tickets,
            diagnostics: extraction.diagnostics,
            meta,
        })
    }

    pub fn failure(page: &ListPage, errors: IndexMap<String, String>, meta: PayloadMeta) -> Self {
        ResultPayload::Failure(FailurePayload {
            success: false,
            timestamp: Utc::now(),
            page_url: page.page_url().to_string(),
            resolved_list_url: page.list_url().to_string(),
            errors,
            critical_error: None,
            meta,
        })
    }

    pub fn critical(page: &ListPage, message: String, meta: PayloadMeta) -> Self {
        ResultPayload::Failure(FailurePayload {
            success: false,
            timestamp: Utc::now(),
            page_url: page.page_url().to_string(),
            resolved_list_url: page.list_url().to_string(),
            errors: IndexMap::new(),
            critical_error: Some(CriticalError { message }),
            meta,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultPayload::Success(_))
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ResultPayload::Success(payload) => payload.timestamp,
            ResultPayload::Failure(payload) => payload.timestamp,
        }
    }
}
