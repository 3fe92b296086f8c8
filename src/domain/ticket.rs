use serde::{Deserialize, Serialize};

/// Which strategy produced a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    BulkExport,
    QueryApi,
    Dom,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::BulkExport => "bulk_export",
            ExtractionMethod::QueryApi => "query_api",
            ExtractionMethod::Dom => "dom",
        }
    }
}

/// One helpdesk record in canonical shape.
///
/// `identifier` is the only field with a structural guarantee: it is non-empty
/// and matches a configured ticket prefix. Everything else defaults to the
/// empty string when the source column is absent. `detail_link` is derived
/// from the page origin and is a best guess, not authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub identifier: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub state: String,
    pub source_page_url: String,
    pub extraction_method: ExtractionMethod,
    #[serde(default)]
    pub detail_link: String,
}
