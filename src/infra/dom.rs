use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::debug;

use crate::domain::page::ListPage;
use crate::domain::payload::Extraction;
use crate::domain::ticket::{ExtractionMethod, Ticket};
use crate::error::{AppError, AppResult};
use crate::parser::identifier::TicketIdMatcher;
use crate::parser::mapper::{FieldDictionary, FieldMapping};
use crate::services::http::HttpGateway;
use crate::services::strategy::ExtractionStrategy;

const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml";

/// Last-resort strategy: fetch the rendered list page and read the visible
/// tables. A table whose headers don't resolve an identifier column is
/// skipped rather than failing the strategy.
pub struct DomStrategy {
    http: Arc<dyn HttpGateway>,
    dictionary: FieldDictionary,
    matcher: TicketIdMatcher,
}

impl DomStrategy {
    pub fn new(
        http: Arc<dyn HttpGateway>,
        dictionary: FieldDictionary,
        matcher: TicketIdMatcher,
    ) -> Self {
        Self {
            http,
            dictionary,
            matcher,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for DomStrategy {
    fn name(&self) -> &'static str {
        "dom"
    }

    async fn attempt(&self, page: &ListPage) -> AppResult<Extraction> {
        let response = self
            .http
            .get_text(page.list_url().as_str(), PAGE_ACCEPT)
            .await
            .map_err(|err| AppError::Extraction(format!("list page fetch failed: {err}")))?;
        if !response.is_success() {
            return Err(AppError::Extraction(format!(
                "list page fetch failed with status {}",
                response.status
            )));
        }
        scan_tables(&response.body, &self.dictionary, &self.matcher, page)
    }
}

/// Scans tables in document order and returns the first that yields at least
/// one valid ticket.
pub(crate) fn scan_tables(
    html: &str,
    dictionary: &FieldDictionary,
    matcher: &TicketIdMatcher,
    page: &ListPage,
) -> AppResult<Extraction> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let head_cell_selector = selector("thead th, thead td")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("th, td")?;
    let body_row_selector = selector("tbody tr")?;
    let data_cell_selector = selector("td")?;
    let link_selector = selector("a")?;

    let tables: Vec<ElementRef> = document.select(&table_selector).collect();
    debug!(tables = tables.len(), "scanning document tables");

    for (table_index, table) in tables.iter().enumerate() {
        let mut headers: Vec<String> = table.select(&head_cell_selector).map(cell_text).collect();
        if headers.is_empty() {
            headers = table
                .select(&row_selector)
                .next()
                .map(|row| row.select(&cell_selector).map(cell_text).collect())
                .unwrap_or_default();
        }
        if headers.is_empty() {
            continue;
        }

        let Some(mapping) = FieldMapping::resolve(&headers, dictionary) else {
            continue;
        };

        let mut tickets = Vec::new();
        for row in table.select(&body_row_selector) {
            let cells: Vec<ElementRef> = row.select(&data_cell_selector).collect();
            if cells.is_empty() {
                continue;
            }

            let identifier_cell = cells.get(mapping.identifier);
            let identifier = identifier_cell.map(|cell| cell_text(*cell)).unwrap_or_default();
            if !matcher.is_ticket_id(&identifier) {
                continue;
            }

            let pick = |index: Option<usize>| -> String {
                index
                    .and_then(|i| cells.get(i))
                    .map(|cell| cell_text(*cell))
                    .unwrap_or_default()
            };
            let href = identifier_cell
                .and_then(|cell| cell.select(&link_selector).next())
                .and_then(|anchor| anchor.value().attr("href"))
                .and_then(|href| page.list_url().join(href).ok())
                .map(|url| url.to_string());

            tickets.push(Ticket {
                detail_link: href.unwrap_or_else(|| page.detail_link(&identifier)),
                short_description: pick(mapping.short_description),
                impact: pick(mapping.impact),
                priority: pick(mapping.priority),
                assigned_to: pick(mapping.assigned_to),
                state: pick(mapping.state),
                source_page_url: page.page_url().to_string(),
                extraction_method: ExtractionMethod::Dom,
                identifier,
            });
        }

        if !tickets.is_empty() {
            return Ok(Extraction {
                method: ExtractionMethod::Dom,
                tickets,
                diagnostics: json!({
                    "table_index": table_index + 1,
                    "total_tables": tables.len(),
                    "headers": headers,
                }),
            });
        }
    }

    Err(AppError::Extraction(format!(
        "no qualifying ticket table found ({} tables scanned)",
        tables.len()
    )))
}

fn selector(css: &str) -> AppResult<Selector> {
    Selector::parse(css)
        .map_err(|err| AppError::Extraction(format!("invalid selector {css}: {err:?}")))
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> FieldDictionary {
        FieldDictionary::default()
    }

    fn matcher() -> TicketIdMatcher {
        TicketIdMatcher::new(&["INC".to_string()]).unwrap()
    }

    fn page() -> ListPage {
        ListPage::resolve("https://a.example/incident_list.do").unwrap()
    }

    #[test]
    fn reads_tickets_from_a_table_with_thead() {
        let html = r#"
            <table>
              <thead><tr><th>Number</th><th>Short description</th><th>State</th></tr></thead>
              <tbody>
                <tr><td><a href="/incident.do?sys_id=1">INC001</a></td><td>Printer on fire</td><td>Open</td></tr>
                <tr><td>INC002</td><td>VPN down</td><td>Closed</td></tr>
              </tbody>
            </table>"#;
        let extraction = scan_tables(html, &dictionary(), &matcher(), &page()).unwrap();
        assert_eq!(extraction.tickets.len(), 2);
        assert_eq!(extraction.tickets[0].identifier, "INC001");
        assert_eq!(extraction.tickets[0].short_description, "Printer on fire");
        assert_eq!(
            extraction.tickets[0].detail_link,
            "https://a.example/incident.do?sys_id=1"
        );
        assert!(extraction.tickets[1].detail_link.contains("number=INC002"));
    }

    #[test]
    fn table_without_identifier_column_is_skipped() {
        let html = r#"
            <table>
              <thead><tr><th>Widget</th><th>Count</th></tr></thead>
              <tbody><tr><td>INC999</td><td>3</td></tr></tbody>
            </table>
            <table>
              <thead><tr><th>número</th><th>estado</th></tr></thead>
              <tbody><tr><td>INC003</td><td>Abierto</td></tr></tbody>
            </table>"#;
        let extraction = scan_tables(html, &dictionary(), &matcher(), &page()).unwrap();
        assert_eq!(extraction.tickets.len(), 1);
        assert_eq!(extraction.tickets[0].identifier, "INC003");
        assert_eq!(extraction.tickets[0].state, "Abierto");
        assert_eq!(extraction.diagnostics["table_index"], 2);
        assert_eq!(extraction.diagnostics["total_tables"], 2);
    }

    #[test]
    fn headerless_first_row_serves_as_headers() {
        let html = r#"
            <table>
              <tr><td>number</td><td>state</td></tr>
              <tr><td>INC004</td><td>Open</td></tr>
            </table>"#;
        let extraction = scan_tables(html, &dictionary(), &matcher(), &page()).unwrap();
        // The header row itself fails the identifier check and is dropped.
        assert_eq!(extraction.tickets.len(), 1);
        assert_eq!(extraction.tickets[0].identifier, "INC004");
    }

    #[test]
    fn failure_reports_tables_scanned() {
        let html = "<table><tr><th>foo</th></tr></table><p>nothing</p>";
        let err = scan_tables(html, &dictionary(), &matcher(), &page()).unwrap_err();
        assert!(err.to_string().contains("1 tables scanned"));
    }

    #[test]
    fn table_with_only_invalid_rows_keeps_scanning() {
        let html = r#"
            <table>
              <thead><tr><th>number</th></tr></thead>
              <tbody><tr><td>XYZ1</td></tr></tbody>
            </table>"#;
        let err = scan_tables(html, &dictionary(), &matcher(), &page()).unwrap_err();
        assert!(err.to_string().contains("1 tables scanned"));
    }
}
