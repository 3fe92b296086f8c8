use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::domain::page::ListPage;
use crate::domain::payload::Extraction;
use crate::domain::ticket::{ExtractionMethod, Ticket};
use crate::error::{AppError, AppResult};
use crate::parser::identifier::TicketIdMatcher;
use crate::services::http::HttpGateway;
use crate::services::strategy::ExtractionStrategy;

const API_FIELDS: &str = "number,short_description,impact,priority,assigned_to,state";

/// Second strategy: one bounded request against the instance's table API.
/// Records come back field-keyed, so conversion maps by name instead of by
/// column index.
pub struct QueryApiStrategy {
    http: Arc<dyn HttpGateway>,
    matcher: TicketIdMatcher,
    supported_tables: Vec<String>,
    api_limit: usize,
}

impl QueryApiStrategy {
    pub fn new(
        http: Arc<dyn HttpGateway>,
        matcher: TicketIdMatcher,
        supported_tables: Vec<String>,
        api_limit: usize,
    ) -> Self {
        Self {
            http,
            matcher,
            supported_tables,
            api_limit,
        }
    }

    fn api_url(&self, page: &ListPage) -> AppResult<Url> {
        let table = page.table_name(&self.supported_tables);
        let base = format!("{}/api/now/table/{table}", page.origin());
        let mut url = Url::parse(&base)
            .map_err(|err| AppError::Extraction(format!("invalid API URL {base}: {err}")))?;
        url.query_pairs_mut()
            .append_pair("sysparm_query", &page.cleaned_filter())
            .append_pair("sysparm_display_value", "true")
            .append_pair("sysparm_exclude_reference_link", "true")
            .append_pair("sysparm_fields", API_FIELDS)
            .append_pair("sysparm_limit", &self.api_limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl ExtractionStrategy for QueryApiStrategy {
    fn name(&self) -> &'static str {
        "query_api"
    }

    async fn attempt(&self, page: &ListPage) -> AppResult<Extraction> {
        let url = self.api_url(page)?;
        let table = page.table_name(&self.supported_tables);
        debug!(%url, table, "querying table API");

        let data = self
            .http
            .get_json(url.as_str())
            .await
            .map_err(|err| AppError::Extraction(format!("table API request failed: {err}")))?;

        let items = data
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let tickets: Vec<Ticket> = items
            .iter()
            .filter_map(|item| {
                let identifier = field_value(item, "number");
                if !self.matcher.is_ticket_id(&identifier) {
                    return None;
                }
                Some(Ticket {
                    detail_link: page.detail_link(&identifier),
                    short_description: field_value(item, "short_description"),
                    impact: field_value(item, "impact"),
                    priority: field_value(item, "priority"),
                    assigned_to: field_value(item, "assigned_to"),
                    state: field_value(item, "state"),
                    source_page_url: page.list_url().to_string(),
                    extraction_method: ExtractionMethod::QueryApi,
                    identifier,
                })
            })
            .collect();

        Ok(Extraction {
            method: ExtractionMethod::QueryApi,
            tickets,
            diagnostics: json!({
                "api_url": url.as_str(),
                "table": table,
                "returned": items.len(),
            }),
        })
    }
}

/// Unwraps the API's two record shapes: plain strings, or reference objects
/// `{value, display_value}` where the display value is preferred.
fn field_value(item: &Value, field: &str) -> String {
    match item.get(field) {
        Some(Value::Object(object)) => object
            .get("display_value")
            .or_else(|| object.get("value"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        Some(Value::String(value)) => value.trim().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::services::http::TextResponse;

    struct JsonGateway {
        response: AppResult<Value>,
        requests: Mutex<Vec<String>>,
    }

    impl JsonGateway {
        fn new(response: AppResult<Value>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpGateway for JsonGateway {
        async fn get_text(&self, _url: &str, _accept: &str) -> AppResult<TextResponse> {
            Err(AppError::Http("not scripted".to_string()))
        }

        async fn get_json(&self, url: &str) -> AppResult<Value> {
            self.requests.lock().unwrap().push(url.to_string());
            match &self.response {
                Ok(value) => Ok(value.clone()),
                Err(err) => Err(AppError::Http(err.to_string())),
            }
        }
    }

    fn strategy(gateway: Arc<JsonGateway>) -> QueryApiStrategy {
        QueryApiStrategy::new(
            gateway,
            TicketIdMatcher::new(&["INC".to_string()]).unwrap(),
            vec!["incident".to_string(), "issue".to_string()],
            200,
        )
    }

    fn page() -> ListPage {
        ListPage::resolve(
            "https://a.example/incident_list.do?sysparm_query=active%3Dtrue%5EORDERBYnumber",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unwraps_display_value_records() {
        let gateway = Arc::new(JsonGateway::new(Ok(json!({
            "result": [
                {
                    "number": "INC001",
                    "state": {"value": "1", "display_value": "Open"},
                    "assigned_to": {"value": "abc", "display_value": "Ana García"},
                },
                {"number": "XYZ999", "state": "Open"},
            ]
        }))));
        let extraction = strategy(gateway.clone()).attempt(&page()).await.unwrap();
        assert_eq!(extraction.tickets.len(), 1);
        assert_eq!(extraction.tickets[0].state, "Open");
        assert_eq!(extraction.tickets[0].assigned_to, "Ana García");
        assert_eq!(
            extraction.tickets[0].extraction_method,
            ExtractionMethod::QueryApi
        );
    }

    #[tokio::test]
    async fn request_url_carries_cleaned_query_and_limits() {
        let gateway = Arc::new(JsonGateway::new(Ok(json!({"result": []}))));
        strategy(gateway.clone()).attempt(&page()).await.unwrap();
        let requests = gateway.requests.lock().unwrap();
        let url = &requests[0];
        assert!(url.starts_with("https://a.example/api/now/table/incident?"));
        assert!(url.contains("sysparm_query=active%3Dtrue"));
        assert!(!url.contains("ORDERBY"));
        assert!(url.contains("sysparm_limit=200"));
        assert!(url.contains("sysparm_display_value=true"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_strategy_failure() {
        let gateway = Arc::new(JsonGateway::new(Err(AppError::Http(
            "401 Unauthorized".to_string(),
        ))));
        let err = strategy(gateway).attempt(&page()).await.unwrap_err();
        assert!(err.to_string().contains("table API request failed"));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn empty_result_set_is_success_with_zero_tickets() {
        let gateway = Arc::new(JsonGateway::new(Ok(json!({"result": []}))));
        let extraction = strategy(gateway).attempt(&page()).await.unwrap();
        assert!(extraction.tickets.is_empty());
    }

    #[test]
    fn field_value_handles_all_shapes() {
        let item = json!({
            "plain": " text ",
            "reference": {"value": "v", "display_value": "shown"},
            "value_only": {"value": "v"},
            "number": 7,
        });
        assert_eq!(field_value(&item, "plain"), "text");
        assert_eq!(field_value(&item, "reference"), "shown");
        assert_eq!(field_value(&item, "value_only"), "v");
        assert_eq!(field_value(&item, "number"), "");
        assert_eq!(field_value(&item, "missing"), "");
    }
}
