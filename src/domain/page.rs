use url::Url;

use crate::error::{AppError, AppResult};

/// Wrapper path used by the unified navigation shell; the real list URL is
/// percent-encoded after this marker.
const NAV_MARKER: &str = "/now/nav/ui/classic/params/target/";

/// Filter clauses that only make sense for a rendered list view. A flat fetch
/// rejects them, so they are stripped before the query is reused.
const CLAUSE_DENYLIST: &[&str] = &["GROUPBY", "GROUPBYREL", "ORDERBY", "HAVING"];

const FALLBACK_TABLE: &str = "issue";

/// A ticket list page and the canonical list URL it resolves to.
///
/// The page URL is whatever the caller is looking at; the list URL is the
/// direct `*_list.do` address that export and API requests are issued against.
#[derive(Debug, Clone)]
pub struct ListPage {
    page_url: Url,
    list_url: Url,
}

impl ListPage {
    /// Resolves the real list URL behind `page_url`, handling direct list
    /// pages, the unified-navigation wrapper, and `nav_to.do` indirection.
    /// Anything else is not a list page and is rejected.
    pub fn resolve(page_url: &str) -> AppResult<Self> {
        let url = Url::parse(page_url)
            .map_err(|err| AppError::Page(format!("invalid URL {page_url}: {err}")))?;
        let list_url = resolve_list_url(&url)
            .ok_or_else(|| AppError::Page(page_url.to_string()))?;
        Ok(Self {
            page_url: url,
            list_url,
        })
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn list_url(&self) -> &Url {
        &self.list_url
    }

    pub fn origin(&self) -> String {
        self.list_url.origin().ascii_serialization()
    }

    /// Resource name behind the list, checked against the allow-list of known
    /// table types. Unrecognized names fall back to the generic issue table.
    pub fn table_name(&self, supported: &[String]) -> String {
        let table = self
            .list_url
            .path()
            .rsplit('/')
            .next()
            .and_then(|segment| segment.strip_suffix("_list.do"))
            .unwrap_or_default();
        if supported.iter().any(|known| known == table) {
            table.to_string()
        } else {
            FALLBACK_TABLE.to_string()
        }
    }

    /// The page's encoded filter expression, verbatim.
    pub fn raw_filter(&self) -> String {
        self.list_url
            .query_pairs()
            .find(|(key, _)| key == "sysparm_query")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default()
    }

    /// The filter with ordering/grouping/aggregation clauses stripped.
    pub fn cleaned_filter(&self) -> String {
        clean_encoded_query(&self.raw_filter())
    }

    /// Export-URL variants in priority order. Instances differ in which
    /// query-parameter convention their export endpoint honors.
    pub fn export_candidates(&self) -> Vec<String> {
        const SUFFIXES: &[&str] = &[
            "CSV&sysparm_skip_confirm=true&sysparm_encode_utf8=true",
            "sysparm_export=csv&sysparm_skip_confirm=true&sysparm_encode_utf8=true",
            "sysparm_export=csv&sysparm_separator=%2C&sysparm_skip_confirm=true&sysparm_encode_utf8=true",
            "CSV",
            "sysparm_export=csv",
        ];
        let base = self.list_url.as_str();
        let joiner = if base.contains('?') { "&" } else { "?" };
        SUFFIXES
            .iter()
            .map(|suffix| format!("{base}{joiner}{suffix}"))
            .collect()
    }

    /// Best-effort deep link for a ticket. `task.do` with a number query works
    /// across record types, so it is used instead of guessing the table form.
    pub fn detail_link(&self, identifier: &str) -> String {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return String::new();
        }
        format!(
            "{}/nav_to.do?uri=task.do?sysparm_query=number={identifier}",
            self.origin()
        )
    }
}

fn resolve_list_url(url: &Url) -> Option<Url> {
    if url.path().ends_with("_list.do") {
        return Some(url.clone());
    }

    let origin = url.origin().ascii_serialization();

    if let Some(position) = url.path().find(NAV_MARKER) {
        let encoded = &url.path()[position + NAV_MARKER.len()..];
        let decoded = urlencoding::decode(encoded).ok()?.into_owned();
        let target = if decoded.starts_with('/') {
            format!("{origin}{decoded}")
        } else {
            format!("{origin}/{decoded}")
        };
        return Url::parse(&target).ok().filter(is_list_url);
    }

    if url.path().contains("nav_to.do") {
        let uri = url
            .query_pairs()
            .find(|(key, _)| key == "uri")
            .map(|(_, value)| value.into_owned())?;
        if !uri.contains("_list.do") {
            return None;
        }
        let target = if uri.starts_with('/') {
            format!("{origin}{uri}")
        } else {
            format!("{origin}/{uri}")
        };
        return Url::parse(&target).ok().filter(is_list_url);
    }

    None
}

fn is_list_url(url: &Url) -> bool {
    url.path().contains("_list.do")
}

/// Drops filter clauses whose keyword prefix is on the denylist. The clause
/// separator is `^`; empty clauses are discarded as well.
pub fn clean_encoded_query(query: &str) -> String {
    query
        .split('^')
        .filter(|clause| !clause.is_empty())
        .filter(|clause| {
            let upper = clause.to_uppercase();
            !CLAUSE_DENYLIST
                .iter()
                .any(|keyword| upper.starts_with(keyword))
        })
        .collect::<Vec<_>>()
        .join("^")
}
