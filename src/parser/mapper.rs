use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::domain::page::ListPage;
use crate::domain::ticket::{ExtractionMethod, Ticket};
use crate::parser::identifier::TicketIdMatcher;

/// Recognized header aliases per canonical ticket field, in priority order.
/// Listings come back with Spanish or English headers depending on the user's
/// instance language, so both forms are listed.
#[derive(Debug, Clone)]
pub struct FieldDictionary {
    pub identifier: Vec<String>,
    pub short_description: Vec<String>,
    pub impact: Vec<String>,
    pub priority: Vec<String>,
    pub assigned_to: Vec<String>,
    pub state: Vec<String>,
}

impl Default for FieldDictionary {
    fn default() -> Self {
        fn list(aliases: &[&str]) -> Vec<String> {
            aliases.iter().map(|a| a.to_string()).collect()
        }
        Self {
            identifier: list(&["número", "numero", "number", "ticket_id", "incident_id"]),
            short_description: list(&[
                "descripción breve",
                "descripcion breve",
                "short description",
                "short_description",
                "description",
                "descripción",
                "title",
            ]),
            impact: list(&["impacto", "impact", "business_impact"]),
            priority: list(&["prioridad", "priority", "urgency"]),
            assigned_to: list(&[
                "asignado a",
                "assigned to",
                "asignado",
                "assigned_to",
                "assignment group",
                "assigned",
                "assigned_user",
            ]),
            state: list(&["estado", "state", "status", "ticket_state"]),
        }
    }
}

/// Trims, lowercases and strips diacritics so "Número " and "numero" compare
/// equal.
pub fn fold_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect()
}

/// Resolved column indices for one observed header row. Ephemeral: computed
/// per extraction, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub identifier: usize,
    pub short_description: Option<usize>,
    pub impact: Option<usize>,
    pub priority: Option<usize>,
    pub assigned_to: Option<usize>,
    pub state: Option<usize>,
}

impl FieldMapping {
    /// Maps a header row against the dictionary. Returns `None` when no column
    /// resolves for `identifier` — the caller decides whether that is a hard
    /// failure (bulk export, query API) or a skip (DOM table scan). Every
    /// other field is simply absent when unresolved.
    pub fn resolve(headers: &[String], dictionary: &FieldDictionary) -> Option<Self> {
        let folded: Vec<String> = headers.iter().map(|h| fold_text(h)).collect();
        let identifier = find_column(&folded, &dictionary.identifier)?;
        Some(Self {
            identifier,
            short_description: find_column(&folded, &dictionary.short_description),
            impact: find_column(&folded, &dictionary.impact),
            priority: find_column(&folded, &dictionary.priority),
            assigned_to: find_column(&folded, &dictionary.assigned_to),
            state: find_column(&folded, &dictionary.state),
        })
    }
}

/// First alias in priority order that matches a header wins; among matching
/// headers the leftmost is taken. A header matches an alias on equality or
/// when either contains the other, which tolerates decorations like
/// "number (display)". Headers that normalize to nothing never match.
fn find_column(folded_headers: &[String], aliases: &[String]) -> Option<usize> {
    for alias in aliases {
        let alias = fold_text(alias);
        let hit = folded_headers.iter().position(|header| {
            !header.is_empty()
                && (*header == alias || header.contains(&alias) || alias.contains(header.as_str()))
        });
        if hit.is_some() {
            return hit;
        }
    }
    None
}

/// Converts data rows into tickets through a resolved mapping. Rows whose
/// identifier fails the pattern set are dropped silently; unmapped columns
/// read as empty strings.
pub fn tickets_from_rows(
    mapping: &FieldMapping,
    rows: &[Vec<String>],
    matcher: &TicketIdMatcher,
    method: ExtractionMethod,
    page: &ListPage,
) -> Vec<Ticket> {
    let pick = |columns: &[String], index: Option<usize>| -> String {
        index
            .and_then(|i| columns.get(i))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    rows.iter()
        .filter_map(|columns| {
            let identifier = pick(columns, Some(mapping.identifier));
            if !matcher.is_ticket_id(&identifier) {
                return None;
            }
            Some(Ticket {
                detail_link: page.detail_link(&identifier),
                short_description: pick(columns, mapping.short_description),
                impact: pick(columns, mapping.impact),
                priority: pick(columns, mapping.priority),
                assigned_to: pick(columns, mapping.assigned_to),
                state: pick(columns, mapping.state),
                source_page_url: page.list_url().to_string(),
                extraction_method: method,
                identifier,
            })
        })
        .collect()
}
