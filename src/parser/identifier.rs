use regex::Regex;

use crate::error::{AppError, AppResult};

/// Validates ticket identifiers against the configured prefix set.
///
/// A value qualifies when it starts with one of the prefixes followed by at
/// least one digit, case-insensitively. Compiled once at construction from the
/// injected configuration.
#[derive(Debug, Clone)]
pub struct TicketIdMatcher {
    pattern: Option<Regex>,
}

impl TicketIdMatcher {
    pub fn new(prefixes: &[String]) -> AppResult<Self> {
        if prefixes.is_empty() {
            return Ok(Self { pattern: None });
        }
        let alternation = prefixes
            .iter()
            .map(|prefix| regex::escape(prefix))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("(?i)^(?:{alternation})[0-9]+"))
            .map_err(|err| AppError::Configuration(format!("invalid ticket prefix list: {err}")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn is_ticket_id(&self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> TicketIdMatcher {
        let prefixes: Vec<String> = ["ISU", "INC", "PRB", "CHG", "RITM", "SCTASK"]
            .iter()
            .map(|p| p.to_string())
            .collect();
        TicketIdMatcher::new(&prefixes).unwrap()
    }

    #[test]
    fn accepts_known_prefixes() {
        let m = matcher();
        assert!(m.is_ticket_id("INC001"));
        assert!(m.is_ticket_id("RITM0042"));
        assert!(m.is_ticket_id("  CHG7  "));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(matcher().is_ticket_id("inc123"));
    }

    #[test]
    fn rejects_unknown_prefix() {
        assert!(!matcher().is_ticket_id("XYZ999"));
    }

    #[test]
    fn rejects_prefix_without_digits() {
        assert!(!matcher().is_ticket_id("INC"));
        assert!(!matcher().is_ticket_id("INC-1"));
    }

    #[test]
    fn rejects_empty_value() {
        assert!(!matcher().is_ticket_id(""));
        assert!(!matcher().is_ticket_id("   "));
    }

    #[test]
    fn empty_prefix_list_matches_nothing() {
        let m = TicketIdMatcher::new(&[]).unwrap();
        assert!(!m.is_ticket_id("INC001"));
    }
}
