//! State classification and report rendering for extracted tickets.

use crate::domain::ticket::Ticket;
use crate::parser::mapper::fold_text;

/// Ticket counts bucketed by workflow state. Buckets follow the triage
/// workflow the listings use; anything unrecognized shows up as the
/// unclassified remainder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateBreakdown {
    pub test_passed: usize,
    pub pending_clarification: usize,
    pub pending_ua_test: usize,
    pub open: usize,
    pub in_progress: usize,
    pub rejected: usize,
}

impl StateBreakdown {
    pub fn classified_total(&self) -> usize {
        self.test_passed
            + self.pending_clarification
            + self.pending_ua_test
            + self.open
            + self.in_progress
            + self.rejected
    }
}

/// Buckets tickets by state using accent-insensitive substring matching, so
/// "Pendiente de Aclaración" and "pendiente de aclaracion" land together.
pub fn count_by_state(tickets: &[Ticket]) -> StateBreakdown {
    let mut counts = StateBreakdown::default();
    for ticket in tickets {
        let state = fold_text(&ticket.state);
        if state.contains("prueba superada") || state.contains("superada") {
            counts.test_passed += 1;
        } else if state.contains("pendiente de aclarac") || state.contains("aclaracion") {
            counts.pending_clarification += 1;
        } else if state.contains("pendiente ua-test")
            || state.contains("ua-test")
            || state.contains("uatest")
        {
            counts.pending_ua_test += 1;
        } else if state.contains("abierto") || state == "open" {
            counts.open += 1;
        } else if state.contains("en curso") || state.contains("in progress") {
            counts.in_progress += 1;
        } else if state.contains("rechazado") || state.contains("rejected") {
            counts.rejected += 1;
        }
    }
    counts
}

pub fn render_report(tickets: &[Ticket]) -> String {
    let counts = count_by_state(tickets);
    let total = tickets.len();
    let classified = counts.classified_total();

    let mut report = format!(
        "📊 TOTAL: {total}\n\
         ✅ Test passed: {}\n\
         ❓ Pending clarification: {}\n\
         🧪 Pending UA-Test: {}\n\
         🔴 Open: {}\n\
         🔵 In progress: {}\n\
         ❌ Rejected: {}",
        counts.test_passed,
        counts.pending_clarification,
        counts.pending_ua_test,
        counts.open,
        counts.in_progress,
        counts.rejected,
    );
    if classified != total {
        report.push_str(&format!("\n\n⚠️ Unclassified: {}", total - classified));
    }
    report
}

/// Builds the prompt handed to the analysis collaborator: one compact line
/// per ticket plus the exact counts the draft must repeat.
pub fn build_analysis_prompt(tickets: &[Ticket]) -> String {
    let counts = count_by_state(tickets);
    let lines = tickets
        .iter()
        .map(|ticket| {
            let assignee = if ticket.assigned_to.is_empty() {
                "Unassigned"
            } else {
                ticket.assigned_to.as_str()
            };
            let description: String = ticket.short_description.chars().take(80).collect();
            format!("{}|{}|{assignee}|{description}", ticket.identifier, ticket.state)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Draft a professional executive status email. Use EXACTLY these numbers:\n\n\
         Total: {total}\n\
         ✅ Test passed: {}\n\
         ❓ Pending clarification: {}\n\
         🧪 Pending UA-Test: {}\n\
         🔴 Open: {}\n\
         🔵 In progress: {}\n\
         ❌ Rejected: {}\n\n\
         Ticket data (identifier|state|assignee|description):\n{lines}\n\n\
         Add ONE paragraph highlighting what matters operationally, such as \
         clarification tickets causing blockers, in-progress tickets needing \
         immediate attention, or workload concentration. Be specific and \
         professional.\n\n\
         IMPORTANT:\n\
         - Do NOT add a signature, phone number, or contact details\n\
         - The paragraph must be grounded in the real data above",
        counts.test_passed,
        counts.pending_clarification,
        counts.pending_ua_test,
        counts.open,
        counts.in_progress,
        counts.rejected,
        total = tickets.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::ExtractionMethod;

    fn ticket(state: &str) -> Ticket {
        Ticket {
            identifier: "INC001".to_string(),
            short_description: String::new(),
            impact: String::new(),
            priority: String::new(),
            assigned_to: String::new(),
            state: state.to_string(),
            source_page_url: String::new(),
            extraction_method: ExtractionMethod::BulkExport,
            detail_link: String::new(),
        }
    }

    #[test]
    fn buckets_accented_spanish_states() {
        let tickets = vec![
            ticket("Prueba Superada"),
            ticket("Pendiente de Aclaración"),
            ticket("pendiente de aclaracion"),
            ticket("Pendiente UA-Test"),
            ticket("Abierto"),
            ticket("Open"),
            ticket("En curso"),
            ticket("Rechazado"),
        ];
        let counts = count_by_state(&tickets);
        assert_eq!(counts.test_passed, 1);
        assert_eq!(counts.pending_clarification, 2);
        assert_eq!(counts.pending_ua_test, 1);
        assert_eq!(counts.open, 2);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.rejected, 1);
    }

    #[test]
    fn english_states_are_recognized() {
        let tickets = vec![ticket("In Progress"), ticket("Rejected")];
        let counts = count_by_state(&tickets);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.rejected, 1);
    }

    #[test]
    fn report_flags_unclassified_remainder() {
        let tickets = vec![ticket("Open"), ticket("Something Weird")];
        let report = render_report(&tickets);
        assert!(report.contains("TOTAL: 2"));
        assert!(report.contains("Unclassified: 1"));
    }

    #[test]
    fn report_omits_unclassified_when_everything_matches() {
        let report = render_report(&[ticket("Open")]);
        assert!(!report.contains("Unclassified"));
    }

    #[test]
    fn prompt_truncates_description_and_defaults_assignee() {
        let mut long = ticket("Open");
        long.short_description = "x".repeat(200);
        let prompt = build_analysis_prompt(&[long]);
        assert!(prompt.contains("Total: 1"));
        assert!(prompt.contains("INC001|Open|Unassigned|"));
        assert!(prompt.contains(&"x".repeat(80)));
        assert!(!prompt.contains(&"x".repeat(81)));
    }
}
