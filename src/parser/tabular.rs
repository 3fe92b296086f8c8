//! Delimiter-tolerant parser for export payloads.
//!
//! Export endpoints hand back comma- or tab-separated text depending on the
//! instance's separator setting, sometimes both in the same document, so this
//! accepts either delimiter on every row instead of sniffing one up front.

/// Splits raw delimited text into rows of fields.
///
/// `"`-quoting makes delimiters and newlines literal; `""` inside quotes is an
/// escaped quote. Bare `\r` is dropped wherever it appears. An unterminated
/// quote is absorbed into the final field rather than treated as an error, and
/// a trailing row without a newline is still emitted.
pub fn parse_delimited(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' | '\t' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\r' => {}
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_rows() {
        let rows = parse_delimited("number,state\nINC001,Open\nINC002,Closed\n");
        assert_eq!(
            rows,
            vec![
                vec!["number", "state"],
                vec!["INC001", "Open"],
                vec!["INC002", "Closed"],
            ]
        );
    }

    #[test]
    fn quoted_delimiter_stays_in_field() {
        let rows = parse_delimited("a,\"b,c\",d");
        assert_eq!(rows, vec![vec!["a", "b,c", "d"]]);
    }

    #[test]
    fn quoted_newline_stays_in_field() {
        let rows = parse_delimited("id,note\nINC001,\"line one\nline two\"");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["INC001", "line one\nline two"]);
    }

    #[test]
    fn doubled_quote_is_literal_quote() {
        let rows = parse_delimited("\"say \"\"hi\"\"\",x");
        assert_eq!(rows, vec![vec!["say \"hi\"", "x"]]);
    }

    #[test]
    fn accepts_tab_delimiter() {
        let rows = parse_delimited("number\tstate\nINC001\tOpen");
        assert_eq!(rows, vec![vec!["number", "state"], vec!["INC001", "Open"]]);
    }

    #[test]
    fn strips_carriage_returns() {
        let rows = parse_delimited("a,b\r\nc,d\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(parse_delimited("").is_empty());
    }

    #[test]
    fn trailing_partial_row_is_emitted() {
        let rows = parse_delimited("a,b\nc,d");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn unterminated_quote_is_absorbed() {
        let rows = parse_delimited("a,\"unclosed,rest\nof it");
        assert_eq!(rows, vec![vec!["a", "unclosed,rest\nof it"]]);
    }

    #[test]
    fn empty_fields_survive() {
        let rows = parse_delimited("a,,c\n,,");
        assert_eq!(rows, vec![vec!["a", "", "c"], vec!["", "", ""]]);
    }
}
