//! Minimal CSV field quoting and record parsing for the ledger.

/// Quote a field if it contains a separator, quote or line break
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV line (without the line terminator)
pub fn format_record<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split CSV text into records.
///
/// Quoted fields may contain separators, doubled quotes and line breaks.
/// Blank lines are skipped. `\r\n` and `\n` both end a record.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if field_started || !field.is_empty() || !record.is_empty() {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                field_started = false;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if field_started || !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(escape_field("Iriya"), "Iriya");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn special_fields_are_quoted() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn parses_quoted_records() {
        let text = "a,b,c\r\n\"x,1\",\"he said \"\"no\"\"\",\"multi\nline\"\n\n1,,3\n";
        let records = parse_records(text);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], vec!["a", "b", "c"]);
        assert_eq!(records[1], vec!["x,1", "he said \"no\"", "multi\nline"]);
        assert_eq!(records[2], vec!["1", "", "3"]);
    }

    #[test]
    fn last_record_without_newline_is_kept() {
        let records = parse_records("a,b\n1,2");
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn formatted_records_parse_back() {
        let fields = ["2026-01-15 09:00:00", "", "OK", "E: - My, Book", "\"q\""];
        let line = format!("{}\n", format_record(&fields));
        assert_eq!(parse_records(&line), vec![fields.to_vec()]);
    }
}
