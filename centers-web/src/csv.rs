//! Minimal CSV codec for uploads, template and audit export
//!
//! Handles quoted fields, escaped quotes, CR/LF line endings and a UTF-8 BOM.

/// Strip a leading UTF-8 byte order mark if present
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Parse CSV text into records of fields
///
/// Empty lines between records are skipped. A trailing newline does not
/// produce an empty record.
pub fn parse(text: &str) -> Vec<Vec<String>> {
    let text = strip_bom(text);
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => {
                record.push(std::mem::take(&mut field));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_record(&mut records, &mut record, &mut field);
            }
            '\n' => {
                end_record(&mut records, &mut record, &mut field);
            }
            _ => field.push(c),
        }
    }

    end_record(&mut records, &mut record, &mut field);

    records
}

fn end_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    if record.is_empty() && field.is_empty() {
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}

/// Escape a single field for CSV output
pub fn escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write one CSV record line from fields
pub fn write_record(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_records() {
        let records = parse("a,b,c\n1,2,3\n");
        assert_eq!(records, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn strips_utf8_bom() {
        let records = parse("\u{feff}a,b\n1,2\n");
        assert_eq!(records[0], vec!["a", "b"]);
    }

    #[test]
    fn handles_crlf_and_blank_lines() {
        let records = parse("a,b\r\n\r\n1,2\r\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], vec!["1", "2"]);
    }

    #[test]
    fn handles_quoted_fields() {
        let records = parse("name,notes\n\"Doe, John\",\"said \"\"hi\"\"\"\n");
        assert_eq!(records[1], vec!["Doe, John", "said \"hi\""]);
    }

    #[test]
    fn preserves_empty_fields() {
        let records = parse("a,,c\n");
        assert_eq!(records[0], vec!["a", "", "c"]);
    }

    #[test]
    fn escape_round_trip() {
        let line = write_record(&["plain", "with,comma", "with \"quote\""]);
        let records = parse(&line);
        assert_eq!(records[0], vec!["plain", "with,comma", "with \"quote\""]);
    }
}
