//! CSV tokenizer
//!
//! A two-state scanner over the file text. Quoting is looser than RFC 4180:
//! a `"` toggles quoting anywhere in a field, so `ab"c,d"e` reads as the
//! single field `abc,de`. Existing data relies on this, so it stays.

use std::iter::Peekable;
use std::str::Chars;

/// One row of raw fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-indexed line the row starts on
    pub line: usize,

    /// Raw field text, quotes removed
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unquoted,
    Quoted,
}

/// Single-pass row iterator over CSV text
pub struct CsvReader<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> CsvReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    /// Consume a `\n` following a `\r`, so `\r\n` counts as one break
    fn skip_lf_after_cr(&mut self, c: char) {
        if c == '\r' && self.chars.peek() == Some(&'\n') {
            self.chars.next();
        }
    }
}

impl Iterator for CsvReader<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let line = self.line;
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut state = State::Unquoted;
        let mut pending = false;

        while let Some(c) = self.chars.next() {
            pending = true;

            match state {
                State::Unquoted => match c {
                    '"' => state = State::Quoted,
                    ',' => fields.push(std::mem::take(&mut field)),
                    '\r' | '\n' => {
                        self.skip_lf_after_cr(c);
                        self.line += 1;
                        fields.push(field);
                        return Some(Record { line, fields });
                    }
                    _ => field.push(c),
                },
                State::Quoted => match c {
                    '"' if self.chars.peek() == Some(&'"') => {
                        self.chars.next();
                        field.push('"');
                    }
                    '"' => state = State::Unquoted,
                    '\r' | '\n' => {
                        field.push(c);
                        if c == '\r' && self.chars.peek() == Some(&'\n') {
                            if let Some(lf) = self.chars.next() {
                                field.push(lf);
                            }
                        }
                        self.line += 1;
                    }
                    _ => field.push(c),
                },
            }
        }

        if pending {
            fields.push(field);
            Some(Record { line, fields })
        } else {
            None
        }
    }
}

/// Tokenize a whole text into rows of raw fields
pub fn read_rows(text: &str) -> Vec<Vec<String>> {
    CsvReader::new(text).map(|r| r.fields).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expect(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn simple_rows() {
        assert_eq!(read_rows("a,b\n1,2\n"), expect(&[&["a", "b"], &["1", "2"]]));
    }

    #[test]
    fn crlf_is_one_terminator() {
        assert_eq!(read_rows("a,b\r\n1,2\r\n"), expect(&[&["a", "b"], &["1", "2"]]));
    }

    #[test]
    fn lone_cr_ends_a_row() {
        assert_eq!(read_rows("a\rb"), expect(&[&["a"], &["b"]]));
    }

    #[test]
    fn last_row_without_newline_is_flushed() {
        assert_eq!(read_rows("a,b\n1,"), expect(&[&["a", "b"], &["1", ""]]));
    }

    #[test]
    fn empty_line_is_an_empty_row() {
        assert_eq!(read_rows("a\n\nb\n"), expect(&[&["a"], &[""], &["b"]]));
    }

    #[test]
    fn empty_input_has_no_rows() {
        assert!(read_rows("").is_empty());
    }

    #[test]
    fn quoted_comma_and_doubled_quote() {
        assert_eq!(
            read_rows("\"a,b\",\"say \"\"hi\"\"\"\n"),
            expect(&[&["a,b", "say \"hi\""]])
        );
    }

    #[test]
    fn quoting_can_toggle_mid_field() {
        assert_eq!(read_rows("ab\"c,d\"e,f"), expect(&[&["abc,de", "f"]]));
    }

    #[test]
    fn quoted_newline_is_literal() {
        let records: Vec<Record> = CsvReader::new("h\n\"x\ny\"\nz\n").collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].fields, vec!["x\ny".to_string()]);
        assert_eq!(records[1].line, 2);
        assert_eq!(records[2].line, 4);
    }

    #[test]
    fn quoted_empty_field_at_end_is_flushed() {
        assert_eq!(read_rows("a,\"\""), expect(&[&["a", ""]]));
    }
}
