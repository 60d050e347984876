//! Delimited record parsing for `read_record`.

/// Delimiter, quote and escape characters of a delimited record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFormat {
    pub delimiter: u8,
    pub quote: u8,
    /// Inside a quoted field, the byte after `escape` is taken literally.
    pub escape: Option<u8>,
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: Some(b'\\'),
        }
    }
}

impl RecordFormat {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_escape(mut self, escape: Option<u8>) -> Self {
        self.escape = escape;
        self
    }

    /// Whether `raw` ends inside a quoted field, meaning the record continues
    /// on the next line.
    pub fn is_incomplete(&self, raw: &[u8]) -> bool {
        self.scan(raw).1
    }

    /// Split one record into fields.
    ///
    /// A trailing line terminator is ignored. Doubled quotes inside a quoted
    /// field produce a single quote. An unterminated quoted field runs to the
    /// end of the input.
    pub fn parse(&self, raw: &[u8]) -> Vec<String> {
        self.scan(raw).0
    }

    fn scan(&self, raw: &[u8]) -> (Vec<String>, bool) {
        let raw = strip_terminator(raw);

        let mut fields = Vec::new();
        let mut field: Vec<u8> = Vec::new();
        let mut in_quotes = false;
        let mut at_field_start = true;
        let mut i = 0;

        while i < raw.len() {
            let c = raw[i];

            if at_field_start {
                at_field_start = false;
                if c == self.quote {
                    in_quotes = true;
                    i += 1;
                    continue;
                }
            }

            if in_quotes {
                match self.escape {
                    Some(escape) if escape != self.quote && c == escape && i + 1 < raw.len() => {
                        field.push(c);
                        field.push(raw[i + 1]);
                        i += 2;
                        continue;
                    }
                    _ => {}
                }
                if c == self.quote {
                    if raw.get(i + 1) == Some(&self.quote) {
                        field.push(self.quote);
                        i += 2;
                    } else {
                        in_quotes = false;
                        i += 1;
                    }
                    continue;
                }
                field.push(c);
            } else if c == self.delimiter {
                fields.push(String::from_utf8_lossy(&field).into_owned());
                field.clear();
                at_field_start = true;
            } else {
                field.push(c);
            }
            i += 1;
        }

        fields.push(String::from_utf8_lossy(&field).into_owned());
        (fields, in_quotes)
    }
}

fn strip_terminator(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}
