//! INSERT statement parser.
//!
//! Parses `INSERT INTO table [(cols)] VALUES (...), (...);` and records the
//! byte span of every value so passes can splice replacements in place.

/// A single value from a VALUES tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// Unquoted NULL
    Null,
    /// Quoted string literal, unescaped
    Str(String),
    /// Anything else (numbers, function calls, casts), raw text
    Other(String),
}

impl SqlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// A value and where it sits in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpan {
    pub start: usize,
    pub end: usize,
    pub value: SqlValue,
}

/// A parsed INSERT statement. Offsets are relative to the document.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    /// Byte offset just past the statement
    pub end: usize,
    /// Table reference with quoting removed, schema kept
    pub table: String,
    /// Explicit column list, if the statement has one
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<ValueSpan>>,
}

impl InsertStatement {
    /// Table name without schema qualifier
    pub fn table_name(&self) -> &str {
        self.table.rsplit('.').next().unwrap_or(&self.table)
    }

    /// Index of a column in the column list, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .as_ref()?
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Parser for a single INSERT statement starting at `pos`
pub struct InsertParser<'a> {
    stmt: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> InsertParser<'a> {
    /// Create a parser over `text`, positioned at the `INSERT` keyword
    pub fn new(text: &'a str, pos: usize) -> Self {
        Self {
            stmt: text.as_bytes(),
            text,
            pos,
        }
    }

    /// Parse the statement
    pub fn parse(mut self) -> anyhow::Result<InsertStatement> {
        self.expect_keyword("INSERT")?;
        self.skip_whitespace();
        self.expect_keyword("INTO")?;
        self.skip_whitespace();

        let table = self.parse_table_name()?;
        self.skip_whitespace();

        let columns = if self.peek() == Some(b'(') {
            Some(self.parse_column_list()?)
        } else {
            None
        };
        self.skip_whitespace();

        self.expect_keyword("VALUES")?;

        let mut rows = Vec::new();
        loop {
            self.skip_whitespace();
            rows.push(self.parse_row()?);
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b';') => {
                    self.pos += 1;
                    break;
                }
                _ => break,
            }
        }

        Ok(InsertStatement {
            end: self.pos,
            table,
            columns,
            rows,
        })
    }

    fn peek(&self) -> Option<u8> {
        self.stmt.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.stmt.len() && self.stmt[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> anyhow::Result<()> {
        let end = self.pos + keyword.len();
        if end <= self.stmt.len()
            && self.stmt[self.pos..end].eq_ignore_ascii_case(keyword.as_bytes())
            && self
                .stmt
                .get(end)
                .map_or(true, |b| !b.is_ascii_alphanumeric() && *b != b'_')
        {
            self.pos = end;
            Ok(())
        } else {
            anyhow::bail!("expected {} at offset {}", keyword, self.pos)
        }
    }

    /// Parse `[schema.]table`, each part optionally quoted
    fn parse_table_name(&mut self) -> anyhow::Result<String> {
        let start = self.pos;
        while self.pos < self.stmt.len() {
            match self.stmt[self.pos] {
                b'"' | b'`' => {
                    let quote = self.stmt[self.pos];
                    self.pos += 1;
                    while self.pos < self.stmt.len() && self.stmt[self.pos] != quote {
                        self.pos += 1;
                    }
                    self.pos += 1;
                }
                b if b.is_ascii_whitespace() || b == b'(' || b == b';' => break,
                _ => self.pos += 1,
            }
        }
        let end = self.pos.min(self.stmt.len());
        if end == start {
            anyhow::bail!("INSERT statement missing table name");
        }
        Ok(unquote_identifier(&self.text[start..end]))
    }

    fn parse_column_list(&mut self) -> anyhow::Result<Vec<String>> {
        self.pos += 1; // Skip '('
        let start = self.pos;
        while self.pos < self.stmt.len() && self.stmt[self.pos] != b')' {
            self.pos += 1;
        }
        if self.pos >= self.stmt.len() {
            anyhow::bail!("unterminated column list");
        }
        let list = &self.text[start..self.pos];
        self.pos += 1; // Skip ')'

        Ok(list
            .split(',')
            .map(|c| unquote_identifier(c.trim()))
            .collect())
    }

    /// Parse a single row "(val1, val2, ...)"
    fn parse_row(&mut self) -> anyhow::Result<Vec<ValueSpan>> {
        if self.peek() != Some(b'(') {
            anyhow::bail!("expected '(' at offset {}", self.pos);
        }
        self.pos += 1;

        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b')') && values.is_empty() {
                self.pos += 1;
                return Ok(values);
            }

            values.push(self.parse_value()?);
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(values);
                }
                _ => anyhow::bail!("unterminated value list at offset {}", self.pos),
            }
        }
    }

    /// Parse a single value (string, NULL, or raw expression)
    fn parse_value(&mut self) -> anyhow::Result<ValueSpan> {
        let start = self.pos;

        if self.peek() == Some(b'\'') {
            let decoded = self.parse_string_literal()?;
            let after_literal = self.pos;
            self.skip_whitespace();
            if matches!(self.peek(), Some(b',') | Some(b')')) {
                return Ok(ValueSpan {
                    start,
                    end: after_literal,
                    value: SqlValue::Str(decoded),
                });
            }
            // Literal followed by a cast or operator: treat as an expression
            self.pos = after_literal;
        }

        let end = self.scan_expression()?;
        let raw = self.text[start..end].trim_end();
        let end = start + raw.len();

        let value = if raw.eq_ignore_ascii_case("NULL") {
            SqlValue::Null
        } else {
            SqlValue::Other(raw.to_string())
        };

        Ok(ValueSpan { start, end, value })
    }

    /// Advance to the next top-level ',' or ')' and return its offset
    fn scan_expression(&mut self) -> anyhow::Result<usize> {
        let mut depth = 0usize;
        while self.pos < self.stmt.len() {
            match self.stmt[self.pos] {
                b'\'' => {
                    self.parse_string_literal()?;
                    continue;
                }
                b'(' => depth += 1,
                b')' if depth == 0 => return Ok(self.pos),
                b')' => depth -= 1,
                b',' if depth == 0 => return Ok(self.pos),
                _ => {}
            }
            self.pos += 1;
        }
        anyhow::bail!("unterminated value list")
    }

    /// Parse a string literal 'value', handling '' and backslash escapes
    fn parse_string_literal(&mut self) -> anyhow::Result<String> {
        self.pos += 1; // Skip opening quote

        let mut value = Vec::new();
        let mut escape_next = false;

        while self.pos < self.stmt.len() {
            let b = self.stmt[self.pos];

            if escape_next {
                let escaped = match b {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'0' => 0,
                    _ => b,
                };
                value.push(escaped);
                escape_next = false;
                self.pos += 1;
            } else if b == b'\\' {
                escape_next = true;
                self.pos += 1;
            } else if b == b'\'' {
                if self.stmt.get(self.pos + 1) == Some(&b'\'') {
                    value.push(b'\'');
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&value).into_owned());
                }
            } else {
                value.push(b);
                self.pos += 1;
            }
        }

        anyhow::bail!("unterminated string literal")
    }
}

/// Strip double quotes and backticks from an identifier
pub fn unquote_identifier(ident: &str) -> String {
    ident.chars().filter(|c| *c != '"' && *c != '`').collect()
}
