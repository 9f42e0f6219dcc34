//! Tolerant parser for assignment payloads.
//!
//! Object payloads look like JSON but leaf values may be bare tokens such as
//! `BLOB(5 bytes)` or `3.14`. Anything that does not parse as an object is
//! treated as a scalar by the caller.

/// One parsed payload value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValue {
    /// `{"k": v, ...}`, fields in log order
    Object(Vec<(String, PayloadValue)>),
    /// Quoted string, quotes removed
    Str(String),
    /// Any other token, kept verbatim
    Raw(String),
}

/// Parse an object payload; `None` if the text is not an object
#[must_use]
pub fn parse_object(text: &str) -> Option<Vec<(String, PayloadValue)>> {
    let mut parser = Parser::new(text.trim());
    let fields = parser.object()?;
    parser.skip_ws();
    parser.at_end().then_some(fields)
}

/// Render a scalar payload for display: `"x"` becomes `'x'`
#[must_use]
pub fn display_scalar(raw: &str) -> String {
    match unquote(raw) {
        Some(inner) => format!("'{inner}'"),
        None => raw.to_string(),
    }
}

fn unquote(raw: &str) -> Option<&str> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn object(&mut self) -> Option<Vec<(String, PayloadValue)>> {
        self.skip_ws();
        if !self.eat('{') {
            return None;
        }
        let mut fields = Vec::new();
        self.skip_ws();
        if self.eat('}') {
            return Some(fields);
        }
        loop {
            self.skip_ws();
            let key = if self.peek() == Some('"') {
                self.string()?
            } else {
                self.bare_key()?
            };
            self.skip_ws();
            if !self.eat(':') {
                return None;
            }
            let value = self.value()?;
            fields.push((key, value));
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Some(fields);
            }
            return None;
        }
    }

    fn value(&mut self) -> Option<PayloadValue> {
        self.skip_ws();
        match self.peek()? {
            '{' => self.object().map(PayloadValue::Object),
            '"' => self.string().map(PayloadValue::Str),
            _ => self.raw(),
        }
    }

    fn string(&mut self) -> Option<String> {
        if !self.eat('"') {
            return None;
        }
        let mut out = String::new();
        loop {
            match self.bump()? {
                '"' => return Some(out),
                '\\' => {
                    let escaped = self.bump()?;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                c => out.push(c),
            }
        }
    }

    fn bare_key(&mut self) -> Option<String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ':' && c != ',' && c != '}') {
            self.bump();
        }
        let key = self.text[start..self.pos].trim();
        (!key.is_empty()).then(|| key.to_string())
    }

    /// Bare token up to the next `,` or `}` outside brackets and quotes
    fn raw(&mut self) -> Option<PayloadValue> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut in_quotes = false;
        while let Some(c) = self.peek() {
            if in_quotes {
                if c == '\\' {
                    self.bump();
                } else if c == '"' {
                    in_quotes = false;
                }
            } else {
                match c {
                    '"' => in_quotes = true,
                    '(' | '[' | '{' => depth += 1,
                    ')' | ']' => depth = depth.saturating_sub(1),
                    '}' if depth > 0 => depth -= 1,
                    ',' | '}' if depth == 0 => break,
                    _ => {}
                }
            }
            self.bump();
        }
        let token = self.text[start..self.pos].trim();
        (!token.is_empty()).then(|| PayloadValue::Raw(token.to_string()))
    }
}
