//! Parser for the OpenStep property-list dialect used by `project.pbxproj`.
//!
//! The grammar is small: dictionaries `{ key = value; }`, arrays `( a, b, )`,
//! quoted strings with C-style escapes, and bare tokens. Block and line
//! comments may appear between any two tokens; Xcode uses them for the UTF-8
//! header and for object-reference annotations, and both are regenerated on
//! write, so the parser simply discards them.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use super::value::{Dict, Value};

/// A parse failure with the offending location in the document.
#[derive(Debug, Error, Diagnostic)]
#[error("failed to parse project document: {message}")]
#[diagnostic(code(depod::pbxproj::parse))]
pub struct ParseError {
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: SourceSpan,
}

impl ParseError {
    fn new(message: impl Into<String>, name: &str, source: &str, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            src: NamedSource::new(name, source.to_string()),
            span: SourceSpan::from(offset.min(source.len())),
        }
    }
}

/// Parse a pbxproj document into its root dictionary.
pub fn parse(source: &str, name: &str) -> Result<Dict, ParseError> {
    let mut parser = Parser {
        source,
        name,
        bytes: source.as_bytes(),
        pos: 0,
    };
    parser.skip_trivia();
    let root = match parser.parse_value()? {
        Value::Dict(d) => d,
        other => {
            return Err(parser.error(format!("expected a dictionary at top level, found {}", other)))
        }
    };
    parser.skip_trivia();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("trailing content after top-level dictionary"));
    }
    Ok(root)
}

struct Parser<'a> {
    source: &'a str,
    name: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.name, self.source, self.pos)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() {
                        if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        self.skip_trivia();
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected `{}`, found `{}`",
                byte as char, b as char
            ))),
            None => Err(self.error(format!(
                "expected `{}`, found end of document",
                byte as char
            ))),
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_trivia();
        match self.peek() {
            Some(b'{') => self.parse_dict().map(Value::Dict),
            Some(b'(') => self.parse_array().map(Value::Array),
            Some(b'"') => self.parse_quoted_string().map(Value::String),
            Some(_) => self.parse_bare_token().map(Value::String),
            None => Err(self.error("expected a value, found end of document")),
        }
    }

    fn parse_dict(&mut self) -> Result<Dict, ParseError> {
        self.expect(b'{')?;
        let mut dict = Dict::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(dict);
                }
                Some(_) => {
                    let key = self.parse_key()?;
                    self.expect(b'=')?;
                    let value = self.parse_value()?;
                    self.expect(b';')?;
                    dict.insert(key, value);
                }
                None => return Err(self.error("unterminated dictionary")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, ParseError> {
        self.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b')') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => {
                    items.push(self.parse_value()?);
                    self.skip_trivia();
                    // Separators are commas; a trailing comma before `)` is fine.
                    if self.peek() == Some(b',') {
                        self.pos += 1;
                    }
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, ParseError> {
        self.skip_trivia();
        match self.peek() {
            Some(b'"') => self.parse_quoted_string(),
            Some(_) => self.parse_bare_token(),
            None => Err(self.error("expected a dictionary key, found end of document")),
        }
    }

    fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.bump() {
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'r') => out.push('\r'),
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'\'') => out.push('\''),
                    Some(b'U') => {
                        let mut code = 0u32;
                        let mut digits = 0;
                        while digits < 4 {
                            match self.peek().and_then(|b| (b as char).to_digit(16)) {
                                Some(d) => {
                                    code = code * 16 + d;
                                    self.pos += 1;
                                    digits += 1;
                                }
                                None => break,
                            }
                        }
                        if digits == 0 {
                            return Err(self.error("invalid \\U escape in string"));
                        }
                        out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                    }
                    Some(other) => {
                        // Unknown escapes pass the character through, as the
                        // original plist readers do.
                        out.push(other as char);
                    }
                    None => return Err(self.error("unterminated string escape")),
                },
                Some(b) if b < 0x80 => out.push(b as char),
                Some(b) => {
                    // Re-decode a multi-byte UTF-8 sequence from the source.
                    let start = self.pos - 1;
                    let width = utf8_width(b);
                    let end = (start + width).min(self.bytes.len());
                    match std::str::from_utf8(&self.bytes[start..end]) {
                        Ok(s) => {
                            out.push_str(s);
                            self.pos = end;
                        }
                        Err(_) => return Err(self.error("invalid UTF-8 in string")),
                    }
                }
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_bare_token(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !is_bare_token_byte(b) {
                break;
            }
            // A slash only continues a token when it does not open a comment.
            if b == b'/' && matches!(self.peek_at(1), Some(b'/') | Some(b'*')) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!(
                "unexpected character `{}`",
                self.peek().map(|b| b as char).unwrap_or('\0')
            )));
        }
        Ok(self.source[start..self.pos].to_string())
    }
}

fn is_bare_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b':' | b'.' | b'-' | b'+')
}

fn utf8_width(first: u8) -> usize {
    match first {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}
