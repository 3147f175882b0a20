//! Recursive-descent JSON parser.
//!
//! Produces a borrowed value tree: numbers, strings and member names are
//! slices of the input, still escaped. Decoding escapes is left to whoever
//! renders the final schema, the inference core only needs structure and the
//! Integer/Real split (decided here, by the presence of `.` or an exponent).
use crate::error::{ParseError, ParseErrorKind};

/// Containers nested deeper than this are rejected instead of recursing.
/// The schema builder recurses once per container too, so this also bounds
/// its stack use; it has to fit a spawned thread's default 2 MiB stack.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue<'a> {
    Null,
    Bool(bool),
    Integer(&'a str),
    Real(&'a str),
    /// Raw text between the quotes, escapes untouched.
    String(&'a str),
    Array(Vec<JsonValue<'a>>),
    /// Members in document order; duplicate names are kept.
    Object(Vec<(&'a str, JsonValue<'a>)>),
}

impl<'a> JsonValue<'a> {
    pub fn type_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Integer(_) => "integer",
            JsonValue::Real(_) => "real",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue<'a>> {
        match self {
            JsonValue::Object(members) => members.iter().find(|(k, _)| *k == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Parse exactly one JSON value (surrounding whitespace allowed).
pub fn parse(text: &str) -> Result<JsonValue<'_>, ParseError> {
    let mut parser = Parser::new(text);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(parser.error(ParseErrorKind::TrailingCharacters));
    }
    Ok(value)
}

// ------------------------------- Parser ----------------------------------- //

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, bytes: src.as_bytes(), pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<u8> { self.bytes.get(self.pos).copied() }

    fn error(&self, kind: ParseErrorKind) -> ParseError { ParseError::new(self.pos, kind) }

    /// Error for whatever sits at the cursor: end of input or a stray char.
    fn unexpected(&self) -> ParseError {
        match self.src.get(self.pos..).and_then(|rest| rest.chars().next()) {
            None => self.error(ParseErrorKind::UnexpectedEnd),
            Some(c) => self.error(ParseErrorKind::UnexpectedCharacter(c)),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<JsonValue<'a>, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string().map(JsonValue::String),
            Some(b't') => self.parse_literal("true", JsonValue::Bool(true)),
            Some(b'f') => self.parse_literal("false", JsonValue::Bool(false)),
            Some(b'n') => self.parse_literal("null", JsonValue::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_literal(&mut self, word: &'static str, value: JsonValue<'a>) -> Result<JsonValue<'a>, ParseError> {
        if self.bytes[self.pos..].starts_with(word.as_bytes()) {
            self.pos += word.len();
            Ok(value)
        } else {
            Err(self.error(ParseErrorKind::Expected(word)))
        }
    }

    /// Cursor is on the opening quote. Returns the raw text between quotes.
    fn parse_string(&mut self) -> Result<&'a str, ParseError> {
        let open = self.pos;
        let start = open + 1;
        let mut escaped = false;
        for (i, &b) in self.bytes[start..].iter().enumerate() {
            match b {
                b'"' if !escaped => {
                    let end = start + i;
                    self.pos = end + 1;
                    return Ok(&self.src[start..end]);
                }
                b'\\' => escaped = !escaped,
                _ => escaped = false,
            }
        }
        Err(ParseError::new(open, ParseErrorKind::UnclosedString))
    }

    fn parse_digits(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(ParseErrorKind::ExpectedDigits));
        }
        Ok(())
    }

    fn parse_number(&mut self) -> Result<JsonValue<'a>, ParseError> {
        let start = self.pos;
        let mut real = false;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        self.parse_digits()?;
        if self.peek() == Some(b'.') {
            real = true;
            self.pos += 1;
            self.parse_digits()?;
        }
        if let Some(b'e' | b'E') = self.peek() {
            real = true;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            self.parse_digits()?;
        }
        let raw = &self.src[start..self.pos];
        Ok(if real { JsonValue::Real(raw) } else { JsonValue::Integer(raw) })
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(ParseErrorKind::DepthLimitExceeded(MAX_DEPTH)));
        }
        Ok(())
    }

    fn parse_array(&mut self) -> Result<JsonValue<'a>, ParseError> {
        self.enter()?;
        self.pos += 1; // '['
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(JsonValue::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some(_) => return Err(self.error(ParseErrorKind::MissingSeparator(']'))),
            }
        }
        self.depth -= 1;
        Ok(JsonValue::Array(items))
    }

    fn parse_object(&mut self) -> Result<JsonValue<'a>, ParseError> {
        self.enter()?;
        self.pos += 1; // '{'
        let mut members = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(JsonValue::Object(members));
        }
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'"') => {}
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some(_) => return Err(self.error(ParseErrorKind::Expected("member name"))),
            }
            let name = self.parse_string()?;
            self.skip_whitespace();
            match self.peek() {
                Some(b':') => self.pos += 1,
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some(_) => return Err(self.error(ParseErrorKind::MissingColon)),
            }
            let value = self.parse_value()?;
            members.push((name, value));
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                Some(_) => return Err(self.error(ParseErrorKind::MissingSeparator('}'))),
            }
        }
        self.depth -= 1;
        Ok(JsonValue::Object(members))
    }
}

// ------------------------------- Tests ------------------------------------ //
