use caption_core::CaptionResult;
use serde_json::{Map, Number, Value};

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("model returned no text")]
    Empty,
    #[error("no JSON object could be recovered: {message}")]
    Unrecoverable { message: String },
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Turns raw model text into a validated caption record.
pub trait ResponseRepairer: Send + Sync {
    fn repair(&self, raw: &str) -> Result<CaptionResult, ParseFailure>;
}

/// Strict-then-tolerant repairer:
/// - strips code fences (tagged or not, any number of them)
/// - tries `serde_json` on what is left
/// - otherwise rebuilds the first `{`/`[` structure leniently and parses that
/// - requires `description` (string) and `tags` (array of strings).
#[derive(Debug, Default, Clone, Copy)]
pub struct TolerantJsonRepairer;

impl ResponseRepairer for TolerantJsonRepairer {
    fn repair(&self, raw: &str) -> Result<CaptionResult, ParseFailure> {
        let cleaned = strip_code_fences(raw);
        if cleaned.is_empty() {
            return Err(ParseFailure::Empty);
        }

        let value = match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => value,
            Err(strict_err) => {
                let repaired =
                    repair_json(&cleaned).ok_or_else(|| ParseFailure::Unrecoverable {
                        message: strict_err.to_string(),
                    })?;
                serde_json::from_str::<Value>(&repaired).map_err(|err| {
                    ParseFailure::Unrecoverable {
                        message: err.to_string(),
                    }
                })?
            }
        };

        validate(value)
    }
}

/// Removes every code-fence marker plus its optional info string, then trims.
pub fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find(FENCE) {
        out.push_str(&rest[..idx]);
        let after = rest[idx..].trim_start_matches('`');
        let tag_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
            .unwrap_or(after.len());
        rest = after[tag_len..].trim_start();
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Best-effort rewrite of near-JSON into strict JSON text.
///
/// Returns `None` when the input holds no object or array opener at all.
pub fn repair_json(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;
    let mut parser = LenientParser::new(&text[start..]);
    let value = parser.parse_value()?;
    if parser.too_deep {
        return None;
    }
    serde_json::to_string(&value).ok()
}

fn validate(value: Value) -> Result<CaptionResult, ParseFailure> {
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(ParseFailure::NotAnObject {
                found: kind_name(&other),
            })
        }
    };

    let description = match object.remove("description") {
        None => return Err(ParseFailure::MissingField("description")),
        Some(Value::String(text)) => text,
        Some(_) => {
            return Err(ParseFailure::WrongType {
                field: "description",
                expected: "a string",
            })
        }
    };

    let tags = match object.remove("tags") {
        None => return Err(ParseFailure::MissingField("tags")),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(tag) => Ok(tag),
                _ => Err(ParseFailure::WrongType {
                    field: "tags",
                    expected: "an array of strings",
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ParseFailure::WrongType {
                field: "tags",
                expected: "an array of strings",
            })
        }
    };

    Ok(CaptionResult { description, tags })
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Recursive-descent reader that accepts the usual near-misses: trailing or
/// missing commas, unquoted keys and values, single quotes, comments,
/// Python-style literals and structures cut off at end of input.
///
/// Nesting stops at [`MAX_DEPTH`]; deeper input is unrecoverable.
struct LenientParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    too_deep: bool,
}

/// Same nesting limit `serde_json` applies.
const MAX_DEPTH: usize = 128;

impl LenientParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
            too_deep: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    while self.peek().is_some() && !(self.peek() == Some('*') && self.peek_at(1) == Some('/')) {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.chars.len());
                }
                _ => break,
            }
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        self.skip_trivia();
        match self.peek()? {
            '{' | '[' => self.parse_nested(),
            '"' | '\'' => Some(Value::String(self.parse_string())),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => Some(self.parse_number()),
            '}' | ']' | ',' | ':' => None,
            _ => Some(self.parse_bareword()),
        }
    }

    fn parse_nested(&mut self) -> Option<Value> {
        if self.depth >= MAX_DEPTH {
            self.too_deep = true;
            return None;
        }
        self.depth += 1;
        let value = match self.peek() {
            Some('{') => self.parse_object(),
            _ => self.parse_array(),
        };
        self.depth -= 1;
        Some(value)
    }

    fn parse_object(&mut self) -> Value {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                    continue;
                }
                // A stray closing bracket ends the object it was meant for.
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }

            let before = self.pos;
            let key = match self.peek() {
                Some('"' | '\'') => self.parse_string(),
                _ => self.read_until(|c| matches!(c, ':' | ',' | '{' | '}' | '[' | ']')),
            };
            self.skip_trivia();
            if self.peek() == Some(':') {
                self.pos += 1;
            }
            let value = self.parse_value().unwrap_or(Value::Null);
            if self.too_deep {
                break;
            }
            if !key.is_empty() {
                map.insert(key, value);
            }
            if self.pos == before {
                // Unrecognised character; drop it so the loop always advances.
                self.pos += 1;
            }
        }
        Value::Object(map)
    }

    fn parse_array(&mut self) -> Value {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                    continue;
                }
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            let before = self.pos;
            if let Some(value) = self.parse_value() {
                items.push(value);
            }
            if self.too_deep {
                break;
            }
            if self.pos == before {
                self.pos += 1;
            }
        }
        Value::Array(items)
    }

    fn parse_string(&mut self) -> String {
        let quote = self.peek().unwrap_or('"');
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => self.read_escape(&mut out),
                c if c == quote => {
                    if self.closes_string() {
                        return out;
                    }
                    // Unescaped quote inside the text.
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        // Unterminated: end of input closes the string.
        out
    }

    /// A quote ends the string only when what follows could continue the
    /// surrounding structure.
    fn closes_string(&self) -> bool {
        let mut idx = self.pos;
        while let Some(c) = self.chars.get(idx) {
            if c.is_whitespace() {
                idx += 1;
                continue;
            }
            return matches!(c, ',' | ':' | '}' | ']' | '/');
        }
        true
    }

    fn read_escape(&mut self, out: &mut String) {
        let Some(escaped) = self.peek() else {
            return;
        };
        self.pos += 1;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'u' => {
                let high = self.read_hex4();
                let code = match high {
                    Some(high @ 0xD800..=0xDBFF)
                        if self.peek() == Some('\\') && self.peek_at(1) == Some('u') =>
                    {
                        self.pos += 2;
                        match self.read_hex4() {
                            Some(low @ 0xDC00..=0xDFFF) => {
                                Some(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
                            }
                            _ => None,
                        }
                    }
                    other => other,
                };
                out.push(code.and_then(char::from_u32).unwrap_or('\u{FFFD}'));
            }
            other => out.push(other),
        }
    }

    fn read_hex4(&mut self) -> Option<u32> {
        let end = self.pos + 4;
        if end > self.chars.len() {
            return None;
        }
        let digits: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&digits, 16).ok()?;
        self.pos = end;
        Some(code)
    }

    fn parse_number(&mut self) -> Value {
        let token = self.read_until(|c| {
            !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        });
        let normalized = token.trim_start_matches('+');
        if let Ok(int) = normalized.parse::<i64>() {
            return Value::Number(int.into());
        }
        normalized
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(token))
    }

    fn parse_bareword(&mut self) -> Value {
        let word = self.read_until(|c| matches!(c, ',' | '}' | ']' | '\n'));
        match word.as_str() {
            "true" | "True" => Value::Bool(true),
            "false" | "False" => Value::Bool(false),
            "null" | "None" | "undefined" => Value::Null,
            _ => Value::String(word),
        }
    }

    /// Reads up to (not including) the first char matching `stop`, trimmed.
    fn read_until(&mut self, stop: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stop(c) {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .trim()
            .to_string()
    }
}
