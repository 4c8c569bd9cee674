//! Best-effort parser for strings that look like another language's
//! literal repr of structured data: single-quoted strings, `True`/`False`/
//! `None`, dicts, lists, tuples. Used by tool-output normalization to
//! recover structure from stringified payloads. Failure to parse means
//! "not structured"; callers fall back to the raw string.

use serde_json::{Map, Number, Value};

/// Parse the whole input as one literal value. Returns `None` on anything
/// the grammar does not cover, including trailing garbage.
pub fn parse(input: &str) -> Option<Value> {
    let mut p = Parser { bytes: input.as_bytes(), pos: 0 };
    let value = p.value()?;
    p.skip_ws();
    if p.pos == p.bytes.len() {
        Some(value)
    } else {
        None
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn keyword(&mut self, kw: &str) -> bool {
        if !self.bytes[self.pos..].starts_with(kw.as_bytes()) {
            return false;
        }
        // A keyword must not run into a longer identifier.
        let end = self.pos + kw.len();
        if matches!(self.bytes.get(end), Some(c) if c.is_ascii_alphanumeric() || *c == b'_') {
            return false;
        }
        self.pos = end;
        true
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            b'{' => self.dict(),
            b'[' => self.sequence(b'[', b']'),
            b'(' => self.sequence(b'(', b')'),
            b'\'' | b'"' => self.string().map(Value::String),
            b'T' => self.keyword("True").then(|| Value::Bool(true)),
            b'F' => self.keyword("False").then(|| Value::Bool(false)),
            b'N' => self.keyword("None").then(|| Value::Null),
            b'-' | b'+' | b'.' | b'0'..=b'9' => self.number(),
            _ => None,
        }
    }

    fn dict(&mut self) -> Option<Value> {
        if !self.eat(b'{') {
            return None;
        }
        let mut map = Map::new();
        self.skip_ws();
        if self.eat(b'}') {
            return Some(Value::Object(map));
        }
        loop {
            let key = match self.value()? {
                Value::String(s) => s,
                // JSON keys are strings; render non-string keys as their
                // JSON text.
                other => other.to_string(),
            };
            self.skip_ws();
            if !self.eat(b':') {
                return None;
            }
            let val = self.value()?;
            map.insert(key, val);
            self.skip_ws();
            if self.eat(b',') {
                self.skip_ws();
                if self.eat(b'}') {
                    return Some(Value::Object(map));
                }
                continue;
            }
            if self.eat(b'}') {
                return Some(Value::Object(map));
            }
            return None;
        }
    }

    fn sequence(&mut self, open: u8, close: u8) -> Option<Value> {
        if !self.eat(open) {
            return None;
        }
        let mut items = Vec::new();
        self.skip_ws();
        if self.eat(close) {
            return Some(Value::Array(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(b',') {
                self.skip_ws();
                if self.eat(close) {
                    return Some(Value::Array(items));
                }
                continue;
            }
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            return None;
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let b = self.peek()?;
            self.pos += 1;
            match b {
                b'\\' => {
                    let escaped = self.peek()?;
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'0' => out.push(0),
                        other => out.push(other),
                    }
                }
                b if b == quote => break,
                other => out.push(other),
            }
        }
        String::from_utf8(out).ok()
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'-' | b'+' if is_float => self.pos += 1,
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).ok()?;
        if is_float {
            Number::from_f64(text.parse::<f64>().ok()?).map(Value::Number)
        } else {
            text.parse::<i64>()
                .ok()
                .map(|n| Value::Number(n.into()))
                .or_else(|| Number::from_f64(text.parse::<f64>().ok()?).map(Value::Number))
        }
    }
}
