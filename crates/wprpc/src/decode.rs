//! # Wire Decoder
//!
//! Parses a `methodCall` document into its method name and an ordered list of
//! dynamic `Value`s.
//!
//! ## Invariants
//! - **Recursion Safety**: Value nesting is bounded by `MAX_RECURSION_DEPTH`.
//! - **Type Strictness**: A value's variant is chosen by its type element alone.
//! - **No Normalization**: The method name is returned exactly as sent.

use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use tracing::error;

use crate::error::Error;
use crate::error::Result;
use crate::value::MethodCall;
use crate::value::Value;
use crate::value::DATETIME_FORMAT;

/// The maximum nesting depth for values before the document is rejected.
const MAX_RECURSION_DEPTH: usize = 64;

/// Decodes a complete `methodCall` document.
///
/// An empty or absent `<params>` yields an empty parameter list.
pub fn decode(raw: &[u8]) -> Result<MethodCall> {
    match Parser::new(raw).method_call() {
        Ok(call) => {
            debug!(method = %call.method_name, params = call.params.len(), "xmlrpc: decoded method call");
            Ok(call)
        }
        Err(e) => {
            error!(error = %e, "xmlrpc: error decoding request body");
            Err(e)
        }
    }
}

/// Converts one primitive's text according to its type element.
///
/// Surrounding whitespace is ignored for everything except `string`.
pub fn decode_scalar(tag: &str, text: String) -> Result<Value> {
    match tag {
        "string" => Ok(Value::String(text)),
        "int" | "i4" => match text.trim().parse::<i64>() {
            Ok(i) => Ok(Value::Integer(i)),
            Err(_) => Err(coercion("int", text)),
        },
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Boolean(true)),
            "0" | "false" => Ok(Value::Boolean(false)),
            _ => Err(coercion("boolean", text)),
        },
        "dateTime.iso8601" => match NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT) {
            Ok(t) => Ok(Value::Timestamp(t)),
            Err(_) => Err(coercion("dateTime.iso8601", text)),
        },
        other => Err(Error::UnknownType(other.to_string())),
    }
}

fn coercion(kind: &'static str, text: String) -> Error {
    Error::TypeCoercion { kind, text }
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedDocument(reason.into())
}

/// One markup event, with names and text already decoded.
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
    Eof,
}

fn unexpected(token: &Token) -> Error {
    match token {
        Token::Open(name) => malformed(format!("unexpected element <{}>", name)),
        Token::Close(name) => malformed(format!("unexpected closing </{}>", name)),
        Token::Empty(name) => malformed(format!("unexpected element <{}/>", name)),
        Token::Text(text) => malformed(format!("unexpected text '{}'", text.trim())),
        Token::Eof => malformed("unexpected end of document"),
    }
}

fn element_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|_| malformed("element name is not valid UTF-8"))
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(raw: &'a [u8]) -> Self {
        Self { reader: Reader::from_reader(raw) }
    }

    /// Next markup event; declarations, comments and PIs are skipped.
    fn next_token(&mut self) -> Result<Token> {
        loop {
            let token = match self.reader.read_event()? {
                Event::Start(e) => Token::Open(element_name(e.name().as_ref())?),
                Event::End(e) => Token::Close(element_name(e.name().as_ref())?),
                Event::Empty(e) => Token::Empty(element_name(e.name().as_ref())?),
                Event::Text(t) => Token::Text(t.unescape()?.into_owned()),
                Event::CData(c) => {
                    let text = String::from_utf8(c.into_inner().into_owned())
                        .map_err(|_| malformed("CDATA section is not valid UTF-8"))?;
                    Token::Text(text)
                }
                Event::Eof => Token::Eof,
                _ => continue,
            };
            return Ok(token);
        }
    }

    /// Next event in element-only content; whitespace between elements is dropped.
    fn next_tag(&mut self) -> Result<Token> {
        loop {
            match self.next_token()? {
                Token::Text(text) if text.trim().is_empty() => continue,
                token => return Ok(token),
            }
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<()> {
        match self.next_tag()? {
            Token::Close(found) if found == name => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Collects character data up to the closing tag of `name`.
    fn text_until(&mut self, name: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Text(t) => text.push_str(&t),
                Token::Close(found) if found == name => return Ok(text),
                other => return Err(unexpected(&other)),
            }
        }
    }

    /// Skips the rest of an element that is already open.
    fn skip(&mut self, name: &str) -> Result<()> {
        debug!(element = name, "xmlrpc: skipping unknown element");
        let mut depth = 1usize;
        loop {
            match self.next_token()? {
                Token::Open(_) => depth += 1,
                Token::Close(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Eof => return Err(unexpected(&Token::Eof)),
                Token::Empty(_) | Token::Text(_) => {}
            }
        }
    }

    fn method_call(&mut self) -> Result<MethodCall> {
        let mut call = MethodCall { method_name: String::new(), params: Vec::new() };

        match self.next_tag()? {
            Token::Open(name) if name == "methodCall" => {}
            Token::Empty(name) if name == "methodCall" => return self.finish(call),
            Token::Eof => return Err(malformed("empty document")),
            other => return Err(unexpected(&other)),
        }

        loop {
            match self.next_tag()? {
                Token::Open(name) if name == "methodName" => {
                    call.method_name = self.text_until("methodName")?;
                }
                Token::Open(name) if name == "params" => call.params = self.params()?,
                Token::Empty(name) if name == "methodName" => call.method_name.clear(),
                Token::Empty(name) if name == "params" => call.params.clear(),
                Token::Open(name) => self.skip(&name)?,
                Token::Empty(_) => {}
                Token::Close(name) if name == "methodCall" => break,
                other => return Err(unexpected(&other)),
            }
        }

        self.finish(call)
    }

    /// Only whitespace, comments and PIs may follow the root element.
    fn finish(&mut self, call: MethodCall) -> Result<MethodCall> {
        match self.next_tag()? {
            Token::Eof => Ok(call),
            other => Err(unexpected(&other)),
        }
    }

    fn params(&mut self) -> Result<Vec<Value>> {
        let mut params = Vec::new();
        loop {
            match self.next_tag()? {
                Token::Open(name) if name == "param" => params.push(self.param()?),
                Token::Close(name) if name == "params" => return Ok(params),
                other => return Err(unexpected(&other)),
            }
        }
    }

    fn param(&mut self) -> Result<Value> {
        let value = match self.next_tag()? {
            Token::Open(name) if name == "value" => self.value(0)?,
            Token::Empty(name) if name == "value" => Value::String(String::new()),
            other => return Err(unexpected(&other)),
        };
        self.expect_close("param")?;
        Ok(value)
    }

    /// Decodes the body of an open `<value>` through its closing tag.
    ///
    /// A value without a type element is a string.
    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(malformed(format!("values nested deeper than {} levels", MAX_RECURSION_DEPTH)));
        }

        let mut text = String::new();
        loop {
            let (tag, empty) = match self.next_token()? {
                Token::Text(t) => {
                    text.push_str(&t);
                    continue;
                }
                Token::Close(name) if name == "value" => return Ok(Value::String(text)),
                Token::Open(tag) => (tag, false),
                Token::Empty(tag) => (tag, true),
                other => return Err(unexpected(&other)),
            };

            if !text.trim().is_empty() {
                return Err(malformed("<value> mixes text with a type element"));
            }
            let value = self.typed(&tag, empty, depth)?;
            self.expect_close("value")?;
            return Ok(value);
        }
    }

    fn typed(&mut self, tag: &str, empty: bool, depth: usize) -> Result<Value> {
        match tag {
            "array" if empty => Ok(Value::List(Vec::new())),
            "array" => self.array(depth),
            "struct" if empty => Ok(Value::Struct(Vec::new())),
            "struct" => self.structure(depth),
            "string" | "int" | "i4" | "boolean" | "dateTime.iso8601" => {
                let text = if empty { String::new() } else { self.text_until(tag)? };
                decode_scalar(tag, text)
            }
            other => Err(Error::UnknownType(other.to_string())),
        }
    }

    fn array(&mut self, depth: usize) -> Result<Value> {
        let items = match self.next_tag()? {
            Token::Open(name) if name == "data" => self.data(depth)?,
            Token::Empty(name) if name == "data" => Vec::new(),
            Token::Close(name) if name == "array" => return Ok(Value::List(Vec::new())),
            other => return Err(unexpected(&other)),
        };
        self.expect_close("array")?;
        Ok(Value::List(items))
    }

    fn data(&mut self, depth: usize) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            match self.next_tag()? {
                Token::Open(name) if name == "value" => items.push(self.value(depth + 1)?),
                Token::Empty(name) if name == "value" => items.push(Value::String(String::new())),
                Token::Close(name) if name == "data" => return Ok(items),
                other => return Err(unexpected(&other)),
            }
        }
    }

    fn structure(&mut self, depth: usize) -> Result<Value> {
        let mut members = Vec::new();
        loop {
            match self.next_tag()? {
                Token::Open(name) if name == "member" => members.push(self.member(depth)?),
                Token::Close(name) if name == "struct" => return Ok(Value::Struct(members)),
                other => return Err(unexpected(&other)),
            }
        }
    }

    fn member(&mut self, depth: usize) -> Result<(String, Value)> {
        let mut name = None;
        let mut value = None;
        loop {
            match self.next_tag()? {
                Token::Open(tag) if tag == "name" => name = Some(self.text_until("name")?),
                Token::Empty(tag) if tag == "name" => name = Some(String::new()),
                Token::Open(tag) if tag == "value" => value = Some(self.value(depth + 1)?),
                Token::Empty(tag) if tag == "value" => value = Some(Value::String(String::new())),
                Token::Close(tag) if tag == "member" => break,
                other => return Err(unexpected(&other)),
            }
        }

        match (name, value) {
            (Some(name), Some(value)) => Ok((name, value)),
            (None, _) => Err(malformed("<member> without <name>")),
            (_, None) => Err(malformed("<member> without <value>")),
        }
    }
}
