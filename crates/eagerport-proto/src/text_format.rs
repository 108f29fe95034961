//! Parser for the subset of protobuf text format used to describe a `NodeDef`:
//!
//! ```text
//! attr { key: 'T' value { type: DT_FLOAT } } attr { key: 'num' value { i: 2 } } op: 'Unpack'
//! ```
//!
//! Whitespace, commas and semicolons separate fields; `#` starts a comment.
//! The `:` before a nested block is optional.

use crate::attr_value::Value;
use crate::{AttrValue, DataType, ListValue, NodeDef, TextFormatError};

type Result<T> = std::result::Result<T, TextFormatError>;

/// Parses NodeDef text into a message.
///
/// # Example
/// ```
/// use eagerport_proto::parse_node_def;
///
/// let node = parse_node_def("attr { key: 'T' value { type: DT_FLOAT } } op: 'Add'")
///     .expect("valid node def");
/// assert_eq!(node.op, "Add");
/// assert_eq!(node.attr.len(), 1);
/// ```
pub fn parse_node_def(src: &str) -> Result<NodeDef> {
    let mut parser = Parser::new(src);
    let mut node = NodeDef::default();

    loop {
        parser.skip_separators();
        if parser.at_end() {
            break;
        }
        let start = parser.pos;
        match parser.parse_ident()? {
            "name" => node.name = parser.string_field()?,
            "op" => node.op = parser.string_field()?,
            "device" => node.device = parser.string_field()?,
            "input" => node.input.push(parser.string_field()?),
            "attr" => {
                parser.open_block()?;
                let (key, value) = parser.parse_attr_entry()?;
                if node.attr.contains_key(&key) {
                    return Err(TextFormatError::new(
                        start,
                        format!("duplicate attr '{key}'"),
                    ));
                }
                node.attr.insert(key, value);
            }
            other => {
                return Err(TextFormatError::new(
                    start,
                    format!("unknown NodeDef field '{other}'"),
                ))
            }
        }
    }

    Ok(node)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_separators(&mut self) {
        while let Some(c) = self.peek() {
            if c == '#' {
                let line_len = self.rest().find('\n').unwrap_or(self.rest().len());
                self.pos += line_len;
            } else if c.is_whitespace() || c == ',' || c == ';' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_separators();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    /// Consumes `}` if it is next.
    fn close_block(&mut self) -> bool {
        self.skip_separators();
        if self.peek() == Some('}') {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn open_block(&mut self) -> Result<()> {
        self.skip_separators();
        if self.peek() == Some(':') {
            self.pos += 1;
        }
        self.expect('{')
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !accept(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn parse_ident(&mut self) -> Result<&'a str> {
        self.skip_separators();
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                Ok(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'))
            }
            Some(c) => Err(self.error(format!("expected field name, found '{c}'"))),
            None => Err(self.error("expected field name, found end of input")),
        }
    }

    /// Unquoted scalar such as `2`, `-1.5e3`, `true` or `DT_FLOAT`.
    fn parse_scalar(&mut self) -> Result<&'a str> {
        self.skip_separators();
        let token =
            self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'));
        if token.is_empty() {
            return Err(self.error("expected a value"));
        }
        Ok(token)
    }

    fn parse_string(&mut self) -> Result<String> {
        self.skip_separators();
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        let start = self.pos;
        self.pos += 1;

        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                c if c == quote => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, 'r')) => '\r',
                        Some((_, c @ ('\\' | '\'' | '"'))) => c,
                        Some((_, other)) => {
                            return Err(TextFormatError::new(
                                self.pos + offset,
                                format!("unsupported escape '\\{other}'"),
                            ))
                        }
                        None => break,
                    };
                    out.push(escaped);
                }
                c => out.push(c),
            }
        }
        Err(TextFormatError::new(start, "unterminated string"))
    }

    fn string_field(&mut self) -> Result<String> {
        self.expect(':')?;
        self.parse_string()
    }

    fn parse_attr_entry(&mut self) -> Result<(String, AttrValue)> {
        let block_start = self.pos;
        let mut key = None;
        let mut value = None;

        while !self.close_block() {
            let start = self.pos;
            match self.parse_ident()? {
                "key" => key = Some(self.string_field()?),
                "value" => {
                    self.open_block()?;
                    value = Some(self.parse_attr_value()?);
                }
                other => {
                    return Err(TextFormatError::new(
                        start,
                        format!("unknown attr entry field '{other}'"),
                    ))
                }
            }
        }

        let key = key.ok_or_else(|| TextFormatError::new(block_start, "attr entry has no key"))?;
        Ok((key, value.unwrap_or_default()))
    }

    fn parse_attr_value(&mut self) -> Result<AttrValue> {
        let mut value = AttrValue::default();
        while !self.close_block() {
            let start = self.pos;
            let field = self.parse_ident()?;
            let parsed = if field == "list" {
                self.open_block()?;
                Value::List(self.parse_list_value()?)
            } else {
                self.expect(':')?;
                self.parse_scalar_value(field, start)?
            };
            if value.value.is_some() {
                return Err(TextFormatError::new(
                    start,
                    "attr value holds more than one field",
                ));
            }
            value.value = Some(parsed);
        }
        Ok(value)
    }

    fn parse_list_value(&mut self) -> Result<ListValue> {
        let mut list = ListValue::default();
        while !self.close_block() {
            let start = self.pos;
            let field = self.parse_ident()?;
            self.expect(':')?;
            match self.parse_scalar_value(field, start)? {
                Value::S(s) => list.s.push(s),
                Value::I(i) => list.i.push(i),
                Value::F(f) => list.f.push(f),
                Value::B(b) => list.b.push(b),
                Value::Type(t) => list.r#type.push(t),
                Value::List(_) => unreachable!("scalar fields never yield lists"),
            }
        }
        Ok(list)
    }

    fn parse_scalar_value(&mut self, field: &str, start: usize) -> Result<Value> {
        Ok(match field {
            "s" => Value::S(self.parse_string()?.into_bytes()),
            "i" => {
                let token = self.parse_scalar()?;
                Value::I(token.parse().map_err(|_| {
                    TextFormatError::new(start, format!("invalid integer '{token}'"))
                })?)
            }
            "f" => {
                let token = self.parse_scalar()?;
                Value::F(token.parse().map_err(|_| {
                    TextFormatError::new(start, format!("invalid float '{token}'"))
                })?)
            }
            "b" => match self.parse_scalar()? {
                "true" | "True" | "t" | "1" => Value::B(true),
                "false" | "False" | "f" | "0" => Value::B(false),
                token => {
                    return Err(TextFormatError::new(
                        start,
                        format!("invalid bool '{token}'"),
                    ))
                }
            },
            "type" => {
                let token = self.parse_scalar()?;
                let dtype = DataType::from_text_name(token).ok_or_else(|| {
                    TextFormatError::new(start, format!("unknown data type '{token}'"))
                })?;
                Value::Type(dtype as i32)
            }
            other => {
                return Err(TextFormatError::new(
                    start,
                    format!("unknown attr value field '{other}'"),
                ))
            }
        })
    }

    fn error(&self, message: impl Into<String>) -> TextFormatError {
        TextFormatError::new(self.pos, message)
    }
}
