//! Minimal markup reader for fetch templates and saved view definitions.
//!
//! Handles elements, attributes, text, comments, and a leading prolog. Byte offsets of each
//! element's start-tag close and end-tag open are kept so callers can splice text into the
//! original template without reformatting it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Malformed markup at byte {position}: {message}")]
pub struct MarkupError {
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// Offset of the `>` or `/>` that closes the start tag.
    pub start_tag_close: usize,
    /// Offset of the `</` of the end tag; `None` for self-closing elements.
    pub end_tag_open: Option<usize>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text content of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

/// Escape text for use inside an attribute value or text node.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse of [`escape`]; also decodes numeric character references.
pub fn unescape(text: &str) -> Result<String, MarkupError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';').ok_or_else(|| MarkupError {
            position: offset + amp,
            message: "unterminated entity".to_string(),
        })?;
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            numeric if numeric.starts_with('#') => decode_numeric(&numeric[1..]).ok_or_else(|| {
                MarkupError {
                    position: offset + amp,
                    message: format!("invalid character reference '&{};'", entity),
                }
            })?,
            other => {
                return Err(MarkupError {
                    position: offset + amp,
                    message: format!("unknown entity '&{};'", other),
                })
            }
        };
        out.push(decoded);
        let consumed = amp + 1 + semi + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_numeric(code: &str) -> Option<char> {
    let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => code.parse::<u32>().ok()?,
    };
    char::from_u32(value)
}

/// Parse a document and return its root element.
pub fn parse(text: &str) -> Result<Element, MarkupError> {
    let mut reader = Reader { text, pos: 0 };
    reader.skip_misc()?;
    if reader.at_end() {
        return Err(reader.error("document has no root element"));
    }
    let root = reader.element()?;
    reader.skip_misc()?;
    if !reader.at_end() {
        return Err(reader.error("content after root element"));
    }
    Ok(root)
}

struct Reader<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn error(&self, message: impl Into<String>) -> MarkupError {
        MarkupError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn skip_past(&mut self, terminator: &str, what: &str) -> Result<(), MarkupError> {
        match self.rest().find(terminator) {
            Some(i) => {
                self.pos += i + terminator.len();
                Ok(())
            }
            None => Err(self.error(format!("unterminated {}", what))),
        }
    }

    /// Whitespace, prolog, and comments between top-level items.
    fn skip_misc(&mut self) -> Result<(), MarkupError> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<?") {
                self.skip_past("?>", "processing instruction")?;
            } else if self.rest().starts_with("<!--") {
                self.skip_past("-->", "comment")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<String, MarkupError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '=' | '<'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += len;
        Ok(rest[..len].to_string())
    }

    fn expect(&mut self, token: &str) -> Result<(), MarkupError> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    fn element(&mut self) -> Result<Element, MarkupError> {
        self.expect("<")?;
        let name = self.name()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                let start_tag_close = self.pos;
                self.pos += 2;
                return Ok(Element {
                    name,
                    attributes,
                    children: Vec::new(),
                    start_tag_close,
                    end_tag_open: None,
                });
            }
            if self.rest().starts_with('>') {
                break;
            }
            if self.at_end() {
                return Err(self.error(format!("unterminated start tag <{}>", name)));
            }
            let attr_name = self.name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.error("expected quoted attribute value")),
            };
            self.pos += 1;
            let end = self
                .rest()
                .find(quote)
                .ok_or_else(|| self.error("unterminated attribute value"))?;
            let raw = &self.rest()[..end];
            let value = unescape(raw).map_err(|e| MarkupError {
                position: self.pos + e.position,
                message: e.message,
            })?;
            self.pos += end + 1;
            if attributes.iter().any(|(n, _)| *n == attr_name) {
                return Err(self.error(format!("duplicate attribute '{}'", attr_name)));
            }
            attributes.push((attr_name, value));
        }

        let start_tag_close = self.pos;
        self.pos += 1;
        let mut children = Vec::new();
        loop {
            if self.at_end() {
                return Err(self.error(format!("missing end tag for <{}>", name)));
            }
            if self.rest().starts_with("<!--") {
                self.skip_past("-->", "comment")?;
            } else if self.rest().starts_with("</") {
                let end_tag_open = self.pos;
                self.pos += 2;
                let closing = self.name()?;
                if closing != name {
                    return Err(self.error(format!(
                        "end tag </{}> does not match <{}>",
                        closing, name
                    )));
                }
                self.skip_whitespace();
                self.expect(">")?;
                return Ok(Element {
                    name,
                    attributes,
                    children,
                    start_tag_close,
                    end_tag_open: Some(end_tag_open),
                });
            } else if self.rest().starts_with('<') {
                children.push(Node::Element(self.element()?));
            } else {
                let len = self.rest().find('<').unwrap_or(self.rest().len());
                let raw = &self.rest()[..len];
                let start = self.pos;
                self.pos += len;
                if !raw.trim().is_empty() {
                    let text = unescape(raw.trim()).map_err(|e| MarkupError {
                        position: start + e.position,
                        message: e.message,
                    })?;
                    children.push(Node::Text(text));
                }
            }
        }
    }
}
