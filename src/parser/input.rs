//! Byte cursor and lexical scanners for the XML parser.
//!
//! [`ParserInput`] walks the UTF-8 text one character at a time, keeps the
//! [`SourceLocation`] of the cursor current and counts open elements. The
//! free functions at the bottom scan the bracketed constructs (comments,
//! CDATA, processing instructions, directives and the XML declaration).
//!
//! No external entities are ever fetched. Named references outside the
//! built-in and HTML tables go to the caller's resolver, if one is set.

use crate::error::{ParseError, SourceLocation};

use super::entities;
use super::{EntityResolver, ParseOptions};

/// Nesting depth allowed when the caller sets no limit.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

// -------------------------------------------------------------------------
// Character classes
// -------------------------------------------------------------------------

const NAME_START_RANGES: &[(char, char)] = &[
    (':', ':'),
    ('A', 'Z'),
    ('_', '_'),
    ('a', 'z'),
    ('\u{C0}', '\u{D6}'),
    ('\u{D8}', '\u{F6}'),
    ('\u{F8}', '\u{2FF}'),
    ('\u{370}', '\u{37D}'),
    ('\u{37F}', '\u{1FFF}'),
    ('\u{200C}', '\u{200D}'),
    ('\u{2070}', '\u{218F}'),
    ('\u{2C00}', '\u{2FEF}'),
    ('\u{3001}', '\u{D7FF}'),
    ('\u{F900}', '\u{FDCF}'),
    ('\u{FDF0}', '\u{FFFD}'),
    ('\u{10000}', '\u{EFFFF}'),
];

/// Characters allowed in names but not at their start.
const NAME_TAIL_RANGES: &[(char, char)] = &[
    ('-', '.'),
    ('0', '9'),
    ('\u{B7}', '\u{B7}'),
    ('\u{300}', '\u{36F}'),
    ('\u{203F}', '\u{2040}'),
];

fn in_ranges(c: char, ranges: &[(char, char)]) -> bool {
    ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
}

/// Returns `true` if `c` may appear in an XML 1.0 document.
pub(crate) fn is_xml_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{FFFE}' | '\u{FFFF}' => false,
        _ => c >= ' ',
    }
}

pub(crate) fn is_name_start_char(c: char) -> bool {
    in_ranges(c, NAME_START_RANGES)
}

pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || in_ranges(c, NAME_TAIL_RANGES)
}

/// Returns `true` for the four XML whitespace bytes.
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

// -------------------------------------------------------------------------
// ParserInput
// -------------------------------------------------------------------------

/// Cursor over the text of one load call.
pub(crate) struct ParserInput<'a> {
    text: &'a str,
    /// Cursor position; `byte_offset` always sits on a character boundary.
    at: SourceLocation,
    /// Open elements since the load point.
    depth: u32,
    max_depth: u32,
    resolver: Option<EntityResolver>,
}

impl<'a> ParserInput<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            at: SourceLocation {
                line: 1,
                column: 1,
                byte_offset: 0,
            },
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            resolver: None,
        }
    }

    /// Takes the depth limit and entity resolver from `options`.
    #[must_use]
    pub fn with_options(mut self, options: &ParseOptions) -> Self {
        self.max_depth = options.max_depth;
        self.resolver = options.entity_resolver.clone();
        self
    }

    // -- Depth --

    pub fn enter_element(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(self.fatal(format!(
                "maximum nesting depth exceeded ({})",
                self.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_element(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- Lookahead --

    pub fn location(&self) -> SourceLocation {
        self.at
    }

    fn rest(&self) -> &'a str {
        self.text.get(self.at.byte_offset..).unwrap_or_default()
    }

    pub fn at_end(&self) -> bool {
        self.rest().is_empty()
    }

    pub fn peek(&self) -> Option<u8> {
        self.byte_at(0)
    }

    /// Returns the byte `offset` bytes past the cursor.
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.rest().as_bytes().get(offset).copied()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.rest().as_bytes().starts_with(s)
    }

    // -- Consuming --

    fn step(&mut self, ch: char) {
        self.at.byte_offset += ch.len_utf8();
        if ch == '\n' {
            self.at.line += 1;
            self.at.column = 1;
        } else {
            self.at.column += 1;
        }
    }

    /// Moves past `count` characters without checking them.
    pub fn skip(&mut self, count: usize) {
        for _ in 0..count {
            match self.peek_char() {
                Some(ch) => self.step(ch),
                None => break,
            }
        }
    }

    /// Consumes the next character. `\r\n` and a lone `\r` come back as
    /// `\n`; characters XML forbids are an error.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        if !is_xml_char(ch) {
            return Err(self.fatal(format!("invalid XML character: U+{:04X}", u32::from(ch))));
        }
        self.step(ch);
        if ch == '\r' {
            self.eat(b"\n");
            return Ok('\n');
        }
        Ok(ch)
    }

    /// Consumes the ASCII sequence `s` if the input continues with it.
    pub fn eat(&mut self, s: &[u8]) -> bool {
        if !self.looking_at(s) {
            return false;
        }
        self.skip(s.len());
        true
    }

    /// Consumes the ASCII sequence `s` or fails naming what was found.
    pub fn expect(&mut self, s: &[u8]) -> Result<(), ParseError> {
        if self.eat(s) {
            return Ok(());
        }
        let wanted = String::from_utf8_lossy(s);
        Err(match self.peek_char() {
            Some(found) => self.fatal(format!("expected '{wanted}', found '{found}'")),
            None => self.fatal(format!("expected '{wanted}', found end of input")),
        })
    }

    /// Skips XML whitespace, reporting whether there was any.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.at.byte_offset;
        while self.peek().is_some_and(is_whitespace) {
            self.skip(1);
        }
        self.at.byte_offset > start
    }

    fn ascii_run(&mut self, accept: impl Fn(u8) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest
            .bytes()
            .take_while(|&b| b.is_ascii() && accept(b))
            .count();
        self.skip(len);
        &rest[..len]
    }

    // -- Names and references --

    /// Reads a name. Prefixed names (`a:b`) are kept whole.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        match rest.chars().next() {
            None => return Err(self.fatal("expected name, found end of input")),
            Some(c) if !is_name_start_char(c) => {
                return Err(self.fatal(format!("invalid name start character: '{c}'")))
            }
            Some(_) => {}
        }
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_name_char(c))
            .map_or(rest.len(), |(i, _)| i);
        let name = &rest[..len];
        name.chars().for_each(|ch| self.step(ch));
        Ok(name.to_string())
    }

    /// Reads `&...;` and returns the replacement text.
    ///
    /// Named references are looked up in the XML and HTML tables first and
    /// handed to the resolver only when both miss.
    pub fn parse_reference(&mut self) -> Result<String, ParseError> {
        self.expect(b"&")?;
        if self.eat(b"#") {
            return self.char_reference().map(String::from);
        }
        let name = self.parse_name()?;
        self.expect(b";")?;
        entities::lookup(&name)
            .map(String::from)
            .or_else(|| self.resolver.as_ref().and_then(|resolve| resolve(&name)))
            .ok_or_else(|| self.fatal(format!("unknown entity reference: &{name};")))
    }

    fn char_reference(&mut self) -> Result<char, ParseError> {
        let (radix, digits) = if self.eat(b"x") {
            (16, self.ascii_run(|b| b.is_ascii_hexdigit()))
        } else {
            (10, self.ascii_run(|b| b.is_ascii_digit()))
        };
        if digits.is_empty() {
            return Err(self.fatal("character reference without digits"));
        }
        let code = u32::from_str_radix(digits, radix)
            .map_err(|_| self.fatal(format!("character reference out of range: {digits}")))?;
        self.expect(b";")?;
        char::from_u32(code)
            .filter(|&c| is_xml_char(c))
            .ok_or_else(|| self.fatal(format!("invalid character reference: U+{code:04X}")))
    }

    // -- Quoted values --

    fn open_quote(&mut self, what: &str) -> Result<u8, ParseError> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.skip(1);
                Ok(quote)
            }
            _ => Err(self.fatal(format!("{what} must be quoted"))),
        }
    }

    /// Reads a quoted attribute value, decoding references. A raw `<` or
    /// `>` inside the quotes is an error.
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.open_quote("attribute value")?;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fatal("unexpected end of input in attribute value")),
                Some(b) if b == quote => {
                    self.skip(1);
                    return Ok(value);
                }
                Some(b'&') => value.push_str(&self.parse_reference()?),
                Some(b @ (b'<' | b'>')) => {
                    return Err(self.fatal(format!(
                        "'{}' not allowed in attribute values",
                        char::from(b)
                    )))
                }
                Some(_) => value.push(self.next_char()?),
            }
        }
    }

    /// Reads a quoted XML declaration value. Only letters, digits and
    /// `.`, `_`, `-`, `:` may appear between the quotes.
    fn parse_declaration_value(&mut self, what: &str) -> Result<String, ParseError> {
        let quote = self.open_quote(what)?;
        let value = self.ascii_run(|b| b.is_ascii_alphanumeric() || b".-_:".contains(&b));
        if value.is_empty() || !self.eat(&[quote]) {
            return Err(self.fatal(format!("malformed {what} in XML declaration")));
        }
        Ok(value.to_string())
    }

    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
        }
    }
}

// -------------------------------------------------------------------------
// Bracketed constructs
// -------------------------------------------------------------------------

/// Collects characters until `terminator`, which is consumed but not
/// returned.
fn take_until(
    input: &mut ParserInput<'_>,
    terminator: &str,
    what: &str,
) -> Result<String, ParseError> {
    let mut body = String::new();
    while !input.eat(terminator.as_bytes()) {
        if input.at_end() {
            return Err(input.fatal(format!("unexpected end of input in {what}")));
        }
        body.push(input.next_char()?);
    }
    Ok(body)
}

/// Reads `<!-- ... -->` and returns the body.
pub(crate) fn parse_comment_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect(b"<!--")?;
    let body = take_until(input, "-->", "comment")?;
    if body.contains("--") || body.ends_with('-') {
        return Err(input.fatal("'--' not allowed inside comments"));
    }
    Ok(body)
}

/// Reads `<![CDATA[ ... ]]>` and returns the body.
pub(crate) fn parse_cdata_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect(b"<![CDATA[")?;
    take_until(input, "]]>", "CDATA section")
}

/// Reads `<? ... ?>` and returns everything from the target name on.
pub(crate) fn parse_declaration_content(
    input: &mut ParserInput<'_>,
) -> Result<String, ParseError> {
    input.expect(b"<?")?;
    if !input.peek_char().is_some_and(is_name_start_char) {
        return Err(input.fatal("processing instruction must start with a target name"));
    }
    take_until(input, "?>", "processing instruction")
}

/// Reads `<! ... >` and returns the body. Square brackets nest and quoted
/// strings are opaque, so a `DOCTYPE` internal subset is kept verbatim.
pub(crate) fn parse_directive_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect(b"<!")?;
    let mut body = String::new();
    let mut brackets = 0_u32;
    let mut quote: Option<char> = None;
    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in directive"));
        }
        let ch = input.next_char()?;
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => brackets += 1,
            (None, ']') => brackets = brackets.saturating_sub(1),
            (None, '>') if brackets == 0 => break,
            (None, _) => {}
        }
        body.push(ch);
    }
    if body.is_empty() {
        return Err(input.fatal("empty directive"));
    }
    Ok(body)
}

/// The pseudo-attributes of an `<?xml ...?>` declaration.
#[derive(Debug, Default)]
pub(crate) struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// Reads an XML declaration. `version` must come first, then the optional
/// `encoding` and `standalone`, each at most once and in that order.
pub(crate) fn parse_xml_decl(input: &mut ParserInput<'_>) -> Result<XmlDeclaration, ParseError> {
    input.expect(b"<?xml")?;
    let mut decl = XmlDeclaration::default();
    let mut has_version = false;
    loop {
        let spaced = input.skip_whitespace();
        if input.eat(b"?>") {
            break;
        }
        if !spaced {
            return Err(input.fatal("whitespace required in XML declaration"));
        }
        let name = input.parse_name()?;
        input.skip_whitespace();
        input.expect(b"=")?;
        input.skip_whitespace();
        match name.as_str() {
            "version" if !has_version => {
                decl.version = input.parse_declaration_value("version")?;
                has_version = true;
            }
            "encoding" if has_version && decl.encoding.is_none() && decl.standalone.is_none() => {
                decl.encoding = Some(input.parse_declaration_value("encoding")?);
            }
            "standalone" if has_version && decl.standalone.is_none() => {
                decl.standalone = Some(match input.parse_declaration_value("standalone")?.as_str() {
                    "yes" => true,
                    "no" => false,
                    other => {
                        return Err(input.fatal(format!("invalid standalone value: '{other}'")))
                    }
                });
            }
            _ => return Err(input.fatal(format!("unexpected '{name}' in XML declaration"))),
        }
    }
    if !has_version {
        return Err(input.fatal("XML declaration without version"));
    }
    Ok(decl)
}
