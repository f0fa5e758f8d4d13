//! Path addressing for graphs.
//!
//! ```text
//! path     := segment ('.' segment)*
//! segment  := name ['{' index? '}'] ['(' arg (',' arg)* ')'] ('[' n ']')*
//! ```
//!
//! `b{1}` picks the second sibling named `b`, `b{}` picks all of them as a
//! group, `[n]` picks the n-th child regardless of name, and `f(x, 'y')`
//! carries call arguments that are evaluated when the path is resolved.

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, ParseErrorKind};
use crate::eval::expr::parse_expression;
use crate::model::Graph;

/// Which of the same-named siblings a segment selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector {
    /// No selector: the first match.
    #[default]
    First,
    /// `{n}`: the n-th match, 0-based.
    Index(usize),
    /// `{}`: every match, in order.
    Group,
}

/// A call argument: its source text and compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    text: String,
    expr: Graph,
}

impl Arg {
    /// The argument as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The compiled expression graph.
    pub fn expr(&self) -> &Graph {
        &self.expr
    }
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Children whose value equals `name`.
    Name {
        name: String,
        selector: Selector,
        args: Option<Vec<Arg>>,
    },
    /// `[n]`: the n-th child.
    Ordinal(usize),
}

impl Segment {
    /// The name matched by this segment, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Segment::Name { name, .. } => Some(name),
            Segment::Ordinal(_) => None,
        }
    }

    /// The sibling selector; ordinals report [`Selector::First`].
    pub fn selector(&self) -> Selector {
        match self {
            Segment::Name { selector, .. } => *selector,
            Segment::Ordinal(_) => Selector::First,
        }
    }

    /// Call arguments, when the segment is written as `name(...)`.
    pub fn args(&self) -> Option<&[Arg]> {
        match self {
            Segment::Name { args, .. } => args.as_deref(),
            Segment::Ordinal(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Ordinal(n) => write!(f, "[{n}]"),
            Segment::Name {
                name,
                selector,
                args,
            } => {
                f.write_str(name)?;
                match selector {
                    Selector::First => {}
                    Selector::Index(n) => write!(f, "{{{n}}}")?,
                    Selector::Group => f.write_str("{}")?,
                }
                if let Some(args) = args {
                    let texts: Vec<&str> = args.iter().map(Arg::text).collect();
                    write!(f, "({})", texts.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// A compiled path: an ordered list of segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Compiles path text. Empty text is the zero-segment path (the root).
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        PathParser::new(input.trim_end()).path()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the zero-segment path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The path made of the segments from `start` on.
    pub fn tail(&self, start: usize) -> Path {
        Path {
            segments: self.segments.get(start..).unwrap_or_default().to_vec(),
        }
    }

    /// Canonical text form.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && !matches!(segment, Segment::Ordinal(_)) {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '.' | '{' | '}' | '(' | ')' | '[' | ']' | ',')
}

struct PathParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.pos, kind)
    }

    fn path(mut self) -> Result<Path, ParseError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let mut segments = Vec::new();
        if self.peek().is_none() {
            return Ok(Path { segments });
        }
        loop {
            if self.peek() == Some('[') {
                segments.push(self.ordinal()?);
            } else {
                segments.push(self.named()?);
            }
            while self.peek() == Some('[') {
                segments.push(self.ordinal()?);
            }
            match self.peek() {
                None => break,
                Some('.') => {
                    self.bump();
                    if self.peek().is_none() {
                        return Err(self.error(ParseErrorKind::EmptySegment));
                    }
                }
                Some(c) => return Err(self.error(ParseErrorKind::UnexpectedChar(c))),
            }
        }
        Ok(Path { segments })
    }

    fn named(&mut self) -> Result<Segment, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(match self.peek() {
                None | Some('.') => self.error(ParseErrorKind::EmptySegment),
                Some(c) => self.error(ParseErrorKind::UnexpectedChar(c)),
            });
        }
        let name = self.src[start..self.pos].to_string();

        let selector = if self.peek() == Some('{') {
            self.selector()?
        } else {
            Selector::First
        };
        let args = if self.peek() == Some('(') {
            Some(self.args()?)
        } else {
            None
        };
        Ok(Segment::Name {
            name,
            selector,
            args,
        })
    }

    /// Reads digits up to `close`; the opening delimiter is at the cursor.
    fn delimited_digits(
        &mut self,
        close: char,
        unterminated: ParseErrorKind,
    ) -> Result<&'a str, ParseError> {
        let open = self.pos;
        self.bump();
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(ParseError::new(open, unterminated)),
                Some(c) if c == close => break,
                Some(c) if c.is_ascii_digit() => {
                    self.bump();
                }
                Some(_) => return Err(self.error(ParseErrorKind::InvalidIndex)),
            }
        }
        let src = self.src;
        let digits = &src[start..self.pos];
        self.bump();
        Ok(digits)
    }

    fn selector(&mut self) -> Result<Selector, ParseError> {
        let start = self.pos + 1;
        let digits = self.delimited_digits('}', ParseErrorKind::UnterminatedBrace)?;
        if digits.is_empty() {
            return Ok(Selector::Group);
        }
        digits
            .parse()
            .map(Selector::Index)
            .map_err(|_| ParseError::new(start, ParseErrorKind::InvalidIndex))
    }

    fn ordinal(&mut self) -> Result<Segment, ParseError> {
        let start = self.pos + 1;
        let digits = self.delimited_digits(']', ParseErrorKind::UnterminatedBracket)?;
        digits
            .parse()
            .map(Segment::Ordinal)
            .map_err(|_| ParseError::new(start, ParseErrorKind::InvalidIndex))
    }

    /// Splits `( ... )` at top-level commas and compiles each argument.
    fn args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let open = self.pos;
        self.bump();
        let mut spans = Vec::new();
        let mut start = self.pos;
        let mut depth = 0usize;
        loop {
            let at = self.pos;
            match self.bump() {
                None => return Err(ParseError::new(open, ParseErrorKind::UnterminatedParen)),
                Some(q @ ('\'' | '"')) => self.skip_quoted(q, at)?,
                Some('(' | '{' | '[') => depth += 1,
                Some(')') if depth == 0 => {
                    spans.push((start, at));
                    break;
                }
                Some(')' | '}' | ']') => depth = depth.saturating_sub(1),
                Some(',') if depth == 0 => {
                    spans.push((start, at));
                    start = self.pos;
                }
                Some(_) => {}
            }
        }

        if spans.len() == 1 && self.src[spans[0].0..spans[0].1].trim().is_empty() {
            return Ok(Vec::new());
        }
        spans
            .into_iter()
            .map(|(from, to)| {
                let raw = &self.src[from..to];
                let text = raw.trim();
                let offset = from + (raw.len() - raw.trim_start().len());
                if text.is_empty() {
                    return Err(ParseError::new(offset, ParseErrorKind::MissingOperand));
                }
                let expr = parse_expression(text).map_err(|e| e.offset(offset))?;
                Ok(Arg {
                    text: text.to_string(),
                    expr,
                })
            })
            .collect()
    }

    fn skip_quoted(&mut self, quote: char, open: usize) -> Result<(), ParseError> {
        loop {
            match self.bump() {
                None => return Err(ParseError::new(open, ParseErrorKind::UnterminatedQuote)),
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
            }
        }
    }
}
