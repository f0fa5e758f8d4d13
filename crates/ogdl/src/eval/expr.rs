//! Expression text to expression graph.
//!
//! `a+3`, `b.c{1} >= 2`, `(x - 1) * 'y'`. Operators are applied strictly
//! left to right; parentheses group. The result is a graph rooted at
//! [`EXPRESSION_MARKER`] whose single child is the expression tree: an
//! operator node holds the operator token and exactly two operands, a
//! leaf holds a literal or path token as written.
//!
//! A `-` between two letters continues a name, so `max-size` is one path;
//! write `max - size` to subtract. A `-` before a digit is always an
//! operator: `x-1`.
//!
//! Parentheses, and the `{}`/`[]`/`()` groups inside a path token, nest at
//! most [`MAX_EXPRESSION_DEPTH`] levels. The same bound applies to the
//! height of the operator tree.

use crate::error::{ParseError, ParseErrorKind};
use crate::limits::{EXPRESSION_MARKER, MAX_EXPRESSION_DEPTH};
use crate::model::Graph;

/// Binary operators understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

/// Operator spellings, longest first so the lexer matches greedily.
const OPERATOR_TOKENS: &[(&str, Operator)] = &[
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("&&", Operator::And),
    ("||", Operator::Or),
    ("+", Operator::Add),
    ("-", Operator::Sub),
    ("*", Operator::Mul),
    ("/", Operator::Div),
    ("%", Operator::Rem),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("≤", Operator::Le),
    ("≥", Operator::Ge),
    ("≠", Operator::Ne),
];

impl Operator {
    /// Looks up an operator by any of its spellings.
    pub fn from_token(token: &str) -> Option<Operator> {
        OPERATOR_TOKENS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, op)| *op)
    }

    /// Looks up a single-character operator.
    pub fn from_char(c: char) -> Option<Operator> {
        let mut buf = [0u8; 4];
        Operator::from_token(c.encode_utf8(&mut buf))
    }

    /// Canonical spelling.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Rem
        )
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Operand(String),
    Op(&'static str),
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn is_operator_start(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '&' | '|' | '≤' | '≥' | '≠'
    )
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn tokens(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let pos = self.pos;
            let Some(c) = self.peek() else {
                return Ok(tokens);
            };
            let expects_operand = matches!(
                tokens.last().map(|t| &t.kind),
                None | Some(TokenKind::Op(_)) | Some(TokenKind::LParen)
            );

            let kind = if c == '(' {
                self.bump();
                TokenKind::LParen
            } else if c == ')' {
                self.bump();
                TokenKind::RParen
            } else if c == '\'' || c == '"' {
                self.quoted(c)?;
                TokenKind::Operand(self.src[pos..self.pos].to_string())
            } else if expects_operand
                && c == '-'
                && self.peek_at(1).is_some_and(|n| n.is_ascii_digit() || n == '.')
            {
                self.bump();
                self.word()?;
                TokenKind::Operand(self.src[pos..self.pos].to_string())
            } else if let Some(op) = self.operator() {
                TokenKind::Op(op)
            } else {
                self.word()?;
                if self.pos == pos {
                    return Err(ParseError::new(pos, ParseErrorKind::UnexpectedChar(c)));
                }
                TokenKind::Operand(self.src[pos..self.pos].to_string())
            };
            tokens.push(Token { kind, pos });
        }
    }

    fn operator(&mut self) -> Option<&'static str> {
        let rest = &self.src[self.pos..];
        let (token, _) = OPERATOR_TOKENS.iter().find(|(t, _)| rest.starts_with(t))?;
        self.pos += token.len();
        Some(*token)
    }

    fn quoted(&mut self, quote: char) -> Result<(), ParseError> {
        let open = self.pos;
        self.bump();
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

    /// A path or number token, including balanced `{}`, `[]` and `()` groups.
    fn word(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                '{' | '[' => self.group(c)?,
                '(' if self.pos > start => self.group(c)?,
                '+' | '-' if self.in_exponent(start) => {
                    self.bump();
                }
                '-' if self.hyphen_in_name(start) => {
                    self.bump();
                }
                '!' if self.peek_at(1) == Some('=') => break,
                c if c.is_whitespace() || c == ')' || c == '(' || is_operator_start(c) => break,
                _ => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    /// True when the cursor sits on the sign of a float exponent, as in `1e-5`.
    fn in_exponent(&self, start: usize) -> bool {
        let word = &self.src[start..self.pos];
        let Some(mantissa) = word.strip_suffix(['e', 'E']) else {
            return false;
        };
        let mantissa = mantissa.strip_prefix('-').unwrap_or(mantissa);
        !mantissa.is_empty()
            && mantissa.bytes().all(|b| b.is_ascii_digit() || b == b'.')
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
    }

    /// True when the cursor sits on a hyphen inside a name, as in `max-size`.
    fn hyphen_in_name(&self, start: usize) -> bool {
        let word = &self.src[start..self.pos];
        let is_letter = |c: char| c.is_alphabetic() || c == '_';
        word.chars().next().is_some_and(|c| is_letter(c) || c == '!')
            && word.chars().next_back().is_some_and(|c| is_letter(c) || c.is_ascii_digit())
            && self.peek_at(1).is_some_and(is_letter)
    }

    /// Skips a balanced group opened at the cursor, tracking nesting on a stack.
    fn group(&mut self, open: char) -> Result<(), ParseError> {
        let mut open_at: Vec<(char, usize)> = Vec::new();
        let mut next = Some(open);
        loop {
            match next {
                None => {
                    let (open, at) = open_at.last().copied().unwrap_or((open, self.pos));
                    let kind = match open {
                        '{' => ParseErrorKind::UnterminatedBrace,
                        '[' => ParseErrorKind::UnterminatedBracket,
                        _ => ParseErrorKind::UnterminatedParen,
                    };
                    return Err(ParseError::new(at, kind));
                }
                Some(q @ ('\'' | '"')) => self.quoted(q)?,
                Some(c @ ('{' | '[' | '(')) => {
                    if open_at.len() >= MAX_EXPRESSION_DEPTH {
                        return Err(self.error(ParseErrorKind::NestingTooDeep));
                    }
                    open_at.push((c, self.pos));
                    self.bump();
                }
                Some(c) if Some(c) == open_at.last().map(|(o, _)| closing(*o)) => {
                    self.bump();
                    open_at.pop();
                    if open_at.is_empty() {
                        return Ok(());
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
            next = self.peek();
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.pos, kind)
    }
}

fn closing(open: char) -> char {
    match open {
        '{' => '}',
        '[' => ']',
        _ => ')',
    }
}

struct ExprParser {
    tokens: Vec<Token>,
    next: usize,
    end: usize,
    /// Open parentheses around the cursor.
    nesting: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.next)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.next).cloned();
        self.next += 1;
        token
    }

    /// Parses operands joined by operators; returns the tree and its height.
    fn expression(&mut self) -> Result<(Graph, usize), ParseError> {
        let (mut left, mut height) = self.operand()?;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Op(op) => {
                    let pos = token.pos;
                    self.advance();
                    let (right, right_height) = self.operand()?;
                    height = height.max(right_height) + 1;
                    if height > MAX_EXPRESSION_DEPTH {
                        return Err(ParseError::new(pos, ParseErrorKind::NestingTooDeep));
                    }
                    let mut node = Graph::new(op);
                    node.add_node(left);
                    node.add_node(right);
                    left = node;
                }
                TokenKind::RParen => break,
                TokenKind::Operand(_) | TokenKind::LParen => {
                    return Err(ParseError::new(token.pos, ParseErrorKind::MissingOperator));
                }
            }
        }
        Ok((left, height))
    }

    fn operand(&mut self) -> Result<(Graph, usize), ParseError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Operand(text),
                ..
            }) => Ok((Graph::new(text), 0)),
            Some(Token {
                kind: TokenKind::LParen,
                pos,
            }) => {
                if self.nesting >= MAX_EXPRESSION_DEPTH {
                    return Err(ParseError::new(pos, ParseErrorKind::NestingTooDeep));
                }
                self.nesting += 1;
                let inner = self.expression()?;
                self.nesting -= 1;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    _ => Err(ParseError::new(pos, ParseErrorKind::UnterminatedParen)),
                }
            }
            Some(token) => Err(ParseError::new(token.pos, ParseErrorKind::MissingOperand)),
            None => Err(ParseError::new(self.end, ParseErrorKind::MissingOperand)),
        }
    }
}

/// Compiles expression text into an expression graph.
pub fn parse_expression(text: &str) -> Result<Graph, ParseError> {
    let tokens = Lexer { src: text, pos: 0 }.tokens()?;
    let mut parser = ExprParser {
        tokens,
        next: 0,
        end: text.len(),
        nesting: 0,
    };
    let (tree, _) = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(ParseError::new(token.pos, ParseErrorKind::UnexpectedChar(')')));
    }
    let mut root = Graph::new(EXPRESSION_MARKER);
    root.add_node(tree);
    Ok(root)
}
