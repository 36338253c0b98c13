// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tokenizer and recursive-descent parser for the map expression.
//!
//! The grammar is deliberately tiny: sums, differences, products,
//! quotients and integer powers of numeric literals, the two
//! variables `z` and `c`, and `I` for the imaginary unit.  Anything
//! else, in particular a function call like `sin(z)`, is rejected
//! here rather than discovered halfway through a render.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := ('+' | '-') unary | power
//! power  := atom (('**' | '^') unary)?
//! atom   := number | imaginary | 'I' | 'z' | 'c' | '(' expr ')'
//! ```

use num::complex::Complex64;

use crate::error::ParseError;

/// The abstract syntax tree of a map expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal, real or imaginary.
    Const(Complex64),
    /// The iterate.
    Z,
    /// The fixed parameter.
    C,
    /// Unary minus.
    Neg(Box<Expr>),
    /// `lhs + rhs`
    Add(Box<Expr>, Box<Expr>),
    /// `lhs - rhs`
    Sub(Box<Expr>, Box<Expr>),
    /// `lhs * rhs`
    Mul(Box<Expr>, Box<Expr>),
    /// `lhs / rhs`; the divisor has to turn out constant.
    Div(Box<Expr>, Box<Expr>),
    /// `base ** exponent`; the exponent has to turn out to be a
    /// non-negative integer constant.
    Pow(Box<Expr>, Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Imaginary(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Imaginary(n) => format!("imaginary number {}j", n),
            Token::Ident(name) => format!("'{}'", name),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Power => "'**'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// Splits the expression into (offset, token) pairs, always ending
/// with `Eof`.
fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let ch = bytes[pos];
        match ch {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'+' => tokens.push((start, Token::Plus)),
            b'-' => tokens.push((start, Token::Minus)),
            b'/' => tokens.push((start, Token::Slash)),
            b'^' => tokens.push((start, Token::Power)),
            b'(' => tokens.push((start, Token::LParen)),
            b')' => tokens.push((start, Token::RParen)),
            b'*' => {
                if bytes.get(pos + 1) == Some(&b'*') {
                    pos += 1;
                    tokens.push((start, Token::Power));
                } else {
                    tokens.push((start, Token::Star));
                }
            }
            b'0'..=b'9' | b'.' => {
                let (token, end) = lex_number(source, start)?;
                tokens.push((start, token));
                pos = end;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                tokens.push((start, Token::Ident(source[start..pos].to_string())));
                continue;
            }
            _ => {
                let bad = source[start..].chars().next().unwrap_or('?');
                return Err(ParseError::at(
                    start,
                    format!("unexpected character '{}'", bad),
                ));
            }
        }
        pos += 1;
    }

    tokens.push((source.len(), Token::Eof));
    Ok(tokens)
}

/// Reads a decimal literal with optional fraction, exponent, and a
/// trailing `j`/`J` marking it imaginary.
fn lex_number(source: &str, start: usize) -> Result<(Token, usize), ParseError> {
    let bytes = source.as_bytes();
    let mut pos = start;
    let digits = |pos: &mut usize| {
        while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
            *pos += 1;
        }
    };

    digits(&mut pos);
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        digits(&mut pos);
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut look = pos + 1;
        if look < bytes.len() && (bytes[look] == b'+' || bytes[look] == b'-') {
            look += 1;
        }
        if look < bytes.len() && bytes[look].is_ascii_digit() {
            pos = look;
            digits(&mut pos);
        }
    }

    let text = &source[start..pos];
    let value: f64 = text
        .parse()
        .map_err(|_| ParseError::at(start, format!("malformed number '{}'", text)))?;

    if pos < bytes.len() && (bytes[pos] == b'j' || bytes[pos] == b'J') {
        Ok((Token::Imaginary(value), pos + 1))
    } else {
        Ok((Token::Number(value), pos))
    }
}

/// Deepest syntax tree accepted.  Every later stage walks the tree
/// recursively, the compiled evaluator included, so this bounds the
/// stack they need.
pub const MAX_DEPTH: usize = 256;

/// Most syntax tree nodes accepted.
pub const MAX_NODES: usize = 10_000;

/// A parsed sub-tree and its depth.
type Parsed = Result<(Expr, usize), ParseError>;

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    nesting: usize,
    nodes: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].1
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].0
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].1.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> ParseError {
        ParseError::at(
            self.offset(),
            format!("unexpected {}", self.peek().describe()),
        )
    }

    /// Counts a new node over children at most `below` deep.
    fn node(&mut self, offset: usize, below: usize) -> Result<usize, ParseError> {
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(ParseError::at(
                offset,
                format!("expression has more than {} terms and operators", MAX_NODES),
            ));
        }
        let depth = below + 1;
        if depth > MAX_DEPTH {
            return Err(ParseError::at(
                offset,
                format!("expression nests more than {} levels deep", MAX_DEPTH),
            ));
        }
        Ok(depth)
    }

    fn expr(&mut self) -> Parsed {
        let (mut lhs, mut depth) = self.term()?;
        loop {
            let offset = self.offset();
            let build: fn(Box<Expr>, Box<Expr>) -> Expr = match self.peek() {
                Token::Plus => Expr::Add,
                Token::Minus => Expr::Sub,
                _ => return Ok((lhs, depth)),
            };
            self.advance();
            let (rhs, below) = self.term()?;
            depth = self.node(offset, depth.max(below))?;
            lhs = build(Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Parsed {
        let (mut lhs, mut depth) = self.unary()?;
        loop {
            let offset = self.offset();
            let build: fn(Box<Expr>, Box<Expr>) -> Expr = match self.peek() {
                Token::Star => Expr::Mul,
                Token::Slash => Expr::Div,
                _ => return Ok((lhs, depth)),
            };
            self.advance();
            let (rhs, below) = self.unary()?;
            depth = self.node(offset, depth.max(below))?;
            lhs = build(Box::new(lhs), Box::new(rhs));
        }
    }

    /// Every recursive path in the grammar passes through here, so
    /// this is where the parser's own stack is bounded.
    fn unary(&mut self) -> Parsed {
        self.nesting += 1;
        let parsed = if self.nesting > MAX_DEPTH {
            Err(ParseError::at(
                self.offset(),
                format!("expression nests more than {} levels deep", MAX_DEPTH),
            ))
        } else {
            self.signed()
        };
        self.nesting -= 1;
        parsed
    }

    fn signed(&mut self) -> Parsed {
        let offset = self.offset();
        match self.peek() {
            Token::Minus => {
                self.advance();
                let (inner, below) = self.unary()?;
                let depth = self.node(offset, below)?;
                Ok((Expr::Neg(Box::new(inner)), depth))
            }
            Token::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Parsed {
        let (base, depth) = self.atom()?;
        let offset = self.offset();
        if let Token::Power = self.peek() {
            self.advance();
            let (exponent, below) = self.unary()?;
            let depth = self.node(offset, depth.max(below))?;
            return Ok((Expr::Pow(Box::new(base), Box::new(exponent)), depth));
        }
        Ok((base, depth))
    }

    fn leaf(&mut self, offset: usize, expr: Expr) -> Parsed {
        self.advance();
        let depth = self.node(offset, 0)?;
        Ok((expr, depth))
    }

    fn atom(&mut self) -> Parsed {
        let offset = self.offset();
        let token = self.peek().clone();
        match token {
            Token::Number(n) => self.leaf(offset, Expr::Const(Complex64::new(n, 0.0))),
            Token::Imaginary(n) => self.leaf(offset, Expr::Const(Complex64::new(0.0, n))),
            Token::Ident(name) => match name.as_str() {
                "z" => self.leaf(offset, Expr::Z),
                "c" => self.leaf(offset, Expr::C),
                "I" => self.leaf(offset, Expr::Const(Complex64::new(0.0, 1.0))),
                _ => {
                    self.advance();
                    match self.peek() {
                        Token::LParen => Err(ParseError::at(
                            offset,
                            format!(
                                "function '{}' is not allowed; only polynomials in z and c",
                                name
                            ),
                        )),
                        _ => Err(ParseError::at(
                            offset,
                            format!("unknown symbol '{}'; use z, c and I", name),
                        )),
                    }
                }
            },
            Token::LParen => {
                self.advance();
                let inner = self.expr()?;
                match self.peek() {
                    Token::RParen => {
                        self.advance();
                        Ok(inner)
                    }
                    _ => Err(ParseError::at(
                        self.offset(),
                        format!("expected ')' to close '(' at offset {}", offset),
                    )),
                }
            }
            _ => Err(self.unexpected()),
        }
    }
}

/// Parses an expression into its syntax tree.  No algebra happens
/// here; exponents and divisors are checked later, once they can be
/// reduced.  Trees deeper than `MAX_DEPTH` or larger than `MAX_NODES`
/// are refused.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        nodes: 0,
    };
    if let Token::Eof = parser.peek() {
        return Err(ParseError::whole("empty expression"));
    }
    let (tree, _) = parser.expr()?;
    match parser.peek() {
        Token::Eof => Ok(tree),
        _ => Err(parser.unexpected()),
    }
}
