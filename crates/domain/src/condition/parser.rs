//! Recursive-descent parser producing an [`Expression`].
//!
//! ```text
//! expression := term ( ("AND" | "OR") term )*
//! term       := comparison | "(" expression ")"
//! comparison := arithmetic op number
//! arithmetic := operand ( ("+" | "-") operand )*
//! operand    := identifier | number | "(" arithmetic ")"
//! number     := "-"? literal
//! ```
//!
//! A `(` in term position is ambiguous between an arithmetic group
//! (`(a - b) > 5`) and a boolean group (`(a > 1 OR b > 1)`). The parser
//! tries the comparison first and backtracks to the boolean group; when
//! both fail, the error that got furthest into the text is reported.

use super::lexer::{self, Token, TokenKind};
use super::{Arithmetic, CompareOp, Expression, LogicalOp};
use crate::error::ParseError;

/// Parse condition text into an [`Expression`].
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first grammar violation.
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    let tokens = lexer::tokenize(text)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expression = parser.expression()?;
    match parser.peek() {
        None => Ok(expression),
        Some(token) => Err(unexpected("AND, OR or end of condition", token)),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn next_if(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ParseError> {
        match self.next() {
            Some(token) if &token.kind == kind => Ok(()),
            Some(token) => Err(unexpected(expected, &token)),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    /// Terms joined by AND/OR, folded strictly left to right.
    fn expression(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::And) => LogicalOp::And,
                Some(TokenKind::Or) => LogicalOp::Or,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expression::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        if self.peek().map(|t| &t.kind) != Some(&TokenKind::LParen) {
            return self.comparison();
        }

        let start = self.pos;
        let comparison_err = match self.comparison() {
            Ok(expression) => return Ok(expression),
            Err(err) => err,
        };

        self.pos = start;
        self.expect(&TokenKind::LParen, "'('")?;
        let group = self
            .expression()
            .and_then(|inner| self.expect(&TokenKind::RParen, "')'").map(|()| inner));
        group.map_err(|group_err| furthest(comparison_err, group_err))
    }

    fn comparison(&mut self) -> Result<Expression, ParseError> {
        let left = self.arithmetic()?;
        let op = match self.next() {
            Some(Token {
                kind: TokenKind::Compare(op),
                ..
            }) => op,
            Some(token) => return Err(unexpected("comparison operator", &token)),
            None => {
                return Err(ParseError::UnexpectedEnd {
                    expected: "comparison operator",
                });
            }
        };
        let right = self.number()?;
        Ok(Expression::Compare { left, op, right })
    }

    fn arithmetic(&mut self) -> Result<Arithmetic, ParseError> {
        let mut left = self.operand()?;
        loop {
            if self.next_if(&TokenKind::Plus) {
                let right = self.operand()?;
                left = Arithmetic::Add(Box::new(left), Box::new(right));
            } else if self.next_if(&TokenKind::Minus) {
                let right = self.operand()?;
                left = Arithmetic::Sub(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn operand(&mut self) -> Result<Arithmetic, ParseError> {
        const EXPECTED: &str = "identifier, number or '('";
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::Ident(name)) => {
                self.pos += 1;
                Ok(Arithmetic::Variable(name))
            }
            Some(TokenKind::Number(_) | TokenKind::Minus) => self.number().map(Arithmetic::Number),
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let inner = self.arithmetic()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            Some(_) => Err(unexpected(EXPECTED, &self.tokens[self.pos])),
            None => Err(ParseError::UnexpectedEnd { expected: EXPECTED }),
        }
    }

    /// A numeric literal with an optional leading sign. A `-` in front of
    /// anything but a literal would be unary negation, which the grammar
    /// does not have.
    fn number(&mut self) -> Result<f64, ParseError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Number(n),
                ..
            }) => Ok(n),
            Some(Token {
                kind: TokenKind::Minus,
                position,
            }) => match self.next() {
                Some(Token {
                    kind: TokenKind::Number(n),
                    ..
                }) => Ok(-n),
                Some(_) => Err(ParseError::UnsupportedOperator {
                    operator: "unary -",
                    position,
                }),
                None => Err(ParseError::UnexpectedEnd { expected: "number" }),
            },
            Some(token) => Err(unexpected("number", &token)),
            None => Err(ParseError::UnexpectedEnd { expected: "number" }),
        }
    }
}

fn unexpected(expected: &'static str, token: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        expected,
        found: token.kind.to_string(),
        position: token.position,
    }
}

/// Pick the error located further into the text. Running out of input
/// counts as the furthest point.
fn furthest(a: ParseError, b: ParseError) -> ParseError {
    fn reach(err: &ParseError) -> usize {
        match err {
            ParseError::UnexpectedEnd { .. } | ParseError::Empty => usize::MAX,
            ParseError::UnexpectedChar { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::UnsupportedOperator { position, .. } => *position,
        }
    }
    if reach(&b) >= reach(&a) { b } else { a }
}
