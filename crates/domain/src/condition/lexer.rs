//! Tokenizer for trigger conditions.

use std::iter::Peekable;
use std::str::CharIndices;

use super::CompareOp;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Ident(String),
    Number(f64),
    And,
    Or,
    Plus,
    Minus,
    LParen,
    RParen,
    Compare(CompareOp),
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier {name:?}"),
            Self::Number(n) => write!(f, "number {n}"),
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Compare(op) => write!(f, "'{op}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

/// Split `text` into tokens.
///
/// Keywords are case-insensitive. `NOT`, `!`, `*`, `/` and `%` are rejected
/// as unsupported operators rather than unknown characters.
pub(super) fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut chars = text.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some(&(position, ch)) = chars.peek() {
        let kind = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => number(text, &mut chars)?,
            c if c.is_ascii_alphabetic() || c == '_' => word(text, &mut chars)?,
            '(' => single(&mut chars, TokenKind::LParen),
            ')' => single(&mut chars, TokenKind::RParen),
            '+' => single(&mut chars, TokenKind::Plus),
            '-' => single(&mut chars, TokenKind::Minus),
            '>' => with_optional_eq(&mut chars, CompareOp::Gt, CompareOp::Ge),
            '<' => with_optional_eq(&mut chars, CompareOp::Lt, CompareOp::Le),
            '=' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err(ParseError::UnexpectedChar { ch: '=', position });
                }
                TokenKind::Compare(CompareOp::Eq)
            }
            '!' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err(ParseError::UnsupportedOperator {
                        operator: "!",
                        position,
                    });
                }
                TokenKind::Compare(CompareOp::Ne)
            }
            '*' | '/' | '%' => {
                return Err(ParseError::UnsupportedOperator {
                    operator: match ch {
                        '*' => "*",
                        '/' => "/",
                        _ => "%",
                    },
                    position,
                });
            }
            other => {
                return Err(ParseError::UnexpectedChar {
                    ch: other,
                    position,
                });
            }
        };
        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

fn single(chars: &mut Peekable<CharIndices<'_>>, kind: TokenKind) -> TokenKind {
    chars.next();
    kind
}

fn with_optional_eq(
    chars: &mut Peekable<CharIndices<'_>>,
    strict: CompareOp,
    inclusive: CompareOp,
) -> TokenKind {
    chars.next();
    if chars.next_if(|&(_, c)| c == '=').is_some() {
        TokenKind::Compare(inclusive)
    } else {
        TokenKind::Compare(strict)
    }
}

/// Consume a run of `pred` characters and return the matched slice.
fn take_while<'a>(
    text: &'a str,
    chars: &mut Peekable<CharIndices<'_>>,
    pred: impl Fn(char) -> bool,
) -> (usize, &'a str) {
    let start = chars.peek().map_or(text.len(), |&(i, _)| i);
    let mut end = start;
    while let Some((i, c)) = chars.next_if(|&(_, c)| pred(c)) {
        end = i + c.len_utf8();
    }
    (start, &text[start..end])
}

fn number(text: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<TokenKind, ParseError> {
    let (position, literal) = take_while(text, chars, |c| c.is_ascii_digit() || c == '.');
    literal
        .parse::<f64>()
        .map(TokenKind::Number)
        .map_err(|_| ParseError::InvalidNumber {
            text: literal.to_string(),
            position,
        })
}

fn word(text: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<TokenKind, ParseError> {
    let (position, word) = take_while(text, chars, |c| c.is_ascii_alphanumeric() || c == '_');
    if word.eq_ignore_ascii_case("and") {
        Ok(TokenKind::And)
    } else if word.eq_ignore_ascii_case("or") {
        Ok(TokenKind::Or)
    } else if word.eq_ignore_ascii_case("not") {
        Err(ParseError::UnsupportedOperator {
            operator: "NOT",
            position,
        })
    } else {
        Ok(TokenKind::Ident(word.to_string()))
    }
}
