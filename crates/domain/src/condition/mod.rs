//! Condition: the restricted expression language of trigger conditions.
//!
//! Conditions are comparisons of a variable (or a sum/difference of
//! variables) against a number, combined with `AND` / `OR`:
//!
//! ```text
//! wind_speed > 8.0 OR wind_gust > 8.0
//! (wind_gust - wind_speed) > 5.0
//! precipitation > 0.2 AND time_hour >= 6 AND time_hour <= 9
//! ```
//!
//! `AND` and `OR` have **no relative precedence**: a chain is folded
//! strictly left to right, so `a OR b AND c` means `(a OR b) AND c`.
//! Existing conditions are written against that behaviour; use parentheses
//! to group differently.
//!
//! Evaluation is total. Unbound variables read as
//! [`NEUTRAL_VALUE`](crate::context::NEUTRAL_VALUE) and the grammar has no
//! division, so a parsed expression always yields a boolean.

mod lexer;
mod parser;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::error::ParseError;

pub use parser::parse;

/// Comparison operator between an arithmetic term and a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    /// Apply the comparison. Equality tolerates an `f64::EPSILON` difference.
    #[must_use]
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Self::Gt => left > right,
            Self::Lt => left < right,
            Self::Ge => left >= right,
            Self::Le => left <= right,
            Self::Eq => (left - right).abs() <= f64::EPSILON,
            Self::Ne => (left - right).abs() > f64::EPSILON,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Arithmetic {
    Variable(String),
    Number(f64),
    Add(Box<Arithmetic>, Box<Arithmetic>),
    Sub(Box<Arithmetic>, Box<Arithmetic>),
}

impl Arithmetic {
    #[must_use]
    pub fn evaluate(&self, context: &EvaluationContext) -> f64 {
        match self {
            Self::Variable(name) => context.get(name),
            Self::Number(n) => *n,
            Self::Add(l, r) => l.evaluate(context) + r.evaluate(context),
            Self::Sub(l, r) => l.evaluate(context) - r.evaluate(context),
        }
    }

    fn collect_variables<'a>(&'a self, into: &mut BTreeSet<&'a str>) {
        match self {
            Self::Variable(name) => {
                into.insert(name);
            }
            Self::Number(_) => {}
            Self::Add(l, r) | Self::Sub(l, r) => {
                l.collect_variables(into);
                r.collect_variables(into);
            }
        }
    }
}

impl fmt::Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => f.write_str(name),
            Self::Number(n) => write!(f, "{n}"),
            Self::Add(l, r) | Self::Sub(l, r) => {
                let sign = if matches!(self, Self::Add(..)) { '+' } else { '-' };
                write!(f, "{l} {sign} ")?;
                // operations fold left, so only a compound right side needs brackets
                if matches!(**r, Self::Add(..) | Self::Sub(..)) {
                    write!(f, "({r})")
                } else {
                    write!(f, "{r}")
                }
            }
        }
    }
}

/// A parsed trigger condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Compare {
        left: Arithmetic,
        op: CompareOp,
        right: f64,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    /// Parse condition text.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the text violates the grammar.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parser::parse(text)
    }

    /// Evaluate against `context`.
    #[must_use]
    pub fn evaluate(&self, context: &EvaluationContext) -> bool {
        match self {
            Self::Compare { left, op, right } => op.apply(left.evaluate(context), *right),
            Self::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => left.evaluate(context) && right.evaluate(context),
            Self::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => left.evaluate(context) || right.evaluate(context),
        }
    }

    /// Every variable name the expression reads.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, into: &mut BTreeSet<&'a str>) {
        match self {
            Self::Compare { left, .. } => left.collect_variables(into),
            Self::Logical { left, right, .. } => {
                left.collect_variables(into);
                right.collect_variables(into);
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { left, op, right } => {
                if matches!(left, Arithmetic::Add(..) | Arithmetic::Sub(..)) {
                    write!(f, "({left}) {op} {right}")
                } else {
                    write!(f, "{left} {op} {right}")
                }
            }
            Self::Logical { op, left, right } => {
                write!(f, "{left} {op} ")?;
                if matches!(**right, Self::Logical { .. }) {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
        }
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
