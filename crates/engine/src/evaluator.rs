//! Arithmetic evaluation of invoice operations.
//!
//! The ledger only needs `text -> number`, so evaluation sits behind the
//! [`Evaluator`] trait. [`Calculator`] is the default implementation: a small
//! recursive-descent parser over [`Decimal`] supporting `+ - * /`, unary
//! signs, parentheses and decimal literals with the usual precedence and left
//! associativity.

use std::{iter::Peekable, str::CharIndices, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

/// Errors raised while parsing or computing an expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number \"{0}\"")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("numeric overflow")]
    Overflow,
    #[error("expression nested too deeply")]
    NestingTooDeep,
}

/// Turns an arithmetic expression into a number.
pub trait Evaluator: Send + Sync + std::fmt::Debug {
    fn evaluate(&self, expression: &str) -> Result<Decimal, EvaluationError>;
}

/// Default [`Evaluator`] backed by [`Decimal`] arithmetic.
#[derive(Clone, Copy, Debug, Default)]
pub struct Calculator;

impl Evaluator for Calculator {
    fn evaluate(&self, expression: &str) -> Result<Decimal, EvaluationError> {
        if expression.trim().is_empty() {
            return Err(EvaluationError::Empty);
        }

        let mut parser = Parser::new(expression);
        let value = parser.expression()?;
        parser.skip_whitespace();
        match parser.chars.peek() {
            Some(&(position, ch)) => Err(EvaluationError::UnexpectedCharacter { ch, position }),
            None => Ok(value),
        }
    }
}

/// Round to an integer, ties away from zero.
///
/// This is what fixed-point formatting with zero fraction digits does, so
/// `2.5` becomes `3` and `-2.5` becomes `-3`.
pub fn round_to_integer(value: Decimal) -> Result<i64, EvaluationError> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(EvaluationError::Overflow)
}

struct Parser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            depth: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
    }

    fn next_operator(&mut self, operators: &[char]) -> Option<char> {
        self.skip_whitespace();
        self.chars
            .next_if(|(_, ch)| operators.contains(ch))
            .map(|(_, ch)| ch)
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Decimal, EvaluationError> {
        let mut acc = self.term()?;
        while let Some(op) = self.next_operator(&['+', '-']) {
            let rhs = self.term()?;
            acc = match op {
                '+' => acc.checked_add(rhs),
                _ => acc.checked_sub(rhs),
            }
            .ok_or(EvaluationError::Overflow)?;
        }
        Ok(acc)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Decimal, EvaluationError> {
        let mut acc = self.unary()?;
        while let Some(op) = self.next_operator(&['*', '/']) {
            let rhs = self.unary()?;
            acc = match op {
                '*' => acc.checked_mul(rhs).ok_or(EvaluationError::Overflow)?,
                _ => {
                    if rhs.is_zero() {
                        return Err(EvaluationError::DivisionByZero);
                    }
                    acc.checked_div(rhs).ok_or(EvaluationError::Overflow)?
                }
            };
        }
        Ok(acc)
    }

    // unary := ('+' | '-') unary | primary
    fn unary(&mut self) -> Result<Decimal, EvaluationError> {
        match self.next_operator(&['+', '-']) {
            Some(sign) => {
                let value = self.nested(Self::unary)?;
                Ok(if sign == '-' { -value } else { value })
            }
            None => self.primary(),
        }
    }

    // primary := number | '(' expression ')'
    fn primary(&mut self) -> Result<Decimal, EvaluationError> {
        self.skip_whitespace();
        let Some(&(position, ch)) = self.chars.peek() else {
            return Err(EvaluationError::UnexpectedEnd);
        };

        if ch == '(' {
            self.chars.next();
            let value = self.nested(Self::expression)?;
            self.skip_whitespace();
            return match self.chars.next() {
                Some((_, ')')) => Ok(value),
                Some((position, ch)) => {
                    Err(EvaluationError::UnexpectedCharacter { ch, position })
                }
                None => Err(EvaluationError::UnexpectedEnd),
            };
        }

        if ch.is_ascii_digit() || ch == '.' {
            return self.number(position);
        }

        Err(EvaluationError::UnexpectedCharacter { ch, position })
    }

    fn number(&mut self, start: usize) -> Result<Decimal, EvaluationError> {
        let mut end = start;
        while let Some((position, ch)) = self
            .chars
            .next_if(|(_, ch)| ch.is_ascii_digit() || *ch == '.')
        {
            end = position + ch.len_utf8();
        }

        let literal = &self.source[start..end];
        if literal.matches('.').count() > 1 || literal == "." {
            return Err(EvaluationError::InvalidNumber(literal.to_string()));
        }

        let normalized = literal.trim_end_matches('.');
        let normalized = if normalized.starts_with('.') {
            format!("0{normalized}")
        } else {
            normalized.to_string()
        };
        Decimal::from_str(&normalized)
            .map_err(|_| EvaluationError::InvalidNumber(literal.to_string()))
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Decimal, EvaluationError>,
    ) -> Result<Decimal, EvaluationError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvaluationError::NestingTooDeep);
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str) -> Result<Decimal, EvaluationError> {
        Calculator.evaluate(expression)
    }

    fn eval_int(expression: &str) -> i64 {
        round_to_integer(eval(expression).unwrap()).unwrap()
    }

    #[test]
    fn respects_precedence_and_associativity() {
        assert_eq!(eval_int("0+1+2*3"), 7);
        assert_eq!(eval_int("100-10-5"), 85);
        assert_eq!(eval_int("100/10/5"), 2);
        assert_eq!(eval_int("2*(3+4)"), 14);
    }

    #[test]
    fn handles_signs_from_seeded_totals() {
        assert_eq!(eval_int("-5+3"), -2);
        assert_eq!(eval_int("-5*-3"), 15);
        assert_eq!(eval_int("5--3"), 8);
        assert_eq!(eval_int("0 + 12.5 * 2"), 25);
    }

    #[test]
    fn rounds_ties_away_from_zero() {
        assert_eq!(eval_int("5/2"), 3);
        assert_eq!(eval_int("-5/2"), -3);
        assert_eq!(eval_int("10/3"), 3);
        assert_eq!(eval_int("1/3*3"), 1);
    }

    #[test]
    fn accepts_loose_decimal_literals() {
        assert_eq!(eval(".5+.5").unwrap(), Decimal::ONE);
        assert_eq!(eval("1.+1").unwrap(), Decimal::from(2));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(eval(""), Err(EvaluationError::Empty));
        assert_eq!(eval("0+"), Err(EvaluationError::UnexpectedEnd));
        assert_eq!(eval("0+(1"), Err(EvaluationError::UnexpectedEnd));
        assert_eq!(
            eval("0+abc"),
            Err(EvaluationError::UnexpectedCharacter {
                ch: 'a',
                position: 2
            })
        );
        assert_eq!(
            eval("1 2"),
            Err(EvaluationError::UnexpectedCharacter {
                ch: '2',
                position: 2
            })
        );
        assert_eq!(
            eval("1.2.3"),
            Err(EvaluationError::InvalidNumber("1.2.3".to_string()))
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(eval("10/0"), Err(EvaluationError::DivisionByZero));
        assert_eq!(eval("10/(5-5)"), Err(EvaluationError::DivisionByZero));
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let expression = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(eval(&expression), Err(EvaluationError::NestingTooDeep));

        let unary = format!("{}1", "-".repeat(200));
        assert_eq!(eval(&unary), Err(EvaluationError::NestingTooDeep));
    }

    #[test]
    fn overflow_is_reported() {
        let huge = "79228162514264337593543950335";
        assert_eq!(eval(&format!("{huge}*10")), Err(EvaluationError::Overflow));
        assert_eq!(round_to_integer(Decimal::MAX), Err(EvaluationError::Overflow));
    }
}
