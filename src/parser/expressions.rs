//! Expression parsing implementation
//!
//! Expressions are parsed with a fixed precedence ladder, one method per
//! level. Left recursion in the additive and multiplicative levels is
//! replaced by iterative tails that fold to the left.
//!
//! # Precedence (lowest first)
//!
//! | Level          | Operators                 | Associativity |
//! |----------------|---------------------------|---------------|
//! | relational     | `= <> < > <= >=`          | none (at most one) |
//! | additive       | `+ - or`                  | left          |
//! | multiplicative | `* / div mod and`         | left          |
//! | sign           | unary `+ -`               | prefix        |
//! | power          | `^`                       | right         |
//! | primary        | `not`, literals, names, calls, `( )` | prefix |
//!
//! # Grammar
//!
//! ```text
//! expr    → simple [ relop simple ]
//! simple  → term { ('+' | '-' | 'or') term }
//! term    → factor { ('*' | '/' | 'div' | 'mod' | 'and') factor }
//! factor  → '+' factor | '-' factor | power
//! power   → primary [ '^' power ]
//! primary → IDENT '(' [ expr { ',' expr } ] ')'
//!         | IDENT { '[' expr ']' }
//!         | NUMBER | '(' expr ')' | 'not' primary
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenSource};
use crate::parser::parse::{ParseError, Parser};

impl<S: TokenSource> Parser<S> {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_simple_expression()?;

        let location = self.current_location();
        let Some(op) = self.relational_operator() else {
            return Ok(left);
        };
        self.advance()?;
        let right = self.parse_simple_expression()?;

        if self.relational_operator().is_some() {
            return Err(ParseError {
                message: format!(
                    "Relational operators do not chain, found {} after a comparison",
                    self.current
                ),
                location: self.current_location(),
            });
        }

        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            location,
        })
    }

    fn relational_operator(&self) -> Option<BinOp> {
        match self.current {
            Token::Eq(_) => Some(BinOp::Eq),
            Token::Ne(_) => Some(BinOp::Ne),
            Token::Lt(_) => Some(BinOp::Lt),
            Token::Gt(_) => Some(BinOp::Gt),
            Token::Le(_) => Some(BinOp::Le),
            Token::Ge(_) => Some(BinOp::Ge),
            _ => None,
        }
    }

    /// Parse additive (+ - or)
    fn parse_simple_expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_term()?;
        self.parse_additive_tail(first)
    }

    fn parse_additive_tail(&mut self, mut left: Expr) -> Result<Expr, ParseError> {
        loop {
            let location = self.current_location();
            let op = match self.current {
                Token::Plus(_) => BinOp::Add,
                Token::Minus(_) => BinOp::Sub,
                Token::Or(_) => BinOp::Or,
                _ => return Ok(left),
            };
            self.advance()?;

            let right = Box::new(self.parse_term()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location,
            };
        }
    }

    /// Parse multiplicative (* / div mod and)
    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_factor()?;
        self.parse_multiplicative_tail(first)
    }

    fn parse_multiplicative_tail(&mut self, mut left: Expr) -> Result<Expr, ParseError> {
        loop {
            let location = self.current_location();
            let op = match self.current {
                Token::Star(_) => BinOp::Mul,
                Token::Slash(_) | Token::Div(_) => BinOp::Div,
                Token::Mod(_) => BinOp::Mod,
                Token::And(_) => BinOp::And,
                _ => return Ok(left),
            };
            self.advance()?;

            let right = Box::new(self.parse_factor()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location,
            };
        }
    }

    /// Parse unary sign
    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        match self.current {
            Token::Plus(_) => {
                self.advance()?;
                self.parse_factor()
            }
            Token::Minus(_) => {
                self.advance()?;
                let operand = Box::new(self.parse_factor()?);
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand,
                    location,
                })
            }
            Token::Ident(..) | Token::Number(..) | Token::LParen(_) | Token::Not(_) => {
                self.parse_power()
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parse power (^), right-associative
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;

        let location = self.current_location();
        if !self.match_token(&Token::Caret(location))? {
            return Ok(base);
        }

        let exponent = self.parse_power()?;
        Ok(Expr::Binary {
            op: BinOp::Exp,
            left: Box::new(base),
            right: Box::new(exponent),
            location,
        })
    }

    /// Parse primary expressions
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        match self.current {
            Token::Number(value, _) => {
                self.advance()?;
                Ok(Expr::Number(value))
            }
            Token::Ident(..) => {
                let name = self.expect_identifier("")?;
                if matches!(self.current, Token::LParen(_)) {
                    let args = self.parse_argument_list()?;
                    return Ok(Expr::Call {
                        name,
                        args,
                        location,
                    });
                }

                let mut indices = Vec::new();
                self.parse_index_chain(&mut indices)?;
                Ok(Expr::Var(VarAccess {
                    name,
                    indices,
                    location,
                }))
            }
            Token::LParen(_) => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect_rparen("to close parenthesized expression")?;
                Ok(inner)
            }
            Token::Not(_) => {
                self.advance()?;
                let operand = Box::new(self.parse_primary()?);
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand,
                    location,
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parse `( [expr {, expr}] )`
    pub(crate) fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_lparen("before arguments")?;

        let mut args = Vec::new();
        if matches!(self.current, Token::RParen(_)) {
            self.advance()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            match self.current {
                Token::Comma(_) => {
                    self.advance()?;
                }
                Token::RParen(_) => {
                    self.advance()?;
                    return Ok(args);
                }
                _ => return Err(self.unexpected("',' or ')' in argument list")),
            }
        }
    }
}
