//! Statement parsing implementation
//!
//! This module handles parsing of all Mila statement forms:
//!
//! - Compound statements: `begin ... end`
//! - Assignments and procedure calls (disambiguated after the identifier)
//! - Control flow: `if`, `while`, `for ... to/downto`
//! - Jumps: `exit`, `break`
//! - Built-ins: `readln`, `write`, `writeln`, `inc`, `dec`
//!
//! # Grammar
//!
//! ```text
//! compound   → 'begin' statement { ';' statement } 'end'
//! statement  → IDENT ident_tail
//!            | compound
//!            | 'if' expr 'then' statement [ 'else' statement ]
//!            | 'while' expr 'do' statement
//!            | 'for' IDENT ':=' expr ('to' | 'downto') expr 'do' statement
//!            | 'exit' | 'break'
//!            | 'readln' '(' target ')' | 'inc' '(' target ')' | 'dec' '(' target ')'
//!            | 'write' '(' expr ')' | 'writeln' [ '(' [expr] ')' ]
//!            | ε
//! ident_tail → { '[' expr ']' } ':=' expr
//!            | '(' [ expr { ',' expr } ] ')'
//!            | ε
//! target     → IDENT { '[' expr ']' }
//! ```
//!
//! The empty statement is only accepted where it can be followed by `;`,
//! `end` or `else`.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenSource};
use crate::parser::parse::{ParseError, Parser};

impl<S: TokenSource> Parser<S> {
    /// Parse `begin stmt {; stmt} end`
    pub(crate) fn parse_compound_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Begin, "to open compound statement")?;

        let mut statements = vec![self.parse_statement()?];
        while matches!(self.current, Token::Semicolon(_)) {
            self.advance()?;
            statements.push(self.parse_statement()?);
        }

        self.expect(Token::End, "to close compound statement")?;
        Ok(Stmt::Compound(statements))
    }

    /// Parse a single statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();

        match self.current {
            Token::Ident(..) => {
                let name = self.expect_identifier("")?;
                self.parse_identifier_tail(name, location)
            }
            Token::Begin(_) => self.parse_compound_statement(),
            Token::If(_) => self.parse_if_statement(),
            Token::While(_) => self.parse_while_statement(),
            Token::For(_) => self.parse_for_statement(),
            Token::Exit(_) => {
                self.advance()?;
                Ok(Stmt::Exit { location })
            }
            Token::Break(_) => {
                self.advance()?;
                Ok(Stmt::Break { location })
            }
            Token::Readln(_) => {
                self.advance()?;
                Ok(Stmt::Readln(self.parse_parenthesized_target("readln")?))
            }
            Token::Inc(_) => {
                self.advance()?;
                Ok(Stmt::Inc(self.parse_parenthesized_target("inc")?))
            }
            Token::Dec(_) => {
                self.advance()?;
                Ok(Stmt::Dec(self.parse_parenthesized_target("dec")?))
            }
            Token::Write(_) => {
                self.advance()?;
                self.expect_lparen("after 'write'")?;
                let value = self.parse_expression()?;
                self.expect_rparen("after 'write' argument")?;
                Ok(Stmt::Write(value))
            }
            Token::Writeln(_) => {
                self.advance()?;
                self.parse_writeln_argument().map(Stmt::Writeln)
            }
            // Empty statement, legal only before its FOLLOW set
            Token::Semicolon(_) | Token::End(_) | Token::Else(_) => Ok(Stmt::Null),
            _ => Err(self.unexpected("statement")),
        }
    }

    /// Decide between assignment, call with arguments, and bare call
    fn parse_identifier_tail(
        &mut self,
        name: String,
        location: SourceLocation,
    ) -> Result<Stmt, ParseError> {
        match self.current {
            Token::LBracket(_) | Token::Assign(_) => {
                let mut target = VarTarget::new(name, location);
                self.parse_index_chain(&mut target.indices)?;
                self.expect(Token::Assign, "in assignment")?;
                let value = self.parse_expression()?;
                Ok(Stmt::Assign { target, value })
            }
            Token::LParen(_) => {
                let args = self.parse_argument_list()?;
                Ok(Stmt::ProcCall {
                    name,
                    args,
                    location,
                })
            }
            Token::Semicolon(_) | Token::End(_) | Token::Else(_) => Ok(Stmt::ProcCall {
                name,
                args: Vec::new(),
                location,
            }),
            _ => Err(self.unexpected("':=', '[', '(' or end of statement")),
        }
    }

    /// Parse `{ '[' expr ']' }` into `indices`
    pub(crate) fn parse_index_chain(&mut self, indices: &mut Vec<Expr>) -> Result<(), ParseError> {
        while matches!(self.current, Token::LBracket(_)) {
            self.advance()?;
            indices.push(self.parse_expression()?);
            self.expect(Token::RBracket, "after array index")?;
        }
        Ok(())
    }

    fn parse_parenthesized_target(&mut self, builtin: &str) -> Result<VarTarget, ParseError> {
        self.expect_lparen(&format!("after '{}'", builtin))?;
        let location = self.current_location();
        let name = self.expect_identifier(&format!("as '{}' argument", builtin))?;

        let mut target = VarTarget::new(name, location);
        self.parse_index_chain(&mut target.indices)?;

        self.expect_rparen(&format!("after '{}' argument", builtin))?;
        Ok(target)
    }

    /// `writeln`, `writeln()` and `writeln(expr)`
    fn parse_writeln_argument(&mut self) -> Result<Expr, ParseError> {
        if !matches!(self.current, Token::LParen(_)) {
            return Ok(Expr::Null);
        }
        self.advance()?;

        if matches!(self.current, Token::RParen(_)) {
            self.advance()?;
            return Ok(Expr::Null);
        }

        let value = self.parse_expression()?;
        self.expect_rparen("after 'writeln' argument")?;
        Ok(value)
    }

    /// Parse `if cond then stmt [else stmt]`; `else` binds to the nearest `if`
    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::If, "")?;
        let condition = self.parse_expression()?;
        self.expect(Token::Then, "after 'if' condition")?;
        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if matches!(self.current, Token::Else(_)) {
            self.advance()?;
            Box::new(self.parse_statement()?)
        } else {
            Box::new(Stmt::Null)
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::While, "")?;
        let condition = self.parse_expression()?;
        self.expect(Token::Do, "after 'while' condition")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// Parse `for v := from to|downto limit do stmt`
    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(Token::For, "")?;
        let var = self.expect_identifier("after 'for'")?;
        self.expect(Token::Assign, "after loop variable")?;
        let from = self.parse_expression()?;

        let direction = match self.current {
            Token::To(_) => Direction::Up,
            Token::Downto(_) => Direction::Down,
            _ => return Err(self.unexpected("'to' or 'downto'")),
        };
        self.advance()?;

        let to = self.parse_expression()?;
        self.expect(Token::Do, "after 'for' range")?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            var,
            from,
            direction,
            to,
            body,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn body(statements: &str) -> Vec<Stmt> {
        let source = format!("program t; begin {} end.", statements);
        let program = Parser::new(&source).unwrap().parse_program().unwrap();
        match program.block.body {
            Stmt::Compound(stmts) => stmts,
            _ => panic!("Expected compound statement"),
        }
    }

    #[test]
    fn test_assignment_versus_calls() {
        let stmts = body("x := 1; a[2] := 3; p(4, 5); q");

        assert!(matches!(
            &stmts[0],
            Stmt::Assign { target, .. } if target.name == "x" && target.indices.is_empty()
        ));
        assert!(matches!(
            &stmts[1],
            Stmt::Assign { target, .. } if target.indices.len() == 1
        ));
        match &stmts[2] {
            Stmt::ProcCall { name, args, .. } => {
                assert_eq!(name, "p");
                assert_eq!(args.len(), 2);
            }
            _ => panic!("Expected procedure call"),
        }
        assert!(matches!(
            &stmts[3],
            Stmt::ProcCall { name, args, .. } if name == "q" && args.is_empty()
        ));
    }

    #[test]
    fn test_empty_statements() {
        let stmts = body("; x := 1;");
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0], Stmt::Null);
        assert_eq!(stmts[2], Stmt::Null);
    }

    #[test]
    fn test_for_directions() {
        let stmts = body("for i := 1 to 3 do writeln(i); for i := 3 downto 1 do writeln(i)");
        assert!(matches!(
            &stmts[0],
            Stmt::For {
                direction: Direction::Up,
                ..
            }
        ));
        assert!(matches!(
            &stmts[1],
            Stmt::For {
                direction: Direction::Down,
                ..
            }
        ));
    }

    #[test]
    fn test_dangling_else_binds_inner() {
        let stmts = body("if a then if b then x := 1 else x := 2");
        match &stmts[0] {
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert_eq!(**else_branch, Stmt::Null);
                assert!(matches!(
                    &**then_branch,
                    Stmt::If { else_branch, .. } if matches!(**else_branch, Stmt::Assign { .. })
                ));
            }
            _ => panic!("Expected if statement"),
        }
    }

    #[test]
    fn test_builtins() {
        let stmts = body(
            "readln(a[1]); write(1); writeln; writeln(); writeln(2); inc(x); dec(y); exit; break",
        );

        assert!(matches!(&stmts[0], Stmt::Readln(t) if t.name == "a" && t.indices.len() == 1));
        assert!(matches!(&stmts[1], Stmt::Write(Expr::Number(1))));
        assert_eq!(stmts[2], Stmt::Writeln(Expr::Null));
        assert_eq!(stmts[3], Stmt::Writeln(Expr::Null));
        assert!(matches!(&stmts[4], Stmt::Writeln(Expr::Number(2))));
        assert!(matches!(&stmts[5], Stmt::Inc(t) if t.name == "x"));
        assert!(matches!(&stmts[6], Stmt::Dec(t) if t.name == "y"));
        assert!(matches!(&stmts[7], Stmt::Exit { .. }));
        assert!(matches!(&stmts[8], Stmt::Break { .. }));
    }

    #[test]
    fn test_rejected_statements() {
        for statements in [
            "x = 1",
            "x := 1 y := 2",
            "p(1,)",
            "for i := 1 do x := 1",
            "while x x := 1",
            "write",
            "a[1] + 2",
        ] {
            let source = format!("program t; begin {} end.", statements);
            assert!(
                Parser::new(&source).unwrap().parse_program().is_err(),
                "should reject: {}",
                statements
            );
        }
    }
}
