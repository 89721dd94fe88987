//! Declaration parsing implementation
//!
//! This module handles the declaration part of a block:
//!
//! - Constant parts: `const N = 10; M = -1;`
//! - Variable parts: `var a, b: integer; v: array [1 .. 10] of integer;`
//! - Procedures: `procedure p(x: integer); forward;`
//! - Functions: `function f(x, y: integer): integer; begin ... end;`
//!
//! # Grammar
//!
//! ```text
//! block        → decl_list compound_stmt
//! decl_list    → { const_part | var_part | procedure | function }
//! const_part   → 'const' IDENT '=' constant ';' { IDENT '=' constant ';' }
//! constant     → NUMBER | '+' NUMBER | '-' NUMBER
//! var_part     → 'var' var_decl ';' { var_decl ';' }
//! var_decl     → ident_list ':' type
//! ident_list   → IDENT { ',' IDENT }
//! type         → 'integer' | 'array' '[' constant '..' constant ']' 'of' 'integer'
//! procedure    → 'procedure' IDENT [params] ';' routine_body ';'
//! function     → 'function' IDENT [params] ':' 'integer' ';' routine_body ';'
//! params       → '(' [ section { ';' section } ] ')'
//! section      → ident_list ':' 'integer'
//! routine_body → 'forward' | block
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenSource};
use crate::parser::parse::{ParseError, Parser};
use tracing::debug;

impl<S: TokenSource> Parser<S> {
    /// Parse a block: declarations then the compound body
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let decls = self.parse_declarations()?;
        let body = self.parse_compound_statement()?;
        Ok(Block { decls, body })
    }

    /// Parse the (possibly empty) declaration list up to `begin`
    pub(crate) fn parse_declarations(&mut self) -> Result<Vec<Decl>, ParseError> {
        let mut decls = Vec::new();

        loop {
            match self.current {
                Token::Const(_) => decls.extend(self.parse_const_part()?),
                Token::Var(_) => decls.extend(self.parse_var_part()?),
                Token::Procedure(_) => decls.push(self.parse_procedure()?),
                Token::Function(_) => decls.push(self.parse_function()?),
                Token::Begin(_) => return Ok(decls),
                _ => return Err(self.unexpected("declaration or 'begin'")),
            }
        }
    }

    fn parse_const_part(&mut self) -> Result<Vec<Decl>, ParseError> {
        self.expect(Token::Const, "")?;

        let mut decls = vec![self.parse_const_definition()?];
        while matches!(self.current, Token::Ident(..)) {
            decls.push(self.parse_const_definition()?);
        }
        Ok(decls)
    }

    fn parse_const_definition(&mut self) -> Result<Decl, ParseError> {
        let location = self.current_location();
        let name = self.expect_identifier("in constant definition")?;
        self.expect(Token::Eq, "after constant name")?;
        let value = self.parse_constant()?;
        self.expect_semicolon("after constant definition")?;
        Ok(Decl::Const {
            name,
            value,
            location,
        })
    }

    /// Parse an optionally signed integer constant
    pub(crate) fn parse_constant(&mut self) -> Result<i64, ParseError> {
        match self.current {
            Token::Number(..) => self.expect_number("in constant"),
            Token::Plus(_) => {
                self.advance()?;
                self.expect_number("after '+'")
            }
            Token::Minus(_) => {
                let location = self.current_location();
                self.advance()?;
                let value = self.expect_number("after '-'")?;
                value.checked_neg().ok_or_else(|| ParseError {
                    message: format!("Constant -{} is out of range", value),
                    location,
                })
            }
            _ => Err(self.unexpected("integer constant")),
        }
    }

    fn parse_var_part(&mut self) -> Result<Vec<Decl>, ParseError> {
        self.expect(Token::Var, "")?;

        let mut decls = self.parse_var_declaration()?;
        self.expect_semicolon("after variable declaration")?;
        while matches!(self.current, Token::Ident(..)) {
            decls.extend(self.parse_var_declaration()?);
            self.expect_semicolon("after variable declaration")?;
        }
        Ok(decls)
    }

    /// Parse `a, b, c : type`, attaching the type to every name of the run
    fn parse_var_declaration(&mut self) -> Result<Vec<Decl>, ParseError> {
        let mut run = self.parse_identifier_list()?;
        self.expect(Token::Colon, "after variable names")?;
        let ty = self.parse_type()?;

        for decl in &mut run {
            decl.add_type(&ty);
        }
        Ok(run)
    }

    /// Parse `IDENT {, IDENT}` into untyped variable declarations
    fn parse_identifier_list(&mut self) -> Result<Vec<Decl>, ParseError> {
        let mut run = Vec::new();
        loop {
            let location = self.current_location();
            let name = self.expect_identifier("in identifier list")?;
            run.push(Decl::Var(VarDecl {
                name,
                ty: None,
                location,
            }));

            if !self.match_token(&Token::Comma(location))? {
                return Ok(run);
            }
        }
    }

    /// Parse `integer` or `array [lo .. hi] of integer`
    pub(crate) fn parse_type(&mut self) -> Result<Type, ParseError> {
        match self.current {
            Token::Integer(_) => {
                self.advance()?;
                Ok(Type::Int)
            }
            Token::Array(_) => {
                self.advance()?;
                self.expect(Token::LBracket, "after 'array'")?;
                let from = self.parse_constant()?;
                self.expect(Token::DotDot, "in array bounds")?;
                let to = self.parse_constant()?;
                self.expect(Token::RBracket, "after array bounds")?;
                self.expect(Token::Of, "after array bounds")?;
                self.expect(Token::Integer, "as array element type")?;
                Ok(Type::Array { from, to })
            }
            _ => Err(self.unexpected("type")),
        }
    }

    /// Parse a procedure header and its body or `forward`
    fn parse_procedure(&mut self) -> Result<Decl, ParseError> {
        let location = self.expect(Token::Procedure, "")?;
        let name = self.expect_identifier("after 'procedure'")?;

        let params = match self.current {
            Token::LParen(_) => Some(self.parse_formal_parameters()?),
            Token::Semicolon(_) => None,
            _ => return Err(self.unexpected("'(' or ';' after procedure name")),
        };
        self.expect_semicolon("after procedure header")?;

        debug!(procedure = %name, "parsing procedure");
        let body = self.parse_routine_body()?;
        self.expect_semicolon("after procedure")?;

        Ok(Decl::Procedure(RoutineDecl {
            name,
            params,
            body,
            location,
        }))
    }

    /// Parse a function header (always returning `integer`) and its body or `forward`
    fn parse_function(&mut self) -> Result<Decl, ParseError> {
        let location = self.expect(Token::Function, "")?;
        let name = self.expect_identifier("after 'function'")?;

        let params = match self.current {
            Token::LParen(_) => Some(self.parse_formal_parameters()?),
            Token::Colon(_) => None,
            _ => return Err(self.unexpected("'(' or ':' after function name")),
        };
        self.expect(Token::Colon, "before function result type")?;
        self.expect(Token::Integer, "as function result type")?;
        self.expect_semicolon("after function header")?;

        debug!(function = %name, "parsing function");
        let body = self.parse_routine_body()?;
        self.expect_semicolon("after function")?;

        Ok(Decl::Function(RoutineDecl {
            name,
            params,
            body,
            location,
        }))
    }

    fn parse_routine_body(&mut self) -> Result<Option<Box<Block>>, ParseError> {
        match self.current {
            Token::Forward(_) => {
                self.advance()?;
                Ok(None)
            }
            Token::Const(_)
            | Token::Var(_)
            | Token::Procedure(_)
            | Token::Function(_)
            | Token::Begin(_) => Ok(Some(Box::new(self.parse_block()?))),
            _ => Err(self.unexpected("'forward' or routine body")),
        }
    }

    /// Parse `( [section {; section}] )`; only integer parameters exist
    fn parse_formal_parameters(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect_lparen("before parameters")?;

        let mut params = Vec::new();
        if matches!(self.current, Token::RParen(_)) {
            self.advance()?;
            return Ok(params);
        }

        loop {
            for decl in self.parse_identifier_list()? {
                params.push(Param {
                    name: decl.name().to_string(),
                    location: decl.location(),
                });
            }
            self.expect(Token::Colon, "after parameter names")?;

            let location = self.current_location();
            if self.parse_type()?.is_array() {
                return Err(ParseError {
                    message: "Array parameters are not supported".to_string(),
                    location,
                });
            }

            match self.current {
                Token::Semicolon(_) => {
                    self.advance()?;
                }
                Token::RParen(_) => {
                    self.advance()?;
                    return Ok(params);
                }
                _ => return Err(self.unexpected("';' or ')' in parameter list")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn parse(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    #[test]
    fn test_var_run_shares_type() {
        let program =
            parse("program p; var a, b: integer; v: array [-2 .. 5] of integer; begin end.");
        let decls = &program.block.decls;

        assert_eq!(decls.len(), 3);
        for (decl, name) in decls.iter().zip(["a", "b"]) {
            match decl {
                Decl::Var(var) => {
                    assert_eq!(var.name, name);
                    assert_eq!(var.ty, Some(Type::Int));
                }
                _ => panic!("Expected variable declaration"),
            }
        }
        match &decls[2] {
            Decl::Var(var) => assert_eq!(var.ty, Some(Type::Array { from: -2, to: 5 })),
            _ => panic!("Expected variable declaration"),
        }
    }

    #[test]
    fn test_constants() {
        let program = parse("program p; const a = 1; b = -7; c = +3; begin end.");
        let values: Vec<_> = program
            .block
            .decls
            .iter()
            .map(|d| match d {
                Decl::Const { value, .. } => *value,
                _ => panic!("Expected constant"),
            })
            .collect();
        assert_eq!(values, vec![1, -7, 3]);
    }

    #[test]
    fn test_forward_then_definition() {
        let program = parse(
            "program p;
             procedure q(x: integer); forward;
             procedure q(x: integer); begin writeln(x) end;
             begin q(1) end.",
        );

        match (&program.block.decls[0], &program.block.decls[1]) {
            (Decl::Procedure(fwd), Decl::Procedure(def)) => {
                assert!(fwd.is_forward());
                assert!(!def.is_forward());
                assert_eq!(def.param_names(), ["x"]);
            }
            _ => panic!("Expected two procedure declarations"),
        }
    }

    #[test]
    fn test_parameter_sections() {
        let program = parse(
            "program p;
             function f(a, b: integer; c: integer): integer; begin f := a end;
             begin end.",
        );
        match &program.block.decls[0] {
            Decl::Function(f) => {
                assert_eq!(f.param_names(), ["a", "b", "c"]);
                let columns: Vec<_> = f.parameters().iter().map(|p| p.location.column).collect();
                assert_eq!(columns, vec![25, 28, 40]);
            }
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_empty_parens_distinct_from_none() {
        let program = parse(
            "program p;
             procedure a(); begin end;
             procedure b; begin end;
             begin end.",
        );
        match (&program.block.decls[0], &program.block.decls[1]) {
            (Decl::Procedure(a), Decl::Procedure(b)) => {
                assert_eq!(a.params, Some(vec![]));
                assert_eq!(b.params, None);
            }
            _ => panic!("Expected procedures"),
        }
    }

    #[test]
    fn test_nested_routines() {
        let program = parse(
            "program p;
             function outer: integer;
               var t: integer;
               function inner: integer; begin inner := 2 end;
             begin outer := inner end;
             begin end.",
        );
        match &program.block.decls[0] {
            Decl::Function(outer) => {
                let body = outer.body.as_ref().unwrap();
                assert_eq!(body.decls.len(), 2);
                assert!(matches!(body.decls[1], Decl::Function(_)));
            }
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_rejected_declarations() {
        for source in [
            "program p; var a, : integer; begin end.",
            "program p; var a: integer begin end.",
            "program p; procedure q(a: integer;); begin end; begin end.",
            "program p; procedure q(a: array [1 .. 2] of integer); begin end; begin end.",
            "program p; function f; begin end; begin end.",
            "program p; const a = x; begin end.",
            "program p; x := 1; begin end.",
        ] {
            assert!(
                Parser::new(source).unwrap().parse_program().is_err(),
                "should reject: {}",
                source
            );
        }
    }
}
