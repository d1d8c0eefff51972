use super::{Parser, SyntaxResult};
use crate::data::lex::Keyword;
use crate::data::prelude::*;

impl<I: Iterator<Item = Locatable<Token>>> Parser<I> {
    /// decl:
    ///     type_spec IDENT ';'
    ///   | type_spec IDENT '=' expr ';'
    ///   | type_spec IDENT '[' expr ']' ';'
    ///   | type_spec IDENT '(' params ')' compound_stmt
    pub(super) fn declaration(&mut self) -> SyntaxResult<Stmt> {
        let datatype = self.type_spec()?;
        let name = self.expect_id()?;
        match self.peek_token() {
            Some(Token::LeftParen) => self.function_definition(datatype, name),
            Some(Token::LeftBracket) => {
                let decl = self.array_declarator(datatype, name.data)?;
                Ok(name.location.with(StmtType::StaticArrayDecl(decl)))
            }
            _ => {
                let decl = self.var_declarator(datatype, name.data)?;
                Ok(name.location.with(StmtType::StaticVarDecl(decl)))
            }
        }
    }

    /// type_spec: VOID | BOOL | INT | FLOAT | CHAR
    pub(super) fn type_spec(&mut self) -> SyntaxResult<DataType> {
        match self.peek_token() {
            Some(Token::Keyword(k)) if k.is_type_specifier() => {
                let keyword = *k;
                let location = self.next_token().unwrap().location;
                Ok(DataType {
                    name: keyword.to_string().as_str().into(),
                    ctype: None,
                    location,
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    // IDENT has been consumed; parses `('=' expr)? ';'`
    pub(super) fn var_declarator(
        &mut self,
        datatype: DataType,
        name: crate::intern::InternedStr,
    ) -> SyntaxResult<VarDecl> {
        let value = if self.match_next(&Token::EQUAL).is_some() {
            Some(self.expr()?)
        } else {
            None
        };
        self.expect(Token::Semicolon)?;
        Ok(VarDecl {
            datatype,
            name,
            value,
        })
    }

    // IDENT has been consumed; parses `'[' expr ']' ';'`
    pub(super) fn array_declarator(
        &mut self,
        datatype: DataType,
        name: crate::intern::InternedStr,
    ) -> SyntaxResult<ArrayDecl> {
        self.expect(Token::LeftBracket)?;
        let size = self.expr()?;
        self.expect(Token::RightBracket)?;
        self.expect(Token::Semicolon)?;
        Ok(ArrayDecl {
            datatype,
            name,
            size,
        })
    }

    /// fun_decl: type_spec IDENT '(' params ')' compound_stmt
    fn function_definition(
        &mut self,
        datatype: DataType,
        name: Locatable<crate::intern::InternedStr>,
    ) -> SyntaxResult<Stmt> {
        self.expect(Token::LeftParen)?;
        let params = self.parameters()?;
        self.expect(Token::RightParen)?;
        let body = self.compound_statement()?;
        Ok(name.location.with(StmtType::FuncDecl(FuncDecl {
            datatype,
            name: name.data,
            params,
            body: Box::new(body),
        })))
    }

    /// params: param_list | VOID
    ///
    /// A lone `void` means "no parameters"; `void` followed by an
    /// identifier is an ordinary (ill-typed) parameter, which the checker
    /// diagnoses.
    fn parameters(&mut self) -> SyntaxResult<Vec<FuncParameter>> {
        if let Some(Token::Keyword(Keyword::Void)) = self.peek_token() {
            let void = self.next_token().unwrap();
            if let Some(Token::RightParen) = self.peek_token() {
                return Ok(vec![]);
            }
            let first = self.parameter_declarator(DataType {
                name: "void".into(),
                ctype: None,
                location: void.location,
            })?;
            return self.parameter_list(first);
        }
        let datatype = self.type_spec()?;
        let first = self.parameter_declarator(datatype)?;
        self.parameter_list(first)
    }

    /// param_list: param_list ',' param | param
    fn parameter_list(&mut self, first: FuncParameter) -> SyntaxResult<Vec<FuncParameter>> {
        let mut params = vec![first];
        while self.match_next(&Token::Comma).is_some() {
            let datatype = self.type_spec()?;
            params.push(self.parameter_declarator(datatype)?);
        }
        Ok(params)
    }

    /// param: type_spec IDENT | type_spec IDENT '[' ']'
    fn parameter_declarator(&mut self, datatype: DataType) -> SyntaxResult<FuncParameter> {
        let name = self.expect_id()?;
        if self.match_next(&Token::LeftBracket).is_some() {
            self.expect(Token::RightBracket)?;
        }
        Ok(FuncParameter {
            datatype,
            name: name.data,
            location: name.location,
        })
    }
}
