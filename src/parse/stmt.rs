use super::{Parser, SyntaxResult};
use crate::data::lex::Keyword;
use crate::data::prelude::*;

type StmtResult = SyntaxResult<Stmt>;

impl<I: Iterator<Item = Locatable<Token>>> Parser<I> {
    /// compound_stmt: '{' local_decls stmt_list '}'
    ///
    /// Local declarations are hoisted: they must all appear before the
    /// first statement, as in the MiniC grammar.
    pub(super) fn compound_statement(&mut self) -> StmtResult {
        let start = self.expect(Token::LeftBrace)?;
        let mut decls = vec![];
        let mut stmts = vec![];
        let mut pending_errs = vec![];
        while let Some(Token::Keyword(k)) = self.peek_token() {
            if !k.is_type_specifier() {
                break;
            }
            match self.local_declaration() {
                Ok(decl) => decls.push(decl),
                Err(err) => {
                    pending_errs.push(err);
                    self.synchronize();
                }
            }
        }
        while self.peek_token().is_some() && self.peek_token() != Some(&Token::RightBrace) {
            match self.statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    pending_errs.push(err);
                    self.synchronize();
                    // prevent infinite loops if there's a syntax error at EOF
                    if self.peek_token().is_none() {
                        break;
                    }
                }
            }
        }
        if self.expect(Token::RightBrace).is_err() {
            pending_errs.push(Location::EOF.with(SyntaxError::EndOfFile));
        }
        if let Some(err) = pending_errs.pop() {
            for err in pending_errs {
                self.error_handler.push_back(err);
            }
            return Err(err);
        }
        Ok(start.location.with(StmtType::Compound(decls, stmts)))
    }

    /// local_decl: type_spec IDENT ';'
    ///           | type_spec IDENT '=' expr ';'
    ///           | type_spec IDENT '[' expr ']' ';'
    fn local_declaration(&mut self) -> StmtResult {
        let datatype = self.type_spec()?;
        let name = self.expect_id()?;
        if self.peek_token() == Some(&Token::LeftBracket) {
            let decl = self.array_declarator(datatype, name.data)?;
            Ok(name.location.with(StmtType::LocalArrayDecl(decl)))
        } else {
            let decl = self.var_declarator(datatype, name.data)?;
            Ok(name.location.with(StmtType::LocalVarDecl(decl)))
        }
    }

    /// stmt: expr_stmt | compound_stmt | if_stmt | while_stmt
    ///     | for_stmt | return_stmt | break_stmt
    pub(super) fn statement(&mut self) -> StmtResult {
        match self.peek_token() {
            Some(Token::LeftBrace) => self.compound_statement(),
            Some(Token::Keyword(Keyword::If)) => self.if_statement(),
            Some(Token::Keyword(Keyword::While)) => self.while_statement(),
            Some(Token::Keyword(Keyword::For)) => self.for_statement(),
            Some(Token::Keyword(Keyword::Return)) => self.return_statement(),
            Some(Token::Keyword(Keyword::Break)) => {
                let kw = self.next_token().unwrap();
                self.expect(Token::Semicolon)?;
                Ok(kw.location.with(StmtType::Break))
            }
            Some(Token::Semicolon) => {
                let semi = self.next_token().expect("peek is broken");
                Ok(semi.location.with(StmtType::Null))
            }
            _ => self.expression_statement(),
        }
    }

    // expr ';'
    fn expression_statement(&mut self) -> StmtResult {
        let expr = self.expr()?;
        let location = expr.location;
        self.expect(Token::Semicolon)?;
        Ok(location.with(StmtType::Expr(expr)))
    }

    /// return_stmt: RETURN ';' | RETURN expr ';'
    fn return_statement(&mut self) -> StmtResult {
        let ret = self.expect(Token::Keyword(Keyword::Return))?;
        let value = if self.peek_token() == Some(&Token::Semicolon) {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect(Token::Semicolon)?;
        Ok(ret.location.with(StmtType::Return(value)))
    }

    /// if_stmt: IF '(' expr ')' stmt
    ///        | IF '(' expr ')' stmt ELSE stmt
    ///
    /// A dangling `else` attaches to the nearest unmatched `if`.
    fn if_statement(&mut self) -> StmtResult {
        let start = self.expect(Token::Keyword(Keyword::If))?;
        self.expect(Token::LeftParen)?;
        let condition = self.expr()?;
        self.expect(Token::RightParen)?;
        let body = self.statement()?;
        let otherwise = if self.match_keyword(Keyword::Else).is_some() {
            // NOTE: `if (c) ; else ;` is legal
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(start
            .location
            .with(StmtType::If(condition, Box::new(body), otherwise)))
    }

    /// while_stmt: WHILE '(' expr ')' stmt
    fn while_statement(&mut self) -> StmtResult {
        let start = self.expect(Token::Keyword(Keyword::While))?;
        self.expect(Token::LeftParen)?;
        let condition = self.expr()?;
        self.expect(Token::RightParen)?;
        let body = self.statement()?;
        Ok(start
            .location
            .with(StmtType::While(condition, Box::new(body))))
    }

    /// for_stmt: FOR '(' expr ';' expr ';' expr ')' stmt
    ///
    /// All three headers are expressions; MiniC does not allow a
    /// declaration in the initializer.
    fn for_statement(&mut self) -> StmtResult {
        let start = self.expect(Token::Keyword(Keyword::For))?;
        self.expect(Token::LeftParen)?;
        let init = self.expr()?;
        self.expect(Token::Semicolon)?;
        let condition = self.expr()?;
        self.expect(Token::Semicolon)?;
        let step = self.expr()?;
        self.expect(Token::RightParen)?;
        let body = self.statement()?;
        Ok(start
            .location
            .with(StmtType::For(init, condition, step, Box::new(body))))
    }
}
