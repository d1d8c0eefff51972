mod decl;
mod expr;
mod stmt;

use crate::data::lex::Keyword;
use crate::data::prelude::*;
use crate::intern::InternedStr;

type SyntaxResult<T> = Result<T, Locatable<SyntaxError>>;

/// A parser for MiniC.
///
/// ```text
/// program      : decl_list
/// decl_list    : decl_list decl | decl
/// decl         : var_decl | fun_decl
/// ```
///
/// The parser reports syntax errors to its error handler and synchronizes
/// on statement boundaries, so a single run surfaces every independent
/// error; the (possibly partial) tree is always returned and downstream
/// passes consult the error sink before trusting it.
#[derive(Debug)]
pub struct Parser<I: Iterator<Item = Locatable<Token>>> {
    tokens: I,
    /// the last token we saw, for single-token lookahead
    current: Option<Locatable<Token>>,
    /// the location of the last token we consumed, for EOF diagnostics
    last_location: Location,
    pub(crate) error_handler: ErrorHandler,
}

impl<I: Iterator<Item = Locatable<Token>>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Parser {
            tokens,
            current: None,
            last_location: Location::default(),
            error_handler: ErrorHandler::new(),
        }
    }

    /// Parse an entire translation unit.
    pub fn program(&mut self) -> Program {
        let mut decls = vec![];
        while self.peek_token().is_some() {
            match self.declaration() {
                Ok(decl) => decls.push(decl),
                Err(err) => {
                    self.error_handler.push_back(err);
                    self.synchronize();
                    // a stray '}' at file scope would make no progress
                    if self.peek_token() == Some(&Token::RightBrace) {
                        self.next_token();
                    }
                }
            }
        }
        Program { decls }
    }

    /* token plumbing */

    fn next_token(&mut self) -> Option<Locatable<Token>> {
        let token = self.current.take().or_else(|| self.tokens.next());
        if let Some(token) = &token {
            self.last_location = token.location;
        }
        token
    }
    fn peek_token(&mut self) -> Option<&Token> {
        if self.current.is_none() {
            self.current = self.tokens.next();
        }
        self.current.as_ref().map(|t| &t.data)
    }
    fn next_location(&mut self) -> Location {
        if self.peek_token().is_some() {
            self.current.as_ref().unwrap().location
        } else {
            Location::EOF
        }
    }
    /// If the next token is `token`, consume and return it.
    fn match_next(&mut self, token: &Token) -> Option<Locatable<Token>> {
        if self.peek_token() == Some(token) {
            self.next_token()
        } else {
            None
        }
    }
    fn match_keyword(&mut self, keyword: Keyword) -> Option<Locatable<Token>> {
        self.match_next(&Token::Keyword(keyword))
    }
    fn expect(&mut self, token: Token) -> SyntaxResult<Locatable<Token>> {
        match self.peek_token() {
            Some(t) if *t == token => Ok(self.next_token().unwrap()),
            _ => Err(self.unexpected()),
        }
    }
    fn expect_id(&mut self) -> SyntaxResult<Locatable<InternedStr>> {
        match self.peek_token() {
            Some(Token::Id(_)) => {
                let token = self.next_token().unwrap();
                match token.data {
                    Token::Id(id) => Ok(token.location.with(id)),
                    _ => unreachable!("peek should always be the same as next"),
                }
            }
            _ => Err(self.unexpected()),
        }
    }
    /// Build a syntax error for the upcoming token without consuming it.
    fn unexpected(&mut self) -> Locatable<SyntaxError> {
        match self.peek_token() {
            Some(token) => {
                let data = SyntaxError::UnexpectedToken(token.clone());
                self.next_location().with(data)
            }
            None => Location::EOF.with(SyntaxError::EndOfFile),
        }
    }
    /// Panic-mode recovery: skip ahead to the next statement boundary, so
    /// one typo does not drown the rest of the file in spurious errors.
    fn synchronize(&mut self) {
        while let Some(token) = self.peek_token() {
            match token {
                Token::Semicolon => {
                    self.next_token();
                    return;
                }
                // let the enclosing block close itself
                Token::RightBrace => return,
                _ => {
                    self.next_token();
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::Parser;
    use crate::data::prelude::*;
    use crate::lex::Lexer;

    pub(crate) fn parser(input: &str) -> Parser<Lexer> {
        Parser::new(Lexer::new(input))
    }

    pub(crate) fn parse_all(input: &str) -> (Program, ErrorHandler) {
        let mut p = parser(input);
        let program = p.program();
        (program, p.error_handler)
    }

    pub(crate) fn assert_parses(input: &str) -> Program {
        let (program, mut errs) = parse_all(input);
        assert!(
            errs.is_empty(),
            "{} should parse cleanly: {:?}",
            input,
            errs.pop_front()
        );
        program
    }

    pub(crate) fn assert_syntax_err(input: &str) {
        let (_, errs) = parse_all(input);
        assert!(!errs.is_empty(), "{} should not parse", input);
        for err in errs {
            assert!(err.data.is_syntax_err(), "wrong error kind: {:?}", err);
        }
    }
}
