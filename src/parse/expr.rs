use super::{Parser, SyntaxResult};
use crate::data::lex::{ComparisonToken, Keyword};
use crate::data::prelude::*;
use crate::data::Fixity;

type ExprResult = SyntaxResult<Expr>;

impl<I: Iterator<Item = Locatable<Token>>> Parser<I> {
    /// expr: IDENT '=' expr | IDENT '[' expr ']' '=' expr | binary_expr
    ///
    /// Assignment is right-associative (`a = b = c` assigns `c` to `b`
    /// first) and its left side must syntactically be a variable or an
    /// array element; anything else is a syntax error at the operator.
    pub(super) fn expr(&mut self) -> ExprResult {
        let lhs = self.logical_or_expr()?;
        if let Some(&Token::Assignment(op)) = self.peek_token() {
            let op_token = self.next_token().unwrap();
            let value = Box::new(self.expr()?);
            let assignment = match lhs.expr {
                ExprType::Var(name) => ExprType::VarAssign(op, name, value),
                ExprType::ArrayLookup(name, index) => {
                    ExprType::ArrayAssign(op, name, index, value)
                }
                _ => {
                    return Err(op_token
                        .location
                        .with(SyntaxError::UnexpectedToken(op_token.data)))
                }
            };
            return Ok(Expr::new(assignment, lhs.location));
        }
        Ok(lhs)
    }

    /// expr OR expr
    fn logical_or_expr(&mut self) -> ExprResult {
        let mut left = self.logical_and_expr()?;
        while self.match_next(&Token::LogicalOr).is_some() {
            let right = self.logical_and_expr()?;
            left = binary(BinaryOp::LogicalOr, left, right);
        }
        Ok(left)
    }
    /// expr AND expr
    fn logical_and_expr(&mut self) -> ExprResult {
        let mut left = self.equality_expr()?;
        while self.match_next(&Token::LogicalAnd).is_some() {
            let right = self.equality_expr()?;
            left = binary(BinaryOp::LogicalAnd, left, right);
        }
        Ok(left)
    }
    /// expr EQ expr | expr NE expr
    fn equality_expr(&mut self) -> ExprResult {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Comparison(ComparisonToken::EqualEqual)) => BinaryOp::EqualEqual,
                Some(Token::Comparison(ComparisonToken::NotEqual)) => BinaryOp::NotEqual,
                _ => break,
            };
            self.next_token();
            let right = self.relational_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }
    /// expr LE expr | expr '<' expr | expr GE expr | expr '>' expr
    fn relational_expr(&mut self) -> ExprResult {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Comparison(ComparisonToken::Less)) => BinaryOp::Less,
                Some(Token::Comparison(ComparisonToken::LessEqual)) => BinaryOp::LessEqual,
                Some(Token::Comparison(ComparisonToken::Greater)) => BinaryOp::Greater,
                Some(Token::Comparison(ComparisonToken::GreaterEqual)) => {
                    BinaryOp::GreaterEqual
                }
                _ => break,
            };
            self.next_token();
            let right = self.additive_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }
    /// expr '+' expr | expr '-' expr
    fn additive_expr(&mut self) -> ExprResult {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.next_token();
            let right = self.multiplicative_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }
    /// expr '*' expr | expr '/' expr | expr '%' expr
    fn multiplicative_expr(&mut self) -> ExprResult {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Divide) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => break,
            };
            self.next_token();
            let right = self.unary_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }
    /// '!' expr | '-' expr | '+' expr | INC IDENT | DEC IDENT | postfix
    ///
    /// Prefix increment and decrement apply to a bare identifier only.
    fn unary_expr(&mut self) -> ExprResult {
        let op = match self.peek_token() {
            Some(Token::LogicalNot) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Minus,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::PlusPlus) | Some(Token::MinusMinus) => {
                let token = self.next_token().unwrap();
                let op = if token.data == Token::PlusPlus {
                    UnaryOp::Inc
                } else {
                    UnaryOp::Dec
                };
                let name = self.expect_id()?;
                return Ok(Expr::new(
                    ExprType::IncDec(op, Fixity::Prefix, name.data),
                    token.location,
                ));
            }
            _ => return self.primary_expr(),
        };
        let location = self.next_token().unwrap().location;
        let operand = self.unary_expr()?;
        Ok(Expr::new(ExprType::Unary(op, Box::new(operand)), location))
    }

    /// '(' expr ')'
    /// | IDENT | IDENT '[' expr ']' | IDENT '(' args ')' | IDENT '.' SIZE
    /// | IDENT INC | IDENT DEC
    /// | BOOL_LIT | INT_LIT | FLOAT_LIT | CHAR_LIT | STRING_LIT
    /// | NEW type_spec '[' expr ']'
    fn primary_expr(&mut self) -> ExprResult {
        match self.peek_token() {
            Some(Token::LeftParen) => {
                self.next_token();
                let inner = self.expr()?;
                self.expect(Token::RightParen)?;
                // parentheses add no node; (E) has the same tree as E
                Ok(inner)
            }
            Some(Token::Literal(_)) => {
                let token = self.next_token().unwrap();
                match token.data {
                    Token::Literal(lit) => {
                        Ok(Expr::new(ExprType::Literal(lit), token.location))
                    }
                    _ => unreachable!("peek should always be the same as next"),
                }
            }
            Some(Token::Keyword(Keyword::New)) => {
                let new = self.next_token().unwrap();
                let datatype = self.type_spec()?;
                self.expect(Token::LeftBracket)?;
                let size = self.expr()?;
                self.expect(Token::RightBracket)?;
                Ok(Expr::new(
                    ExprType::NewArray(datatype, Box::new(size)),
                    new.location,
                ))
            }
            Some(Token::Id(_)) => {
                let id = self.expect_id()?;
                self.postfix_expr(id)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// The postfix forms that can follow an identifier.
    fn postfix_expr(&mut self, id: Locatable<crate::intern::InternedStr>) -> ExprResult {
        let data = match self.peek_token() {
            Some(Token::LeftBracket) => {
                self.next_token();
                let index = self.expr()?;
                self.expect(Token::RightBracket)?;
                ExprType::ArrayLookup(id.data, Box::new(index))
            }
            Some(Token::LeftParen) => {
                self.next_token();
                let args = self.arguments()?;
                self.expect(Token::RightParen)?;
                ExprType::FuncCall(id.data, args)
            }
            Some(Token::Dot) => {
                self.next_token();
                self.expect(Token::Keyword(Keyword::Size))?;
                ExprType::ArraySize(id.data)
            }
            Some(Token::PlusPlus) => {
                self.next_token();
                ExprType::IncDec(UnaryOp::Inc, Fixity::Postfix, id.data)
            }
            Some(Token::MinusMinus) => {
                self.next_token();
                ExprType::IncDec(UnaryOp::Dec, Fixity::Postfix, id.data)
            }
            _ => ExprType::Var(id.data),
        };
        Ok(Expr::new(data, id.location))
    }

    /// args: arg_list | empty
    /// arg_list: arg_list ',' expr | expr
    fn arguments(&mut self) -> SyntaxResult<Vec<Expr>> {
        if self.peek_token() == Some(&Token::RightParen) {
            return Ok(vec![]);
        }
        let mut args = vec![self.expr()?];
        while self.match_next(&Token::Comma).is_some() {
            args.push(self.expr()?);
        }
        Ok(args)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let location = left.location;
    Expr::new(
        ExprType::Binary(op, Box::new(left), Box::new(right)),
        location,
    )
}

#[cfg(test)]
mod tests {
    use super::super::tests::parser;
    use crate::data::lex::AssignmentToken;
    use crate::data::prelude::*;
    use crate::data::Fixity;

    fn parse_expr(input: &str) -> Expr {
        let mut p = parser(input);
        let expr = p.expr().unwrap_or_else(|err| panic!("{:?}", err));
        assert!(p.error_handler.is_empty());
        expr
    }

    fn assert_same_tree(left: &str, right: &str) {
        assert_eq!(parse_expr(left).expr, parse_expr(right).expr, "{} != {}", left, right);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("a + b * c");
        match expr.expr {
            ExprType::Binary(BinaryOp::Add, left, right) => {
                assert!(matches!(left.expr, ExprType::Var(_)));
                assert!(matches!(
                    right.expr,
                    ExprType::Binary(BinaryOp::Mul, ..)
                ));
            }
            other => panic!("expected addition at the root, got {:?}", other),
        }
    }

    #[test]
    fn same_level_operators_associate_left() {
        assert_same_tree("a - b + c", "(a - b) + c");
        assert_same_tree("a / b % c", "(a / b) % c");
    }

    #[test]
    fn assignment_associates_right() {
        let expr = parse_expr("a = b = c");
        match expr.expr {
            ExprType::VarAssign(AssignmentToken::Equal, name, value) => {
                assert_eq!(name, "a");
                assert!(matches!(value.expr, ExprType::VarAssign(..)));
            }
            other => panic!("expected assignment at the root, got {:?}", other),
        }
    }

    #[test]
    fn parentheses_are_transparent() {
        assert_same_tree("(a + b)", "a + b");
        assert_same_tree("((x))", "x");
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        let expr = parse_expr("a + 1 < b * 2");
        assert!(matches!(
            expr.expr,
            ExprType::Binary(BinaryOp::Less, ..)
        ));
    }

    #[test]
    fn logical_operators_bind_loosest() {
        let expr = parse_expr("a == b && c != d || e");
        assert!(matches!(
            expr.expr,
            ExprType::Binary(BinaryOp::LogicalOr, ..)
        ));
    }

    #[test]
    fn unary_operators() {
        assert!(matches!(
            parse_expr("!done").expr,
            ExprType::Unary(UnaryOp::Not, _)
        ));
        assert!(matches!(
            parse_expr("-x").expr,
            ExprType::Unary(UnaryOp::Minus, _)
        ));
        // unary minus binds tighter than subtraction
        let expr = parse_expr("a - -b");
        assert!(matches!(expr.expr, ExprType::Binary(BinaryOp::Sub, ..)));
    }

    #[test]
    fn increment_fixity() {
        assert_eq!(
            parse_expr("++i").expr,
            ExprType::IncDec(UnaryOp::Inc, Fixity::Prefix, "i".into())
        );
        assert_eq!(
            parse_expr("i--").expr,
            ExprType::IncDec(UnaryOp::Dec, Fixity::Postfix, "i".into())
        );
    }

    #[test]
    fn postfix_forms() {
        assert!(matches!(
            parse_expr("a[i + 1]").expr,
            ExprType::ArrayLookup(..)
        ));
        assert!(matches!(parse_expr("f(1, x)").expr, ExprType::FuncCall(..)));
        assert!(matches!(parse_expr("f()").expr, ExprType::FuncCall(..)));
        assert_eq!(parse_expr("a.size").expr, ExprType::ArraySize("a".into()));
        assert!(matches!(
            parse_expr("new int[8]").expr,
            ExprType::NewArray(..)
        ));
    }

    #[test]
    fn compound_assignment_to_array_element() {
        let expr = parse_expr("a[0] += 2");
        assert!(matches!(
            expr.expr,
            ExprType::ArrayAssign(AssignmentToken::PlusEqual, ..)
        ));
    }

    #[test]
    fn assignment_to_non_lvalue_is_an_error() {
        let mut p = parser("a + b = c");
        assert!(p.expr().is_err());
    }
}
